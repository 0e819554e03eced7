//! Error types.
//!
//! Every variant is a structural fault: the reconciler never retries or rolls
//! back. Build and commit return these through `Result`; a driver re-run that
//! hits one (triggered by `Signal::set`, with no caller to return to) logs it
//! and panics.

use std::io;
use std::thread::ThreadId;

use thiserror::Error;

use crate::host::HostError;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An element tag the runtime has no widget kind for.
    #[error("unknown element kind `{0}`")]
    UnknownElementKind(String),

    /// A declarative node whose shape is not buildable (e.g. a leaf with children).
    #[error("invalid node shape at `{key}`: {reason}")]
    InvalidNodeShape { key: String, reason: String },

    /// A `For`/`Switch` item that does not resolve to host-visible roots.
    #[error("invalid control-flow item in `{key}`: {reason}")]
    InvalidControlFlowItem { key: String, reason: String },

    #[error("reactive work ran on thread {actual:?}, UI thread is {expected:?}")]
    WrongThread { expected: ThreadId, actual: ThreadId },

    /// A node that should own (or sit under) a host handle has none.
    #[error("node `{key}` has no host handle to attach to")]
    MissingHostHandle { key: String },

    /// The host container no longer holds a sibling the logical tree expects.
    #[error("sibling `{sibling}` of `{key}` is missing from its host container")]
    PositionUnresolved { key: String, sibling: String },

    /// A node id that no longer exists in the arena.
    #[error("node {0} is no longer part of the tree")]
    StaleNode(String),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("failed to spawn background trigger thread")]
    Spawn(#[source] io::Error),
}
