//! Host Adapter - The narrow contract to a concrete widget toolkit.
//!
//! The reactive core never touches widgets directly. It allocates host nodes,
//! inserts them at exact indices, removes them by index and asks where a child
//! currently sits. Indices are the host's business: the core recomputes them
//! on every mutation and never caches one across commits.
//!
//! Methods take `&self`. A host node's dynamic props are kept live by effects
//! the adapter creates inside `create_host_node`; those effects re-enter the
//! adapter later, so implementations use interior mutability.
//!
//! [`MemoryHost`] is the in-memory implementation used by the test suite.

mod memory;

use std::fmt::Debug;

use thiserror::Error;

use crate::node::{ElementKind, Props};

pub use memory::{HostOp, MemoryHandle, MemoryHost};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("index {index} out of range for container with {count} children")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("unknown host handle {0}")]
    UnknownHandle(String),

    #[error("host node {0} cannot hold children")]
    NotAContainer(String),
}

/// Operations the reconciler needs from a widget toolkit.
pub trait HostAdapter {
    /// Reference to a concrete widget. Compared by identity.
    type Handle: Clone + PartialEq + Debug + 'static;

    /// Allocate a widget. Dynamic props must be wrapped in effects to stay live.
    fn create_host_node(&self, kind: ElementKind, props: &Props) -> Result<Self::Handle, HostError>;

    /// Insert `child` at `index`, valid range `0..=child_count`.
    fn insert_child(
        &self,
        container: &Self::Handle,
        index: usize,
        child: &Self::Handle,
    ) -> Result<(), HostError>;

    /// Detach and dispose the child at `index`.
    fn remove_child(&self, container: &Self::Handle, index: usize) -> Result<(), HostError>;

    /// Position of `child` inside `container`, by identity.
    fn index_of(&self, container: &Self::Handle, child: &Self::Handle) -> Option<usize>;

    fn child_count(&self, container: &Self::Handle) -> usize;

    /// Human-readable dump of the widget tree under `root`, for diagnostics.
    fn describe(&self, root: &Self::Handle) -> String {
        format!("{root:?}")
    }
}
