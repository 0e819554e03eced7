//! UI thread affinity.
//!
//! Signals, effects and the tree are single-threaded (`Rc`/`RefCell`). The
//! thread that calls `render` becomes the UI thread; drivers and the timer
//! queue check it before touching anything. Background work hands results
//! back through [`crate::timer::UiQueue`] instead of mutating state directly.

use std::thread::{self, ThreadId};

use crate::error::{ReconcileError, Result};

/// Identity of the UI thread. `Copy + Send`, so it can be handed to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiThread {
    id: ThreadId,
}

impl UiThread {
    /// Claim the calling thread.
    pub fn current() -> Self {
        Self {
            id: thread::current().id(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }

    /// `Err(WrongThread)` unless called on the UI thread.
    pub fn ensure(&self) -> Result<()> {
        let actual = thread::current().id();
        if actual == self.id {
            Ok(())
        } else {
            Err(ReconcileError::WrongThread {
                expected: self.id,
                actual,
            })
        }
    }
}
