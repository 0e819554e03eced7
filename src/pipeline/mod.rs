//! Render Pipeline
//!
//! ```text
//! Node ──build──▶ NodeTree ──commit──▶ host widgets
//!                    ▲                     │
//!                    └── driver effects ◀──┘ signal changes
//! ```
//!
//! 1. **build** - declarative nodes become reactive nodes; widgets are
//!    allocated but not inserted
//! 2. **commit** - preorder walk inserts widgets at resolved indices and
//!    starts control-flow drivers
//! 3. **drivers** - re-render their regions when their signal changes
//!
//! Everything runs on the thread that called [`render`].

mod mount;
pub(crate) mod reconciler;
mod thread;

pub use mount::{DUMP_ENV, Mount, RenderOptions, is_first_render, render, render_with};
pub(crate) use reconciler::Reconciler;
pub use thread::UiThread;
