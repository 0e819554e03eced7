//! # spark-reconciler
//!
//! Fine-grained reactive runtime and declarative tree reconciler.
//!
//! Applications are composed from three node shapes: components (rendered
//! once), elements (host widgets) and control-flow nodes (`For` lists and
//! `Switch` branches). Rendering builds a logical tree that mirrors the
//! composition, inserts the widgets through a [`HostAdapter`], and wires
//! control-flow nodes to signals. From then on only the parts that depend on
//! a changed signal are touched.
//!
//! ## Architecture
//!
//! ```text
//! Signal::set ──▶ driver effect ──▶ build items ──▶ remove old region
//!                                                   insert new region ──▶ HostAdapter
//! ```
//!
//! ## Modules
//!
//! - [`reactive`] - Signals, effects, memos, untracked reads
//! - [`node`] - Declarative nodes: components, elements, `For`, `Switch`
//! - [`tree`] - Logical tree arena and position resolution
//! - [`host`] - Host adapter contract and the in-memory host
//! - [`pipeline`] - `render`, the mount handle, UI-thread affinity
//! - [`timer`] - Timeouts and intervals delivered on the UI thread
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_reconciler::*;
//!
//! let todos = signal(vec!["write".to_string()]);
//! let list = todos.clone();
//! let app = component("App", move || {
//!     let todos = list.clone();
//!     vbox(children![
//!         For::new(list.clone(), |todo, _| label(todo.as_str()).into())
//!             .fallback(|| label("nothing to do").into()),
//!         button("add").on_click(move || {
//!             todos.update(|items| [items.clone(), vec!["more".into()]].concat())
//!         }),
//!     ])
//!     .into()
//! });
//!
//! let host = Rc::new(MemoryHost::new());
//! let root = host.create_root();
//! let mount = render(host, root, app)?;
//! ```

mod driver;
pub mod error;
pub mod host;
pub mod node;
pub mod pipeline;
pub mod reactive;
pub mod timer;
pub mod tree;

pub use error::{ReconcileError, Result};

pub use host::{HostAdapter, HostError, HostOp, MemoryHandle, MemoryHost};

pub use node::{
    Case, Child, Component, ControlFlow, ElementKind, ElementSpec, FnComponent, For, Node,
    PropValue, Props, Switch, Value, button, component, flatten, hbox, input, label, vbox,
};

pub use pipeline::{
    DUMP_ENV, Mount, RenderOptions, UiThread, is_first_render, render, render_with,
};

pub use reactive::{
    Effect, ReadSignal, Signal, WriteSignal, create_effect, create_memo, create_signal, map_list,
    on_mount, signal, untrack, with_text,
};

pub use timer::{Interval, TriggerId, UiQueue, set_interval, set_timeout};

pub use tree::{NodeFlags, NodeId, NodeKind, NodeTree, ReactiveNode};
