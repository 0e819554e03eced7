//! Components - stateful authoring units rendered exactly once.
//!
//! A component's `render()` runs a single time, when the tree is built. Later
//! updates never call it again: reactivity lives in signals, dynamic props and
//! control-flow nodes wired up during that one render.

use super::Child;

/// An author-defined component.
///
/// # Example
///
/// ```ignore
/// struct Counter {
///     count: Signal<i64>,
/// }
///
/// impl Component for Counter {
///     fn render(&self) -> Child {
///         let count = self.count.clone();
///         hbox(children![
///             label(self.count.clone()),
///             button("+1").on_click(move || count.update(|n| n + 1)),
///         ])
///         .into()
///     }
/// }
/// ```
pub trait Component {
    /// Produce the component's content: one node or a (nested) sequence.
    fn render(&self) -> Child;

    /// Stable identifier for diagnostics.
    fn key(&self) -> Option<String> {
        None
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed component.
pub struct FnComponent {
    name: &'static str,
    key: Option<String>,
    render: Box<dyn Fn() -> Child>,
}

impl FnComponent {
    pub fn new(name: &'static str, render: impl Fn() -> Child + 'static) -> Self {
        Self {
            name,
            key: None,
            render: Box::new(render),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl Component for FnComponent {
    fn render(&self) -> Child {
        (self.render)()
    }

    fn key(&self) -> Option<String> {
        self.key.clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
