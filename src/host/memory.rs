//! In-memory host - a widget tree held in plain vectors.
//!
//! Behaves like a layout-based toolkit: containers keep an ordered child list,
//! removing a child disposes it together with its whole subtree, and dynamic
//! props are refreshed by effects owned by the widget. Every structural call is
//! recorded in an operation log so tests can assert exactly what the
//! reconciler did.

use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::node::{Callback, ElementKind, PropValue, Props, TextCallback, Value};
use crate::reactive::{Effect, create_effect};

use super::{HostAdapter, HostError};

/// Handle to a widget in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryHandle(usize);

impl fmt::Display for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A recorded structural operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    Create {
        handle: MemoryHandle,
        kind: ElementKind,
    },
    Insert {
        container: MemoryHandle,
        index: usize,
        child: MemoryHandle,
    },
    Remove {
        container: MemoryHandle,
        index: usize,
        child: MemoryHandle,
    },
}

struct Widget {
    kind: ElementKind,
    props: IndexMap<String, Value>,
    callbacks: IndexMap<String, Callback>,
    text_callbacks: IndexMap<String, TextCallback>,
    children: Vec<MemoryHandle>,
    parent: Option<MemoryHandle>,
    effects: Vec<Effect>,
    disposed: bool,
}

impl Widget {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            props: IndexMap::new(),
            callbacks: IndexMap::new(),
            text_callbacks: IndexMap::new(),
            children: Vec::new(),
            parent: None,
            effects: Vec::new(),
            disposed: false,
        }
    }
}

type Store = Rc<RefCell<Vec<Widget>>>;

/// In-memory [`HostAdapter`].
#[derive(Default)]
pub struct MemoryHost {
    widgets: Store,
    ops: RefCell<Vec<HostOp>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached vertical container to render into.
    pub fn create_root(&self) -> MemoryHandle {
        let mut widgets = self.widgets.borrow_mut();
        widgets.push(Widget::new(ElementKind::VBox));
        MemoryHandle(widgets.len() - 1)
    }

    fn with_widget<R>(
        &self,
        handle: &MemoryHandle,
        f: impl FnOnce(&mut Widget) -> R,
    ) -> Result<R, HostError> {
        let mut widgets = self.widgets.borrow_mut();
        match widgets.get_mut(handle.0) {
            Some(widget) if !widget.disposed => Ok(f(widget)),
            _ => Err(HostError::UnknownHandle(handle.to_string())),
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn children(&self, container: &MemoryHandle) -> Vec<MemoryHandle> {
        self.with_widget(container, |w| w.children.clone())
            .unwrap_or_default()
    }

    pub fn kind(&self, handle: &MemoryHandle) -> Option<ElementKind> {
        self.with_widget(handle, |w| w.kind).ok()
    }

    pub fn prop(&self, handle: &MemoryHandle, name: &str) -> Option<Value> {
        self.with_widget(handle, |w| w.props.get(name).cloned())
            .ok()
            .flatten()
    }

    /// The `text` prop, if it holds text.
    pub fn text(&self, handle: &MemoryHandle) -> Option<String> {
        self.prop(handle, "text")
            .and_then(|value| value.as_text().map(str::to_string))
    }

    /// `text` of each direct child of `container`, in order.
    pub fn child_texts(&self, container: &MemoryHandle) -> Vec<String> {
        self.children(container)
            .iter()
            .map(|child| self.text(child).unwrap_or_default())
            .collect()
    }

    pub fn parent(&self, handle: &MemoryHandle) -> Option<MemoryHandle> {
        self.with_widget(handle, |w| w.parent).ok().flatten()
    }

    pub fn is_disposed(&self, handle: &MemoryHandle) -> bool {
        self.widgets
            .borrow()
            .get(handle.0)
            .is_none_or(|widget| widget.disposed)
    }

    /// Widgets created and not yet disposed (roots included).
    pub fn live_count(&self) -> usize {
        self.widgets.borrow().iter().filter(|w| !w.disposed).count()
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    // =========================================================================
    // Event Simulation
    // =========================================================================

    /// Fire `on_click`. Returns false when the widget has no such callback.
    pub fn click(&self, handle: &MemoryHandle) -> bool {
        let callback = self
            .with_widget(handle, |w| w.callbacks.get("on_click").cloned())
            .ok()
            .flatten();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Replace an input's text and fire `on_change`.
    pub fn type_text(&self, handle: &MemoryHandle, text: &str) -> bool {
        let callback = self
            .with_widget(handle, |w| {
                w.props.insert("text".into(), Value::from(text));
                w.text_callbacks.get("on_change").cloned()
            })
            .ok()
            .flatten();
        match callback {
            Some(callback) => {
                callback(text);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn bind_dynamic(&self, handle: MemoryHandle, name: String, getter: Rc<dyn Fn() -> Value>) {
        let store = Rc::downgrade(&self.widgets);
        let effect = create_effect(move || {
            let value = getter();
            let Some(store) = store.upgrade() else { return };
            let mut widgets = store.borrow_mut();
            if let Some(widget) = widgets.get_mut(handle.0).filter(|w| !w.disposed) {
                widget.props.insert(name.clone(), value);
            }
        });
        if let Some(widget) = self.widgets.borrow_mut().get_mut(handle.0) {
            widget.effects.push(effect);
        }
    }

    /// Dispose `root` and everything below it.
    fn dispose_subtree(widgets: &mut [Widget], root: MemoryHandle) {
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(widget) = widgets.get_mut(handle.0) else { continue };
            widget.disposed = true;
            widget.parent = None;
            for effect in widget.effects.drain(..) {
                effect.dispose();
            }
            widget.callbacks.clear();
            widget.text_callbacks.clear();
            stack.extend(widget.children.drain(..));
        }
    }

    fn dump_into(&self, out: &mut String, handle: MemoryHandle, depth: usize) {
        let (line, children) = {
            let widgets = self.widgets.borrow();
            let Some(widget) = widgets.get(handle.0) else { return };
            let mut line = format!("{}{} {}", "  ".repeat(depth), widget.kind, handle);
            for (name, value) in &widget.props {
                let _ = write!(line, " {name}={value}");
            }
            (line, widget.children.clone())
        };
        out.push_str(&line);
        out.push('\n');
        for child in children {
            self.dump_into(out, child, depth + 1);
        }
    }
}

impl HostAdapter for MemoryHost {
    type Handle = MemoryHandle;

    fn create_host_node(
        &self,
        kind: ElementKind,
        props: &Props,
    ) -> Result<MemoryHandle, HostError> {
        let mut dynamic = Vec::new();
        let handle = {
            let mut widget = Widget::new(kind);
            for (name, value) in props {
                match value {
                    PropValue::Static(value) => {
                        widget.props.insert(name.clone(), value.clone());
                    }
                    PropValue::Dynamic(getter) => dynamic.push((name.clone(), getter.clone())),
                    PropValue::Callback(callback) => {
                        widget.callbacks.insert(name.clone(), callback.clone());
                    }
                    PropValue::TextCallback(callback) => {
                        widget.text_callbacks.insert(name.clone(), callback.clone());
                    }
                }
            }
            let mut widgets = self.widgets.borrow_mut();
            widgets.push(widget);
            MemoryHandle(widgets.len() - 1)
        };

        // Effects run immediately, so the store must not be borrowed here.
        for (name, getter) in dynamic {
            self.bind_dynamic(handle, name, getter);
        }

        self.ops.borrow_mut().push(HostOp::Create { handle, kind });
        Ok(handle)
    }

    fn insert_child(
        &self,
        container: &MemoryHandle,
        index: usize,
        child: &MemoryHandle,
    ) -> Result<(), HostError> {
        {
            let mut widgets = self.widgets.borrow_mut();
            let count = match widgets.get(container.0) {
                Some(w) if !w.disposed && w.kind.is_container() => w.children.len(),
                Some(w) if !w.disposed => {
                    return Err(HostError::NotAContainer(container.to_string()));
                }
                _ => return Err(HostError::UnknownHandle(container.to_string())),
            };
            if index > count {
                return Err(HostError::IndexOutOfRange { index, count });
            }
            let previous_parent = match widgets.get_mut(child.0) {
                Some(w) if !w.disposed => w.parent.replace(*container),
                _ => return Err(HostError::UnknownHandle(child.to_string())),
            };
            // Reparenting detaches from the old container first.
            if let Some(old) = previous_parent {
                if let Some(old_parent) = widgets.get_mut(old.0) {
                    old_parent.children.retain(|c| c != child);
                }
            }
            let siblings = &mut widgets[container.0].children;
            let index = index.min(siblings.len());
            siblings.insert(index, *child);
        }
        self.ops.borrow_mut().push(HostOp::Insert {
            container: *container,
            index,
            child: *child,
        });
        Ok(())
    }

    fn remove_child(&self, container: &MemoryHandle, index: usize) -> Result<(), HostError> {
        let child = {
            let mut widgets = self.widgets.borrow_mut();
            let siblings = match widgets.get_mut(container.0) {
                Some(w) if !w.disposed => &mut w.children,
                _ => return Err(HostError::UnknownHandle(container.to_string())),
            };
            if index >= siblings.len() {
                return Err(HostError::IndexOutOfRange {
                    index,
                    count: siblings.len(),
                });
            }
            let child = siblings.remove(index);
            Self::dispose_subtree(&mut widgets, child);
            child
        };
        self.ops.borrow_mut().push(HostOp::Remove {
            container: *container,
            index,
            child,
        });
        Ok(())
    }

    fn index_of(&self, container: &MemoryHandle, child: &MemoryHandle) -> Option<usize> {
        self.with_widget(container, |w| w.children.iter().position(|c| c == child))
            .ok()
            .flatten()
    }

    fn child_count(&self, container: &MemoryHandle) -> usize {
        self.with_widget(container, |w| w.children.len())
            .unwrap_or(0)
    }

    fn describe(&self, root: &MemoryHandle) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, *root, 0);
        out
    }
}
