//! Element props - static values, live getters and event callbacks.
//!
//! Props are passed to the host adapter untouched. A `Dynamic` prop stays
//! connected: the adapter wraps its getter in an effect so the widget updates
//! whenever a signal read by the getter changes.
//!
//! ```ignore
//! // CORRECT - the getter stays connected
//! label("").prop("text", PropValue::from(count.read_only()));
//!
//! // WRONG - reads once, never updates
//! label("").prop("text", count.get());
//! ```

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::{ReadSignal, Signal};

/// Ordered prop map; the host applies props in declaration order.
pub type Props = IndexMap<String, PropValue>;

/// Widget event callback (click, submit).
pub type Callback = Rc<dyn Fn()>;

/// Text event callback (input value change).
pub type TextCallback = Rc<dyn Fn(&str)>;

// =============================================================================
// Value
// =============================================================================

/// A concrete prop value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Width and height.
    Size(u32, u32),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{text:?}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Size(w, h) => write!(f, "{w}x{h}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<(u32, u32)> for Value {
    fn from((w, h): (u32, u32)) -> Self {
        Value::Size(w, h)
    }
}

// =============================================================================
// PropValue
// =============================================================================

/// A prop as declared by the author.
#[derive(Clone)]
pub enum PropValue {
    /// Fixed value.
    Static(Value),
    /// Getter re-evaluated by the host inside an effect.
    Dynamic(Rc<dyn Fn() -> Value>),
    /// Event callback without payload.
    Callback(Callback),
    /// Event callback receiving text.
    TextCallback(TextCallback),
}

impl PropValue {
    pub fn dynamic(getter: impl Fn() -> Value + 'static) -> Self {
        PropValue::Dynamic(Rc::new(getter))
    }

    pub fn callback(f: impl Fn() + 'static) -> Self {
        PropValue::Callback(Rc::new(f))
    }

    pub fn text_callback(f: impl Fn(&str) + 'static) -> Self {
        PropValue::TextCallback(Rc::new(f))
    }

    /// Current value for value props (tracked when read inside an effect).
    pub fn value(&self) -> Option<Value> {
        match self {
            PropValue::Static(value) => Some(value.clone()),
            PropValue::Dynamic(getter) => Some(getter()),
            PropValue::Callback(_) | PropValue::TextCallback(_) => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, PropValue::Dynamic(_))
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            PropValue::Dynamic(_) => f.write_str("Dynamic(..)"),
            PropValue::Callback(_) => f.write_str("Callback(..)"),
            PropValue::TextCallback(_) => f.write_str("TextCallback(..)"),
        }
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Static(value)
    }
}

macro_rules! static_prop_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropValue {
                fn from(value: $ty) -> Self {
                    PropValue::Static(Value::from(value))
                }
            }
        )*
    };
}

static_prop_from!(&str, String, i64, i32, usize, f64, bool, (u32, u32));

impl<T> From<ReadSignal<T>> for PropValue
where
    T: Clone + Into<Value> + 'static,
{
    fn from(signal: ReadSignal<T>) -> Self {
        PropValue::dynamic(move || signal.get().into())
    }
}

impl<T> From<Signal<T>> for PropValue
where
    T: Clone + Into<Value> + 'static,
{
    fn from(signal: Signal<T>) -> Self {
        PropValue::from(signal.read_only())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::signal;

    #[test]
    fn test_static_prop_value() {
        let prop = PropValue::from("hello");
        assert_eq!(prop.value(), Some(Value::Text("hello".into())));
        assert!(!prop.is_dynamic());
    }

    #[test]
    fn test_signal_prop_stays_connected() {
        let count = signal(1i64);
        let prop = PropValue::from(count.clone());

        assert!(prop.is_dynamic());
        assert_eq!(prop.value(), Some(Value::Int(1)));
        count.set(7);
        assert_eq!(prop.value(), Some(Value::Int(7)), "getter reads the live value");
    }

    #[test]
    fn test_callbacks_have_no_value() {
        assert_eq!(PropValue::callback(|| {}).value(), None);
        assert_eq!(PropValue::text_callback(|_| {}).value(), None);
    }
}
