//! Signals - Reactive value cells with automatic subscriber tracking.
//!
//! `get()` registers the active effect as a subscriber; `set()` with a changed
//! value re-runs every subscriber synchronously before returning. Subscriber
//! sets are insertion-ordered (`IndexMap`), so notification order is
//! deterministic: the order in which effects last subscribed.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::effect::{Effect, EffectId, Source, active_effect};

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<IndexMap<EffectId, Effect>>,
}

impl<T> Source for SignalInner<T> {
    fn unsubscribe(&self, id: EffectId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }
}

/// A reactive value cell.
///
/// Cloning yields another handle to the same cell.
///
/// # Example
///
/// ```ignore
/// let name = signal(String::from("world"));
/// let reader = name.clone();
/// create_effect(move || println!("hello {}", reader.get()));
///
/// name.set("rust".into());          // effect re-runs
/// name.set("rust".into());          // equal value: nothing happens
/// name.update(|n| n.to_uppercase()); // updater form always notifies
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Register the active effect (if any). Idempotent per effect.
    fn track(&self) {
        if let Some(effect) = active_effect() {
            self.subscribe(&effect);
        }
    }

    /// Borrow the current value, subscribing the active effect.
    ///
    /// Setting this same signal from inside `f` is a borrow violation.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Replace the value with `f(current)` and notify unconditionally.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        *self.inner.value.borrow_mut() = next;
        self.notify();
    }

    /// Subscribe an existing effect explicitly, without reading.
    pub fn subscribe(&self, effect: &Effect) {
        let added = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            match subscribers.entry(effect.id()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(effect.clone());
                    true
                }
            }
        };
        if added {
            let source: Weak<dyn Source> = Rc::downgrade(&self.inner) as Weak<dyn Source>;
            effect.add_source(source);
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .values()
            .filter(|effect| !effect.is_disposed())
            .count()
    }

    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    pub fn write_only(&self) -> WriteSignal<T> {
        WriteSignal {
            signal: self.clone(),
        }
    }

    fn notify(&self) {
        // Snapshot first: subscribers read (and so re-register on) this signal
        // while they run.
        let snapshot: Vec<Effect> = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.retain(|_, effect| !effect.is_disposed());
            subscribers.values().cloned().collect()
        };
        for effect in snapshot {
            effect.run();
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Current value, subscribing the active effect.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Current value without subscribing.
    pub fn peek(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Store `next` and notify subscribers, unless it equals the current value.
    pub fn set(&self, next: T) {
        if *self.inner.value.borrow() == next {
            return;
        }
        *self.inner.value.borrow_mut() = next;
        self.notify();
    }
}

/// Create a signal (spark-style single handle).
pub fn signal<T: 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}

/// Create a signal as a `(read, write)` accessor pair.
pub fn create_signal<T: 'static>(value: T) -> (ReadSignal<T>, WriteSignal<T>) {
    let signal = Signal::new(value);
    (signal.read_only(), signal.write_only())
}

// =============================================================================
// Split Accessors
// =============================================================================

/// Read half of a signal.
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.signal.fmt(f)
    }
}

impl<T: 'static> ReadSignal<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    pub fn subscriber_count(&self) -> usize {
        self.signal.subscriber_count()
    }
}

impl<T: Clone + 'static> ReadSignal<T> {
    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn peek(&self) -> T {
        self.signal.peek()
    }
}

impl<T: 'static> From<Signal<T>> for ReadSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        signal.read_only()
    }
}

/// Write half of a signal.
pub struct WriteSignal<T> {
    signal: Signal<T>,
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: PartialEq + 'static> WriteSignal<T> {
    pub fn set(&self, next: T) {
        self.signal.set(next);
    }
}

impl<T: 'static> WriteSignal<T> {
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.signal.update(f);
    }
}
