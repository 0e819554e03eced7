//! Effects - Callbacks that re-run when the signals they read change.
//!
//! The runtime keeps exactly one "active effect" per thread. While an effect
//! body runs, every [`Signal`](super::Signal) read registers that effect as a
//! subscriber. Nesting is handled by save/restore: an effect created inside
//! another effect's run becomes active for its own first run and the outer
//! effect is restored afterwards.
//!
//! # Lifecycle
//!
//! - `create_effect(cb)` runs `cb` once, immediately, with itself active
//! - every change to a signal read during its latest run re-runs it
//!   synchronously, inline
//! - before each re-run it unsubscribes from everything, so dependencies are
//!   exactly the signals the latest run read
//! - `dispose()` unsubscribes and turns the effect inert
//!
//! Effects created inside an owner scope are handed to that scope's owner.
//! Control-flow drivers open one per rendered region and dispose it when the
//! region is replaced, so effects living in replaced UI stop with it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

// =============================================================================
// Runtime State
// =============================================================================

thread_local! {
    /// The effect whose body is currently executing (the "listener").
    static ACTIVE_EFFECT: RefCell<Option<Effect>> = const { RefCell::new(None) };

    /// Counter for effect identities.
    static NEXT_EFFECT_ID: Cell<u64> = const { Cell::new(0) };

    /// Collects effects created inside [`with_owner`].
    static OWNER: RefCell<Option<Vec<Effect>>> = const { RefCell::new(None) };
}

/// Replace the active effect, returning the previous one.
fn swap_active(next: Option<Effect>) -> Option<Effect> {
    ACTIVE_EFFECT.with(|active| active.replace(next))
}

/// The effect currently executing on this thread, if any.
pub(crate) fn active_effect() -> Option<Effect> {
    ACTIVE_EFFECT.with(|active| active.borrow().clone())
}

/// Restores the previously active effect when dropped, including on unwind.
struct ActiveGuard {
    previous: Option<Effect>,
}

impl ActiveGuard {
    fn enter(next: Option<Effect>) -> Self {
        Self {
            previous: swap_active(next),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        swap_active(self.previous.take());
    }
}

/// Restores the enclosing owner scope when dropped, including on unwind.
struct OwnerGuard {
    previous: Option<Vec<Effect>>,
}

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        OWNER.with(|owner| owner.replace(self.previous.take()));
    }
}

/// Run `f` and return every effect created while it ran.
///
/// Scopes nest: effects created inside an inner scope belong to it only.
/// Whoever owns the returned effects disposes them when the UI they serve
/// goes away.
pub(crate) fn with_owner<R>(f: impl FnOnce() -> R) -> (R, Vec<Effect>) {
    let guard = OwnerGuard {
        previous: OWNER.with(|owner| owner.replace(Some(Vec::new()))),
    };
    let result = f();
    let owned = OWNER
        .with(|owner| owner.borrow_mut().take())
        .unwrap_or_default();
    drop(guard);
    (result, owned)
}

fn adopt(effect: &Effect) {
    OWNER.with(|owner| {
        if let Some(owned) = owner.borrow_mut().as_mut() {
            owned.push(effect.clone());
        }
    });
}

// =============================================================================
// Effect
// =============================================================================

/// Something an effect subscribes to by reading it.
pub(crate) trait Source {
    fn unsubscribe(&self, id: EffectId);
}

/// Stable identity of an effect, used as the subscriber-set key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

struct EffectInner {
    id: EffectId,
    callback: Box<dyn Fn()>,
    disposed: Cell<bool>,
    runs: Cell<usize>,
    sources: RefCell<Vec<Weak<dyn Source>>>,
}

/// Handle to a registered effect.
///
/// Cloning yields another handle to the same effect.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    fn new(callback: impl Fn() + 'static) -> Self {
        let id = NEXT_EFFECT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            EffectId(id)
        });
        Self {
            inner: Rc::new(EffectInner {
                id,
                callback: Box::new(callback),
                disposed: Cell::new(false),
                runs: Cell::new(0),
                sources: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Run the body with this effect active. Disposed effects do nothing.
    pub fn run(&self) {
        if self.is_disposed() {
            return;
        }
        self.clear_sources();
        let _guard = ActiveGuard::enter(Some(self.clone()));
        self.inner.runs.set(self.inner.runs.get() + 1);
        (self.inner.callback)();
    }

    /// How many times the body has executed.
    pub fn run_count(&self) -> usize {
        self.inner.runs.get()
    }

    /// Stop the effect from ever running again.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.clear_sources();
    }

    pub(crate) fn add_source(&self, source: Weak<dyn Source>) {
        self.inner.sources.borrow_mut().push(source);
    }

    fn clear_sources(&self) {
        let sources = std::mem::take(&mut *self.inner.sources.borrow_mut());
        for source in sources.iter().filter_map(Weak::upgrade) {
            source.unsubscribe(self.inner.id);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("runs", &self.inner.runs.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Register `callback` as an effect and run it once, synchronously.
///
/// # Example
///
/// ```ignore
/// let count = signal(0);
/// let seen = count.clone();
/// create_effect(move || println!("count = {}", seen.get()));
/// count.set(1); // prints "count = 1" before returning
/// ```
pub fn create_effect(callback: impl Fn() + 'static) -> Effect {
    let effect = Effect::new(callback);
    adopt(&effect);
    effect.run();
    effect
}

/// Run `f` with no active effect, so signal reads inside create no subscriptions.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _guard = ActiveGuard::enter(None);
    f()
}

/// Run `f` once, immediately, and never again.
///
/// Called from a component's `render`, this runs while the tree is being
/// built, before any widget is inserted. The body executes untracked, so no
/// signal it reads can re-trigger it.
pub fn on_mount(f: impl Fn() + 'static) -> Effect {
    create_effect(move || untrack(&f))
}
