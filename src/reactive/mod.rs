//! Reactive Core - Signals, effects and derived values.
//!
//! Dependency discovery is purely dynamic: a [`Signal`] read while an effect
//! body runs subscribes that effect. Propagation is synchronous and push-based:
//! `set()` re-runs every subscriber inline, so chains of derived values are
//! fully settled by the time `set()` returns.
//!
//! ```text
//! signal.set(v) ──▶ effect A (reads signal) ──▶ memo.set(..) ──▶ effect B
//!                                                                 │
//!        returns ◀────────────────────────────────────────────────┘
//! ```
//!
//! All of this runs on the UI-owning thread. The runtime state (the active
//! effect) is thread-local, and signals are `!Send`, so values can't leak
//! across threads; background work hands off through
//! [`UiQueue`](crate::timer::UiQueue).

mod derived;
mod effect;
mod signal;

pub use derived::{create_memo, map_list, with_text};
pub use effect::{Effect, EffectId, create_effect, on_mount, untrack};
pub(crate) use effect::with_owner;
pub use signal::{ReadSignal, Signal, WriteSignal, create_signal, signal};
