//! Background triggers - Timeouts and intervals marshaled onto the UI thread.
//!
//! Timing runs on worker threads; callbacks never do. A worker only sends the
//! id of its trigger through a channel, and the UI thread runs the matching
//! callback from [`UiQueue::pump`]. Callbacks can therefore capture `Rc`
//! state and set signals freely.
//!
//! ```text
//! worker: sleep(delay) ─▶ send(id) ──channel──▶ UI: pump() ─▶ callback()
//! ```
//!
//! Intervals stop cooperatively: [`Interval::stop`] flips a shared flag that
//! the worker checks after each period, and `pump` drops ticks from stopped
//! intervals that were already in flight, along with their callbacks.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{ReconcileError, Result};
use crate::pipeline::UiThread;

/// Identifies one registered timeout or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(u64);

enum Trigger {
    Once(Box<dyn FnOnce()>),
    Repeat {
        callback: Rc<dyn Fn()>,
        running: Arc<AtomicBool>,
    },
}

impl Trigger {
    fn is_live(&self) -> bool {
        match self {
            Trigger::Once(_) => true,
            Trigger::Repeat { running, .. } => running.load(Ordering::SeqCst),
        }
    }
}

/// Handle to a running interval. Cloneable and `Send`.
#[derive(Debug, Clone)]
pub struct Interval {
    id: TriggerId,
    running: Arc<AtomicBool>,
}

impl Interval {
    pub fn id(&self) -> TriggerId {
        self.id
    }

    /// Stop ticking. Takes effect at the worker's next period at the latest;
    /// ticks already queued are discarded by `pump`.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// =============================================================================
// UiQueue
// =============================================================================

/// UI-side end of the trigger channel.
pub struct UiQueue {
    ui: UiThread,
    sender: Sender<TriggerId>,
    receiver: Receiver<TriggerId>,
    triggers: RefCell<HashMap<TriggerId, Trigger>>,
    intervals: RefCell<Vec<Interval>>,
    next_id: Cell<u64>,
}

impl Default for UiQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UiQueue {
    /// Create a queue owned by the calling thread.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            ui: UiThread::current(),
            sender,
            receiver,
            triggers: RefCell::new(HashMap::new()),
            intervals: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    fn next_id(&self) -> TriggerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        TriggerId(id)
    }

    /// Run `callback` on the UI thread once `delay` has elapsed.
    pub fn set_timeout(
        &self,
        delay: Duration,
        callback: impl FnOnce() + 'static,
    ) -> Result<TriggerId> {
        self.ui.ensure()?;
        let id = self.next_id();
        let sender = self.sender.clone();

        thread::Builder::new()
            .name(format!("spark-timeout-{}", id.0))
            .spawn(move || {
                thread::sleep(delay);
                // The queue may be gone; nothing to deliver to then.
                let _ = sender.send(id);
            })
            .map_err(ReconcileError::Spawn)?;

        self.triggers
            .borrow_mut()
            .insert(id, Trigger::Once(Box::new(callback)));
        debug!(id = id.0, ?delay, "timeout scheduled");
        Ok(id)
    }

    /// Run `callback` on the UI thread every `period` until stopped.
    pub fn set_interval(
        &self,
        period: Duration,
        callback: impl Fn() + 'static,
    ) -> Result<Interval> {
        self.ui.ensure()?;
        let id = self.next_id();
        let sender = self.sender.clone();
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();

        thread::Builder::new()
            .name(format!("spark-interval-{}", id.0))
            .spawn(move || {
                while worker_running.load(Ordering::SeqCst) {
                    thread::sleep(period);
                    if !worker_running.load(Ordering::SeqCst) || sender.send(id).is_err() {
                        break;
                    }
                }
            })
            .map_err(ReconcileError::Spawn)?;

        self.triggers.borrow_mut().insert(
            id,
            Trigger::Repeat {
                callback: Rc::new(callback),
                running: running.clone(),
            },
        );
        let interval = Interval { id, running };
        self.intervals.borrow_mut().push(interval.clone());
        debug!(id = id.0, ?period, "interval scheduled");
        Ok(interval)
    }

    /// Run every trigger that has fired so far, then forget stopped
    /// intervals. Returns how many ran.
    pub fn pump(&self) -> Result<usize> {
        self.ui.ensure()?;
        let mut ran = 0;
        while let Ok(id) = self.receiver.try_recv() {
            ran += usize::from(self.dispatch(id));
        }
        self.prune_stopped();
        Ok(ran)
    }

    /// Wait up to `timeout` for the next trigger, then run everything that
    /// has fired. Returns how many ran.
    pub fn pump_timeout(&self, timeout: Duration) -> Result<usize> {
        self.ui.ensure()?;
        match self.receiver.recv_timeout(timeout) {
            Ok(id) => {
                let first = usize::from(self.dispatch(id));
                Ok(first + self.pump()?)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(0),
        }
    }

    /// Stop every interval created by this queue.
    pub fn stop_all(&self) {
        let count = {
            let intervals = self.intervals.borrow();
            for interval in intervals.iter() {
                interval.stop();
            }
            intervals.len()
        };
        self.prune_stopped();
        if count > 0 {
            debug!(count, "intervals stopped");
        }
    }

    /// Callbacks still registered (pending timeouts plus live intervals).
    pub fn pending(&self) -> usize {
        self.triggers
            .borrow()
            .values()
            .filter(|trigger| trigger.is_live())
            .count()
    }

    /// Drop the callbacks and handles of intervals that were stopped.
    fn prune_stopped(&self) {
        let before = self.triggers.borrow().len();
        self.triggers.borrow_mut().retain(|_, trigger| trigger.is_live());
        self.intervals.borrow_mut().retain(Interval::is_running);
        let pruned = before - self.triggers.borrow().len();
        if pruned > 0 {
            trace!(pruned, "stopped intervals dropped");
        }
    }

    /// Run the callback for `id`. The trigger table is not borrowed while a
    /// callback runs, so callbacks may schedule new triggers.
    fn dispatch(&self, id: TriggerId) -> bool {
        let trigger = self.triggers.borrow_mut().remove(&id);
        match trigger {
            Some(Trigger::Once(callback)) => {
                trace!(id = id.0, "timeout fired");
                callback();
                true
            }
            Some(Trigger::Repeat { callback, running }) => {
                if !running.load(Ordering::SeqCst) {
                    trace!(id = id.0, "tick from stopped interval dropped");
                    return false;
                }
                self.triggers.borrow_mut().insert(
                    id,
                    Trigger::Repeat {
                        callback: callback.clone(),
                        running,
                    },
                );
                trace!(id = id.0, "interval tick");
                callback();
                true
            }
            None => false,
        }
    }
}

impl Drop for UiQueue {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Free-function form of [`UiQueue::set_timeout`].
pub fn set_timeout(
    queue: &UiQueue,
    callback: impl FnOnce() + 'static,
    delay: Duration,
) -> Result<TriggerId> {
    queue.set_timeout(delay, callback)
}

/// Free-function form of [`UiQueue::set_interval`].
pub fn set_interval(
    queue: &UiQueue,
    callback: impl Fn() + 'static,
    period: Duration,
) -> Result<Interval> {
    queue.set_interval(period, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::signal;
    use std::time::Instant;

    fn pump_until(queue: &UiQueue, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "trigger never arrived");
            queue
                .pump_timeout(Duration::from_millis(50))
                .expect("pumped on the UI thread");
        }
    }

    #[test]
    fn test_timeout_runs_on_ui_thread() {
        let queue = UiQueue::new();
        let fired = signal(false);
        let ui = thread::current().id();
        let seen_thread = Rc::new(Cell::new(None));

        let writer = fired.clone();
        let seen = seen_thread.clone();
        queue
            .set_timeout(Duration::from_millis(5), move || {
                seen.set(Some(thread::current().id()));
                writer.set(true);
            })
            .expect("timeout scheduled");

        pump_until(&queue, || fired.peek());
        assert_eq!(seen_thread.get(), Some(ui));
        assert_eq!(queue.pending(), 0, "timeouts fire once");
    }

    #[test]
    fn test_interval_ticks_until_stopped() {
        let queue = UiQueue::new();
        let ticks = signal(0);
        let writer = ticks.clone();
        let interval =
            set_interval(&queue, move || writer.update(|n| n + 1), Duration::from_millis(2))
                .expect("interval scheduled");

        pump_until(&queue, || ticks.peek() >= 3);
        interval.stop();
        assert!(!interval.is_running());

        // Drain anything already in flight, then nothing more may arrive.
        thread::sleep(Duration::from_millis(20));
        queue.pump().expect("pump");
        let settled = ticks.peek();
        thread::sleep(Duration::from_millis(20));
        queue.pump().expect("pump");
        assert_eq!(ticks.peek(), settled, "stopped interval must not tick");
    }

    #[test]
    fn test_stop_all_stops_every_interval() {
        let queue = UiQueue::new();
        let a = queue.set_interval(Duration::from_millis(50), || {}).expect("a");
        let b = queue.set_interval(Duration::from_millis(50), || {}).expect("b");

        queue.stop_all();
        assert!(!a.is_running() && !b.is_running());
        assert_eq!(queue.pending(), 0, "stopped intervals are forgotten");
    }

    #[test]
    fn test_stopped_interval_released_after_drain() {
        let queue = UiQueue::new();
        let interval = queue
            .set_interval(Duration::from_millis(5), || {})
            .expect("interval scheduled");
        assert_eq!(queue.pending(), 1, "running interval is pending");

        interval.stop();
        assert_eq!(queue.pending(), 0, "a stopped interval is not pending");

        thread::sleep(Duration::from_millis(40));
        queue.pump().expect("pump");
        assert_eq!(queue.pending(), 0, "stopped interval is not pending");
        assert!(queue.triggers.borrow().is_empty(), "callback released");
        assert!(queue.intervals.borrow().is_empty(), "handle released");
    }

    #[test]
    fn test_callback_may_schedule_another() {
        let queue = Rc::new(UiQueue::new());
        let done = signal(false);

        let inner_queue = Rc::downgrade(&queue);
        let writer = done.clone();
        queue
            .set_timeout(Duration::from_millis(1), move || {
                if let Some(queue) = inner_queue.upgrade() {
                    let writer = writer.clone();
                    queue
                        .set_timeout(Duration::from_millis(1), move || writer.set(true))
                        .expect("nested timeout");
                }
            })
            .expect("outer timeout");

        pump_until(&queue, || done.peek());
    }
}
