//! Delayed callback facility
//!
//! A deterministic replacement for platform "post with delay" scheduling:
//! callbacks are queued with a delay in milliseconds and fired as the owner
//! advances the queue with frame deltas. Used for end-of-animation callbacks
//! requested with a delay; cancelling a chain clears the whole queue once.

use std::sync::{Arc, Mutex};

type Callback = Box<dyn FnOnce() + Send>;

struct Pending {
    remaining_ms: f32,
    callback: Callback,
}

/// A cloneable handle to a queue of delayed callbacks.
#[derive(Clone, Default)]
pub struct DelayQueue {
    inner: Arc<Mutex<Vec<Pending>>>,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `callback` to run once `delay_ms` of queue time has elapsed.
    pub fn post_delayed<F>(&self, callback: F, delay_ms: f32)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().unwrap().push(Pending {
            remaining_ms: delay_ms.max(0.0),
            callback: Box::new(callback),
        });
    }

    /// Drops every pending callback without running it.
    pub fn cancel_all_pending(&self) {
        let dropped = std::mem::take(&mut *self.inner.lock().unwrap());
        if !dropped.is_empty() {
            tracing::debug!("DelayQueue: dropped {} pending callbacks", dropped.len());
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.lock().unwrap().is_empty()
    }

    /// Advances queue time and runs every callback that has come due.
    ///
    /// Due callbacks are detached before the lock is released, so a callback
    /// that posts or cancels on this same queue is safe.
    pub fn advance(&self, dt_ms: f32) {
        let due: Vec<Callback> = {
            let mut pending = self.inner.lock().unwrap();
            for p in pending.iter_mut() {
                p.remaining_ms -= dt_ms;
            }
            let mut fired = Vec::new();
            let mut i = 0;
            while i < pending.len() {
                if pending[i].remaining_ms <= 0.0 {
                    fired.push(pending.remove(i).callback);
                } else {
                    i += 1;
                }
            }
            fired
        };
        for callback in due {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fires_after_delay() {
        let queue = DelayQueue::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        queue.post_delayed(
            move || {
                f.fetch_add(1, Ordering::SeqCst);
            },
            100.0,
        );

        queue.advance(50.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(queue.has_pending());

        queue.advance(50.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_cancel_all_pending_drops_callbacks() {
        let queue = DelayQueue::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        queue.post_delayed(
            move || {
                f.fetch_add(1, Ordering::SeqCst);
            },
            10.0,
        );
        queue.cancel_all_pending();
        queue.advance(1000.0);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_delay_fires_on_next_advance() {
        let queue = DelayQueue::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        queue.post_delayed(
            move || {
                f.fetch_add(1, Ordering::SeqCst);
            },
            0.0,
        );
        queue.advance(0.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_post_again() {
        let queue = DelayQueue::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let q = queue.clone();
        let f = fired.clone();
        queue.post_delayed(
            move || {
                let f2 = f.clone();
                f.fetch_add(1, Ordering::SeqCst);
                q.post_delayed(
                    move || {
                        f2.fetch_add(1, Ordering::SeqCst);
                    },
                    10.0,
                );
            },
            10.0,
        );

        queue.advance(10.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        queue.advance(10.0);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
