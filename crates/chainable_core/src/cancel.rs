//! Cancellation contracts
//!
//! `Cancellable` is implemented by every composed animation node and by
//! aggregates of them. `cancel()` must be idempotent and safe to call from
//! inside a cancel notification without recursing.

use std::sync::{Arc, Mutex};

/// Something that can stop an in-flight animation.
pub trait Cancellable: Send + Sync {
    /// Whether the animation has been cancelled.
    fn is_cancelled(&self) -> bool;

    /// Cancels any in-flight animation. Idempotent.
    fn cancel(&self);
}

/// Manages multiple [`Cancellable`]s and cancels them all together.
///
/// Cancellation swaps the child collection out before iterating it, so a
/// child whose own cancel path calls back into this set cannot observe (or
/// mutate) a collection that is mid-iteration.
#[derive(Default)]
pub struct CancellableSet {
    inner: Mutex<SetInner>,
}

#[derive(Default)]
struct SetInner {
    cancellables: Vec<Arc<dyn Cancellable>>,
    cancelled: bool,
}

impl CancellableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a child to receive cancellation.
    ///
    /// Note: adding after a prior `cancel()` resets the set to not-cancelled
    /// and starts a fresh collection. Inherited behavior, kept as-is; a
    /// caller that wants a terminally-cancelled aggregate should not reuse
    /// the set after cancelling it.
    pub fn add(&self, c: Arc<dyn Cancellable>) {
        let mut inner = self.inner.lock().unwrap();
        inner.cancelled = false;
        inner.cancellables.push(c);
    }

    /// Registers several children at once.
    pub fn add_all<I>(&self, cancellables: I)
    where
        I: IntoIterator<Item = Arc<dyn Cancellable>>,
    {
        for c in cancellables {
            self.add(c);
        }
    }

    /// Number of currently registered children.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().cancellables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().cancellables.is_empty()
    }
}

impl Cancellable for CancellableSet {
    fn is_cancelled(&self) -> bool {
        self.inner.lock().unwrap().cancelled
    }

    fn cancel(&self) {
        let detached = {
            let mut inner = self.inner.lock().unwrap();
            inner.cancelled = true;
            std::mem::take(&mut inner.cancellables)
        };
        // Lock released: a child cancelling back into this set sees the flag
        // already set and an empty collection.
        for c in &detached {
            if !c.is_cancelled() {
                c.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Counting {
        cancelled: AtomicBool,
        count: Arc<AtomicUsize>,
    }

    impl Counting {
        fn new(count: Arc<AtomicUsize>) -> Self {
            Self {
                cancelled: AtomicBool::new(false),
                count,
            }
        }
    }

    impl Cancellable for Counting {
        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }

        fn cancel(&self) {
            if !self.cancelled.swap(true, Ordering::SeqCst) {
                self.count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_cancels_each_child_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let set = CancellableSet::new();
        set.add(Arc::new(Counting::new(count.clone())));
        set.add(Arc::new(Counting::new(count.clone())));

        set.cancel();
        set.cancel();

        assert!(set.is_cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_skips_already_cancelled_children() {
        let count = Arc::new(AtomicUsize::new(0));
        let child = Arc::new(Counting::new(count.clone()));
        child.cancel();

        let set = CancellableSet::new();
        set.add(child);
        set.cancel();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_add_all_registers_every_child() {
        let count = Arc::new(AtomicUsize::new(0));
        let set = CancellableSet::new();
        assert!(set.is_empty());

        let children: Vec<Arc<dyn Cancellable>> = vec![
            Arc::new(Counting::new(count.clone())),
            Arc::new(Counting::new(count.clone())),
        ];
        set.add_all(children);
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());

        set.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        // Cancellation detaches the collection.
        assert!(set.is_empty());
    }

    struct Reentrant {
        cancelled: AtomicBool,
        set: Arc<CancellableSet>,
        count: Arc<AtomicUsize>,
    }

    impl Cancellable for Reentrant {
        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }

        fn cancel(&self) {
            if !self.cancelled.swap(true, Ordering::SeqCst) {
                self.count.fetch_add(1, Ordering::SeqCst);
                // Calls back into the owning aggregate mid-cancellation.
                self.set.cancel();
            }
        }
    }

    #[test]
    fn test_reentrant_cancel_does_not_double_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let set = Arc::new(CancellableSet::new());
        set.add(Arc::new(Reentrant {
            cancelled: AtomicBool::new(false),
            set: set.clone(),
            count: count.clone(),
        }));
        set.add(Arc::new(Counting::new(count.clone())));

        set.cancel();

        // Both X and Y cancelled exactly once each.
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_add_after_cancel_resets_flag() {
        let count = Arc::new(AtomicUsize::new(0));
        let set = CancellableSet::new();
        set.cancel();
        assert!(set.is_cancelled());

        // Documented quirk: the aggregate becomes reusable.
        set.add(Arc::new(Counting::new(count.clone())));
        assert!(!set.is_cancelled());

        set.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
