//! Animation scheduler
//!
//! Drives materialized chains frame by frame. Chains are registered when
//! `start()` materializes them; the host calls [`AnimationScheduler::tick`]
//! with the frame delta and the scheduler advances every running chain,
//! firing lifecycle callbacks after its lock is released so a callback that
//! cancels mid-flight can never deadlock.

use crate::easing::Easing;
use crate::group::{Callback, Callbacks, Group, GroupMember, Overall};
use chainable_core::DelayQueue;
use slotmap::{new_key_type, SlotMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Duration used for primitives whose group (and chain) carry no override.
pub const DEFAULT_DURATION_MS: u32 = 300;

new_key_type! {
    /// Handle to a chain registered with the scheduler.
    pub struct ChainId;
}

// ============================================================================
// Runtime schedule
// ============================================================================

struct RunLeaf {
    primitive: crate::primitive::Primitive,
    duration_ms: f32,
    easing: Easing,
    done: bool,
}

enum RunNode {
    Leaf(RunLeaf),
    Set(RunSet),
}

/// A group of members playing together, with its own local clock.
struct RunSet {
    children: Vec<RunNode>,
    delay_ms: f32,
    /// Total time this set occupies: delay + longest member.
    extent_ms: f32,
    started: bool,
    ended: bool,
    callbacks: Callbacks,
}

/// One running chain: sequential sets, each starting when the previous ends.
pub(crate) struct RunChain {
    sets: Vec<RunSet>,
    /// Precomputed start offsets of each set on the chain-local clock.
    starts: Vec<f32>,
    index: usize,
    elapsed_ms: f32,
    delay_ms: f32,
    started: bool,
    finished: bool,
    callbacks: Callbacks,
    delays: DelayQueue,
    finished_flag: Arc<AtomicBool>,
}

fn build_set(
    group: Group,
    inherited_duration: Option<f32>,
    inherited_easing: Option<Easing>,
    overall_duration: Option<f32>,
    overall_easing: Option<Easing>,
) -> RunSet {
    // Innermost group override wins; an overall override beats them all.
    let duration = group.duration_ms.or(inherited_duration);
    let easing = group.easing.or(inherited_easing);

    let mut children = Vec::with_capacity(group.members.len());
    let mut longest = 0.0f32;
    for member in group.members {
        match member {
            GroupMember::Primitive(primitive) => {
                let duration_ms = overall_duration
                    .or(duration)
                    .unwrap_or(DEFAULT_DURATION_MS as f32);
                longest = longest.max(duration_ms);
                children.push(RunNode::Leaf(RunLeaf {
                    primitive,
                    duration_ms,
                    easing: overall_easing.or(easing).unwrap_or_default(),
                    done: false,
                }));
            }
            GroupMember::Group(inner) => {
                let set = build_set(inner, duration, easing, overall_duration, overall_easing);
                longest = longest.max(set.extent_ms);
                children.push(RunNode::Set(set));
            }
        }
    }

    let delay_ms = group.start_delay_ms.unwrap_or(0.0);
    RunSet {
        children,
        delay_ms,
        extent_ms: delay_ms + longest,
        started: false,
        ended: false,
        callbacks: group.callbacks,
    }
}

impl RunChain {
    pub(crate) fn build(
        groups: Vec<Group>,
        overall: Overall,
        delays: DelayQueue,
        finished_flag: Arc<AtomicBool>,
    ) -> Self {
        let mut sets = Vec::with_capacity(groups.len());
        let mut starts = Vec::with_capacity(groups.len());
        let mut offset = 0.0f32;
        for group in groups {
            let set = build_set(group, None, None, overall.duration_ms, overall.easing);
            starts.push(offset);
            offset += set.extent_ms;
            sets.push(set);
        }
        Self {
            sets,
            starts,
            index: 0,
            elapsed_ms: 0.0,
            delay_ms: overall.start_delay_ms.unwrap_or(0.0),
            started: false,
            finished: false,
            callbacks: overall.callbacks,
            delays,
            finished_flag,
        }
    }

    /// Advances the chain clock, collecting callbacks to fire once the
    /// scheduler lock is released.
    fn advance(&mut self, dt_ms: f32, fired: &mut Vec<Callback>) {
        if self.finished {
            return;
        }
        self.elapsed_ms += dt_ms;
        let local = self.elapsed_ms - self.delay_ms;
        if local < 0.0 {
            return;
        }
        if !self.started {
            self.started = true;
            fired.append(&mut self.callbacks.on_start);
        }

        let mut delayed: Vec<(Callback, f32)> = Vec::new();
        while self.index < self.sets.len() {
            let set_local = local - self.starts[self.index];
            if set_local < 0.0 {
                break;
            }
            let done = advance_set(&mut self.sets[self.index], set_local, fired, &mut delayed);
            if !done {
                break;
            }
            tracing::trace!("chain group {} finished", self.index);
            self.index += 1;
        }

        if self.index == self.sets.len() {
            self.finished = true;
            self.finished_flag.store(true, Ordering::SeqCst);
            fired.append(&mut self.callbacks.on_end);
            delayed.append(&mut self.callbacks.on_end_delayed);
            self.callbacks.on_cancel.clear();
        }

        for (callback, delay_ms) in delayed {
            self.delays.post_delayed(callback, delay_ms);
        }
    }
}

/// Advances one set to `local_ms` on its parent's clock. Leaf values are
/// written idempotently from clamped progress, so a tick that jumps past a
/// boundary still lands every member exactly on its final value.
fn advance_set(
    set: &mut RunSet,
    local_ms: f32,
    fired: &mut Vec<Callback>,
    delayed: &mut Vec<(Callback, f32)>,
) -> bool {
    if set.ended {
        return true;
    }
    if local_ms < set.delay_ms {
        return false;
    }
    let t = local_ms - set.delay_ms;
    if !set.started {
        set.started = true;
        fired.append(&mut set.callbacks.on_start);
    }

    let mut all_done = true;
    for child in &mut set.children {
        match child {
            RunNode::Leaf(leaf) => {
                if leaf.done {
                    continue;
                }
                let progress = if leaf.duration_ms <= 0.0 {
                    1.0
                } else {
                    (t / leaf.duration_ms).min(1.0)
                };
                leaf.primitive.apply(leaf.easing.apply(progress));
                if progress >= 1.0 {
                    leaf.done = true;
                } else {
                    all_done = false;
                }
            }
            RunNode::Set(inner) => {
                if !advance_set(inner, t, fired, delayed) {
                    all_done = false;
                }
            }
        }
    }

    if all_done {
        set.ended = true;
        fired.append(&mut set.callbacks.on_end);
        delayed.append(&mut set.callbacks.on_end_delayed);
        set.callbacks.on_cancel.clear();
    }
    all_done
}

/// Collects on-cancel callbacks from every started-but-unfinished set and
/// marks the subtree terminal. Unstarted sets never fire cancel callbacks.
fn collect_cancel_callbacks(set: &mut RunSet, fired: &mut Vec<Callback>) {
    if !set.started || set.ended {
        return;
    }
    fired.append(&mut set.callbacks.on_cancel);
    for child in &mut set.children {
        if let RunNode::Set(inner) = child {
            collect_cancel_callbacks(inner, fired);
        }
    }
    set.ended = true;
    set.callbacks.on_start.clear();
    set.callbacks.on_end.clear();
    set.callbacks.on_end_delayed.clear();
}

// ============================================================================
// Scheduler
// ============================================================================

struct SchedulerInner {
    chains: SlotMap<ChainId, RunChain>,
}

/// Drives all running chains. Held by the host; builders receive a
/// [`SchedulerHandle`].
pub struct AnimationScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                chains: SlotMap::with_key(),
            })),
        }
    }

    /// Get a handle to this scheduler for passing to chain builders.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Advance every running chain by `dt_ms`.
    ///
    /// Delay queues are advanced at the top of the tick, so a callback queued
    /// during this tick starts counting down on the next one. Returns true
    /// while any chain still has work (playback or pending delayed
    /// callbacks).
    pub fn tick(&self, dt_ms: f32) -> bool {
        let queues: Vec<DelayQueue> = {
            let guard = self.inner.lock().unwrap();
            guard.chains.values().map(|c| c.delays.clone()).collect()
        };
        for queue in &queues {
            queue.advance(dt_ms);
        }

        let (fired, active) = {
            let mut guard = self.inner.lock().unwrap();
            let mut fired = Vec::new();
            for (_, chain) in guard.chains.iter_mut() {
                chain.advance(dt_ms, &mut fired);
            }
            guard
                .chains
                .retain(|_, chain| !chain.finished || chain.delays.has_pending());
            (fired, !guard.chains.is_empty())
        };
        for callback in fired {
            callback();
        }
        active
    }

    /// Check if any chains are still registered.
    pub fn has_active_animations(&self) -> bool {
        !self.inner.lock().unwrap().chains.is_empty()
    }

    /// Number of registered chains.
    pub fn chain_count(&self) -> usize {
        self.inner.lock().unwrap().chains.len()
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A weak handle to the animation scheduler.
///
/// Passed into chain builders; it won't keep the scheduler alive. Starting a
/// chain against a dropped scheduler yields an inert handle.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<Mutex<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Registers a chain and synchronously runs its t=0 frame, so immediate
    /// start callbacks and initial values land before `start()` returns.
    pub(crate) fn register(&self, chain: RunChain) -> Option<ChainId> {
        let inner = self.inner.upgrade()?;
        let (id, fired) = {
            let mut guard = inner.lock().unwrap();
            let id = guard.chains.insert(chain);
            let mut fired = Vec::new();
            guard.chains[id].advance(0.0, &mut fired);
            guard
                .chains
                .retain(|_, chain| !chain.finished || chain.delays.has_pending());
            (id, fired)
        };
        for callback in fired {
            callback();
        }
        Some(id)
    }

    /// Cancels a chain: fires on-cancel callbacks for every started and
    /// unfinished group plus the whole-chain one, drops all remaining
    /// listeners, and removes the entry.
    pub(crate) fn cancel_chain(&self, id: ChainId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let fired = {
            let mut guard = inner.lock().unwrap();
            let Some(mut chain) = guard.chains.remove(id) else {
                return;
            };
            tracing::debug!("cancelling chain after {}ms", chain.elapsed_ms);
            let mut fired = Vec::new();
            for set in &mut chain.sets {
                collect_cancel_callbacks(set, &mut fired);
            }
            fired.append(&mut chain.callbacks.on_cancel);
            fired
        };
        for callback in fired {
            callback();
        }
    }

    /// Check if the scheduler is still alive.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainAnimator;
    use crate::testsupport::StubView;
    use chainable_core::{Cancellable, ViewProperty};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_sequential_groups_play_in_order() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();
        let b = StubView::new();

        let handle = ChainAnimator::with(&scheduler.handle(), &[a.clone()])
            .alpha(&[0.0, 1.0])
            .translation_x(&[0.0, 100.0])
            .then(&[b.clone()])
            .translation_y(&[0.0, 100.0])
            .start();

        // Halfway through group 1: group 2 untouched.
        scheduler.tick(150.0);
        assert_eq!(a.value(ViewProperty::Alpha), 0.5);
        assert_eq!(a.value(ViewProperty::TranslationX), 50.0);
        assert_eq!(b.value(ViewProperty::TranslationY), 0.0);
        assert!(!handle.is_finished());

        // Group 1 completes, group 2 starts on the same boundary.
        scheduler.tick(150.0);
        assert_eq!(a.value(ViewProperty::Alpha), 1.0);
        assert_eq!(a.value(ViewProperty::TranslationX), 100.0);
        assert_eq!(b.value(ViewProperty::TranslationY), 0.0);

        scheduler.tick(300.0);
        assert_eq!(b.value(ViewProperty::TranslationY), 100.0);
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
        assert!(!scheduler.has_active_animations());
    }

    #[test]
    fn test_tick_jumping_a_boundary_lands_exact_values() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();
        let b = StubView::new();

        ChainAnimator::with(&scheduler.handle(), &[a.clone()])
            .alpha(&[0.0, 1.0])
            .then(&[b.clone()])
            .translation_y(&[0.0, 100.0])
            .start();

        // One huge tick crosses both groups.
        scheduler.tick(10_000.0);
        assert_eq!(a.value(ViewProperty::Alpha), 1.0);
        assert_eq!(b.value(ViewProperty::TranslationY), 100.0);
    }

    #[test]
    fn test_cancel_stops_future_groups() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();
        let b = StubView::new();

        let handle = ChainAnimator::with(&scheduler.handle(), &[a.clone()])
            .alpha(&[0.0, 1.0])
            .then(&[b.clone()])
            .translation_y(&[0.0, 100.0])
            .start();

        scheduler.tick(150.0);
        handle.cancel();
        assert!(handle.is_cancelled());

        scheduler.tick(1000.0);
        // Frozen where it was cancelled; group 2 never starts.
        assert_eq!(a.value(ViewProperty::Alpha), 0.5);
        assert_eq!(b.value(ViewProperty::TranslationY), 0.0);
        assert!(!scheduler.has_active_animations());
    }

    #[test]
    fn test_overall_duration_overrides_group_duration() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();

        let handle = ChainAnimator::with(&scheduler.handle(), &[a.clone()])
            .duration(1000)
            .alpha(&[0.0, 1.0])
            .overall_duration(200)
            .start();

        scheduler.tick(200.0);
        assert_eq!(a.value(ViewProperty::Alpha), 1.0);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_overall_start_delay_defers_everything() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();
        let started = Arc::new(AtomicUsize::new(0));

        let s = started.clone();
        ChainAnimator::with(&scheduler.handle(), &[a.clone()])
            .alpha(&[0.0, 1.0])
            .on_start(move || {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .overall_start_delay(100)
            .start();

        assert_eq!(started.load(Ordering::SeqCst), 0);
        scheduler.tick(50.0);
        assert_eq!(started.load(Ordering::SeqCst), 0);
        scheduler.tick(50.0);
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(a.value(ViewProperty::Alpha), 0.0);
    }

    #[test]
    fn test_group_start_delay_extends_extent() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();

        let handle = ChainAnimator::with(&scheduler.handle(), &[a.clone()])
            .start_delay(100)
            .alpha(&[0.0, 1.0])
            .start();

        scheduler.tick(100.0);
        assert_eq!(a.value(ViewProperty::Alpha), 0.0);
        scheduler.tick(300.0);
        assert_eq!(a.value(ViewProperty::Alpha), 1.0);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_tick_drains_to_inactive() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        ChainAnimator::with(&scheduler.handle(), &[a.clone()])
            .alpha(&[0.0, 1.0])
            .on_end_delayed(
                move || {
                    f.fetch_add(1, Ordering::SeqCst);
                },
                100,
            )
            .start();

        // Playback done, delayed callback still queued: the chain stays
        // registered until its queue drains.
        assert!(scheduler.tick(300.0));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Delayed callback fires and the scheduler reports idle.
        assert!(!scheduler.tick(100.0));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chain_count_tracks_registrations() {
        let scheduler = AnimationScheduler::new();
        let a = StubView::new();
        let b = StubView::new();

        ChainAnimator::with(&scheduler.handle(), &[a])
            .alpha(&[0.0, 1.0])
            .start();
        ChainAnimator::with(&scheduler.handle(), &[b])
            .duration(600)
            .alpha(&[0.0, 1.0])
            .start();
        assert_eq!(scheduler.chain_count(), 2);

        scheduler.tick(300.0);
        assert_eq!(scheduler.chain_count(), 1);
        scheduler.tick(300.0);
        assert_eq!(scheduler.chain_count(), 0);
    }

    #[test]
    fn test_dropped_scheduler_yields_inert_handle() {
        let weak = {
            let scheduler = AnimationScheduler::new();
            scheduler.handle()
        };
        assert!(!weak.is_alive());

        let a = StubView::new();
        let handle = ChainAnimator::with(&weak, &[a]).alpha(&[0.0, 1.0]).start();
        assert!(!handle.is_finished());
        handle.cancel(); // must not panic
        assert!(handle.is_cancelled());
    }
}
