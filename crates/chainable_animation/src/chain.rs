//! Fluent chain builder
//!
//! A chain is built step by step: per-property requests accumulate
//! primitives on the current step, `then(...)` finalizes the step into the
//! session's ordered list and opens the next sequential one, and
//! `in_parallel_with(...)` defers placement while accumulating branches that
//! are sealed into one simultaneous group. `start()` materializes the list
//! into a running schedule and returns a [`ChainHandle`] that cancels the
//! whole chain.
//!
//! Finalizing operations consume the builder, so a step cannot be finalized
//! twice and `start()` cannot be called twice on the same chain.

use crate::easing::Easing;
use crate::error::ChainError;
use crate::group::{Group, GroupId, GroupMember, Overall};
use crate::primitive::Primitive;
use crate::scheduler::{ChainId, RunChain, SchedulerHandle};
use chainable_core::{Axis, Cancellable, DelayQueue, TargetHandle, ViewProperty};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

// ============================================================================
// Chain session
// ============================================================================

/// State shared by every node built from one `with(...)` call: the ordered
/// list of finalized groups, whole-chain decorations, the delay queue for
/// delayed end callbacks, and the chain-wide cancelled flag.
pub(crate) struct Session {
    inner: Mutex<SessionInner>,
    pub(crate) delays: DelayQueue,
    pub(crate) cancelled: Arc<AtomicBool>,
    scheduler: SchedulerHandle,
    chain_id: OnceLock<ChainId>,
}

struct SessionInner {
    groups: Vec<Group>,
    overall: Overall,
    next_group_id: u64,
}

impl Session {
    fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                groups: Vec::new(),
                overall: Overall::default(),
                next_group_id: 0,
            }),
            delays: DelayQueue::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
            scheduler,
            chain_id: OnceLock::new(),
        }
    }

    fn new_group(&self) -> Group {
        let mut inner = self.inner.lock().unwrap();
        let id = GroupId(inner.next_group_id);
        inner.next_group_id += 1;
        Group::new(id)
    }

    /// Appends a finalized group, guarding against re-insertion by identity.
    fn push_group(&self, group: Group) {
        let mut inner = self.inner.lock().unwrap();
        if inner.groups.iter().any(|g| g.id == group.id) {
            return;
        }
        inner.groups.push(group);
    }

    #[cfg(test)]
    fn group_count(&self) -> usize {
        self.inner.lock().unwrap().groups.len()
    }

    /// Seals accumulated parallel branches into one group that plays them
    /// all together. The wrapper carries a cancel hook that funnels an
    /// engine-originated cancellation into the chain-wide transition.
    fn seal(self: &Arc<Self>, group: Group, mut siblings: Vec<Group>) -> Group {
        siblings.push(group);
        let mut wrapper = self.new_group();
        wrapper.members = siblings.into_iter().map(GroupMember::Group).collect();
        let session = Arc::clone(self);
        wrapper
            .callbacks
            .on_cancel
            .push(Box::new(move || session.cancel_chain()));
        wrapper
    }

    /// The single cancellation transition: flag first, then clear pending
    /// delayed callbacks, discard shared state, and cancel the running
    /// schedule. Re-entry (a cancel callback cancelling again) is cut off by
    /// the flag.
    fn cancel_chain(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.delays.cancel_all_pending();
        self.inner.lock().unwrap().groups.clear();
        if let Some(id) = self.chain_id.get() {
            self.scheduler.cancel_chain(*id);
        }
    }

    fn start_chain(self: &Arc<Self>) -> ChainHandle {
        let (groups, overall) = {
            let mut inner = self.inner.lock().unwrap();
            (
                std::mem::take(&mut inner.groups),
                std::mem::take(&mut inner.overall),
            )
        };
        tracing::debug!("starting animation chain with {} groups", groups.len());
        let finished = Arc::new(AtomicBool::new(false));
        let run = RunChain::build(groups, overall, self.delays.clone(), finished.clone());
        if let Some(id) = self.scheduler.register(run) {
            let _ = self.chain_id.set(id);
        }
        ChainHandle {
            session: Arc::clone(self),
            finished,
        }
    }
}

// ============================================================================
// Chain handle
// ============================================================================

/// Cancellable covering an entire started chain.
#[derive(Clone)]
pub struct ChainHandle {
    session: Arc<Session>,
    finished: Arc<AtomicBool>,
}

impl ChainHandle {
    /// Whether the chain ran to natural completion. Stays false for
    /// cancelled chains.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Cancellable for ChainHandle {
    fn is_cancelled(&self) -> bool {
        self.session.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.session.cancel_chain();
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Which behaviors the current step carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Variant {
    /// Built from a pre-made primitive; no per-property requests.
    Plain,
    /// Carries targets; per-property requests allowed.
    Targeted,
    /// Like the above, but accumulating parallel siblings until sealed.
    Parallel,
}

/// The in-progress builder for one chain step.
pub struct ChainAnimator {
    session: Arc<Session>,
    group: Group,
    pending: Vec<Primitive>,
    targets: Vec<TargetHandle>,
    siblings: Vec<Group>,
    variant: Variant,
}

impl ChainAnimator {
    /// Starts an animation chain on one or more targets. Requested property
    /// animations run on all given targets in parallel.
    ///
    /// # Panics
    ///
    /// Panics if `targets` is empty. Use [`try_with`](Self::try_with) for a
    /// `Result`.
    pub fn with(scheduler: &SchedulerHandle, targets: &[TargetHandle]) -> Self {
        match Self::try_with(scheduler, targets) {
            Ok(chain) => chain,
            Err(e) => panic!("{e}"),
        }
    }

    /// Non-panicking form of [`with`](Self::with).
    pub fn try_with(
        scheduler: &SchedulerHandle,
        targets: &[TargetHandle],
    ) -> Result<Self, ChainError> {
        if targets.is_empty() {
            return Err(ChainError::EmptyTargets);
        }
        let session = Arc::new(Session::new(scheduler.clone()));
        let group = session.new_group();
        Ok(Self {
            session,
            group,
            pending: Vec::new(),
            targets: targets.to_vec(),
            siblings: Vec::new(),
            variant: Variant::Targeted,
        })
    }

    /// Starts an animation chain from a pre-built primitive.
    pub fn with_primitive(scheduler: &SchedulerHandle, primitive: Primitive) -> Self {
        let session = Arc::new(Session::new(scheduler.clone()));
        let group = session.new_group();
        Self {
            session,
            group,
            pending: vec![primitive],
            targets: Vec::new(),
            siblings: Vec::new(),
            variant: Variant::Plain,
        }
    }

    // ------------------------------------------------------------------
    // Finalizing operations (consume self)
    // ------------------------------------------------------------------

    /// Finalizes the current step and begins the next sequential one on the
    /// given targets.
    ///
    /// # Panics
    ///
    /// Panics if `targets` is empty.
    pub fn then(self, targets: &[TargetHandle]) -> ChainAnimator {
        if targets.is_empty() {
            panic!("{}", ChainError::EmptyTargets);
        }
        let session = self.finalize();
        let group = session.new_group();
        ChainAnimator {
            session,
            group,
            pending: Vec::new(),
            targets: targets.to_vec(),
            siblings: Vec::new(),
            variant: Variant::Targeted,
        }
    }

    /// Finalizes the current step and begins the next sequential one from a
    /// pre-built primitive.
    pub fn then_primitive(self, primitive: Primitive) -> ChainAnimator {
        let session = self.finalize();
        let group = session.new_group();
        ChainAnimator {
            session,
            group,
            pending: vec![primitive],
            targets: Vec::new(),
            siblings: Vec::new(),
            variant: Variant::Plain,
        }
    }

    /// Declares the given targets to animate in parallel with the current
    /// step. Placement into the chain is deferred: branches accumulate until
    /// the next `then`/`start` seals them all into one simultaneous group.
    ///
    /// # Panics
    ///
    /// Panics if `targets` is empty.
    pub fn in_parallel_with(mut self, targets: &[TargetHandle]) -> ChainAnimator {
        if targets.is_empty() {
            panic!("{}", ChainError::EmptyTargets);
        }
        self.finish_step();
        let Self {
            session,
            group,
            mut siblings,
            ..
        } = self;
        siblings.push(group);
        let next = session.new_group();
        ChainAnimator {
            session,
            group: next,
            pending: Vec::new(),
            targets: targets.to_vec(),
            siblings,
            variant: Variant::Parallel,
        }
    }

    /// Like [`in_parallel_with`](Self::in_parallel_with), with a pre-built
    /// primitive as the new branch.
    pub fn in_parallel_with_primitive(mut self, primitive: Primitive) -> ChainAnimator {
        self.finish_step();
        let Self {
            session,
            group,
            mut siblings,
            ..
        } = self;
        siblings.push(group);
        let next = session.new_group();
        ChainAnimator {
            session,
            group: next,
            pending: vec![primitive],
            targets: Vec::new(),
            siblings,
            variant: Variant::Parallel,
        }
    }

    /// Finalizes the current step, materializes the chain, and starts
    /// playback. The t=0 frame runs synchronously before this returns.
    pub fn start(self) -> ChainHandle {
        let session = self.finalize();
        session.start_chain()
    }

    /// Folds pending primitives into the current group. Idempotent when
    /// there is nothing pending.
    fn finish_step(&mut self) {
        self.group
            .members
            .extend(self.pending.drain(..).map(GroupMember::Primitive));
    }

    /// Folds, seals parallel branches if accumulating, and appends the
    /// resulting group to the session's ordered list.
    fn finalize(mut self) -> Arc<Session> {
        self.finish_step();
        let Self {
            session,
            group,
            siblings,
            variant,
            ..
        } = self;
        let sealed = if variant == Variant::Parallel {
            session.seal(group, siblings)
        } else {
            group
        };
        session.push_group(sealed);
        session
    }

    // ------------------------------------------------------------------
    // Per-step decoration
    // ------------------------------------------------------------------

    /// Duration of the current step, in ms. Last write wins; already
    /// finalized steps are unaffected.
    pub fn duration(mut self, duration_ms: u32) -> Self {
        self.group.duration_ms = Some(duration_ms as f32);
        self
    }

    /// Start delay of the current step, in ms.
    pub fn start_delay(mut self, delay_ms: u32) -> Self {
        self.group.start_delay_ms = Some(delay_ms as f32);
        self
    }

    /// Easing for the current step.
    pub fn easing(mut self, easing: Easing) -> Self {
        self.group.easing = Some(easing);
        self
    }

    /// Runs `f` when the current step starts playing.
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.group.callbacks.on_start.push(Box::new(f));
        self
    }

    /// Runs `f` if the current step (or the overall chain) gets cancelled.
    pub fn on_cancel<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.group.callbacks.on_cancel.push(Box::new(f));
        self
    }

    /// Runs `f` when the current step ends. Suppressed if the chain has been
    /// cancelled by the time the step would end.
    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let guarded = self.guard_against_cancel(f);
        self.group.callbacks.on_end.push(guarded);
        self
    }

    /// Runs `f` a further `delay_ms` after the current step ends, routed
    /// through the chain's delay queue. Suppressed at invocation time if the
    /// chain has been cancelled.
    pub fn on_end_delayed<F>(mut self, f: F, delay_ms: u32) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let guarded = self.guard_against_cancel(f);
        self.group
            .callbacks
            .on_end_delayed
            .push((guarded, delay_ms as f32));
        self
    }

    fn guard_against_cancel<F>(&self, f: F) -> Box<dyn FnOnce() + Send>
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = self.session.cancelled.clone();
        Box::new(move || {
            if !cancelled.load(Ordering::SeqCst) {
                f();
            }
        })
    }

    // ------------------------------------------------------------------
    // Whole-chain decoration
    // ------------------------------------------------------------------

    /// Duration for the entire chain, in ms. Overrides every step's own
    /// duration.
    pub fn overall_duration(self, duration_ms: u32) -> Self {
        self.session.inner.lock().unwrap().overall.duration_ms = Some(duration_ms as f32);
        self
    }

    /// Start delay for the entire chain, in ms.
    pub fn overall_start_delay(self, delay_ms: u32) -> Self {
        self.session.inner.lock().unwrap().overall.start_delay_ms = Some(delay_ms as f32);
        self
    }

    /// Easing for the entire chain. Overrides every step's own easing.
    pub fn overall_easing(self, easing: Easing) -> Self {
        self.session.inner.lock().unwrap().overall.easing = Some(easing);
        self
    }

    /// Runs `f` when the very first step starts playing.
    pub fn on_overall_start<F>(self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.session
            .inner
            .lock()
            .unwrap()
            .overall
            .callbacks
            .on_start
            .push(Box::new(f));
        self
    }

    /// Runs `f` if the overall chain gets cancelled.
    pub fn on_overall_cancel<F>(self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.session
            .inner
            .lock()
            .unwrap()
            .overall
            .callbacks
            .on_cancel
            .push(Box::new(f));
        self
    }

    /// Runs `f` when the very last step finishes. Suppressed after
    /// cancellation.
    pub fn on_overall_end<F>(self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let guarded = self.guard_against_cancel(f);
        self.session
            .inner
            .lock()
            .unwrap()
            .overall
            .callbacks
            .on_end
            .push(guarded);
        self
    }

    /// Runs `f` a further `delay_ms` after the whole chain finishes.
    /// Suppressed at invocation time after cancellation.
    pub fn on_overall_end_delayed<F>(self, f: F, delay_ms: u32) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let guarded = self.guard_against_cancel(f);
        self.session
            .inner
            .lock()
            .unwrap()
            .overall
            .callbacks
            .on_end_delayed
            .push((guarded, delay_ms as f32));
        self
    }

    // ------------------------------------------------------------------
    // Per-property animation requests
    // ------------------------------------------------------------------

    pub fn x(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::X, values, false)
    }

    pub fn x_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::X, delta)
    }

    pub fn y(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::Y, values, false)
    }

    pub fn y_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::Y, delta)
    }

    pub fn z(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::Z, values, false)
    }

    pub fn z_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::Z, delta)
    }

    pub fn rotation(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::Rotation, values, false)
    }

    pub fn rotation_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::Rotation, delta)
    }

    pub fn rotation_x(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::RotationX, values, false)
    }

    pub fn rotation_x_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::RotationX, delta)
    }

    pub fn rotation_y(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::RotationY, values, false)
    }

    pub fn rotation_y_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::RotationY, delta)
    }

    /// Animates `translationX`. With an explicit start value the targets are
    /// snapped to it immediately, before playback begins.
    pub fn translation_x(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::TranslationX, values, true)
    }

    pub fn translation_x_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::TranslationX, delta)
    }

    /// Animates `translationY`. With an explicit start value the targets are
    /// snapped to it immediately, before playback begins.
    pub fn translation_y(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::TranslationY, values, true)
    }

    pub fn translation_y_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::TranslationY, delta)
    }

    pub fn translation_z(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::TranslationZ, values, false)
    }

    pub fn translation_z_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::TranslationZ, delta)
    }

    pub fn scale_x(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::ScaleX, values, false)
    }

    pub fn scale_x_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::ScaleX, delta)
    }

    pub fn scale_y(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::ScaleY, values, false)
    }

    pub fn scale_y_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::ScaleY, delta)
    }

    /// Animates `alpha`. With an explicit start value the targets are
    /// snapped to it immediately, before playback begins.
    pub fn alpha(self, values: &[f32]) -> Self {
        self.animate_property(ViewProperty::Alpha, values, true)
    }

    pub fn alpha_by(self, delta: f32) -> Self {
        self.animate_property_by(ViewProperty::Alpha, delta)
    }

    /// Animates the targets' height to `value` without touching margins.
    /// A value of exactly 0 also drives both margins to 0.
    ///
    /// Note: this directly mutates target dimensions and requests re-layout
    /// every frame.
    ///
    /// # Panics
    ///
    /// Panics if `value` is negative.
    pub fn height(self, value: f32) -> Self {
        if value == 0.0 {
            self.height_with_margins(0.0, Some(0.0), Some(0.0))
        } else {
            self.height_with_margins(value, None, None)
        }
    }

    /// Animates the targets' height while also moving the top/bottom margins
    /// toward the given end values. Margin movement silently degrades to a
    /// no-op on targets without the margin-adjustment capability.
    ///
    /// # Panics
    ///
    /// Panics if `value` is negative.
    pub fn height_with_margins(
        self,
        value: f32,
        end_top_margin: Option<f32>,
        end_bottom_margin: Option<f32>,
    ) -> Self {
        self.resize(Axis::Vertical, value, end_top_margin, end_bottom_margin)
    }

    /// Animates the targets' width to `value` without touching margins.
    /// A value of exactly 0 also drives both margins to 0.
    ///
    /// # Panics
    ///
    /// Panics if `value` is negative.
    pub fn width(self, value: f32) -> Self {
        if value == 0.0 {
            self.width_with_margins(0.0, Some(0.0), Some(0.0))
        } else {
            self.width_with_margins(value, None, None)
        }
    }

    /// Animates the targets' width while also moving the start/end margins
    /// toward the given end values. Margin movement silently degrades to a
    /// no-op on targets without the margin-adjustment capability.
    ///
    /// # Panics
    ///
    /// Panics if `value` is negative.
    pub fn width_with_margins(
        self,
        value: f32,
        end_start_margin: Option<f32>,
        end_end_margin: Option<f32>,
    ) -> Self {
        self.resize(Axis::Horizontal, value, end_start_margin, end_end_margin)
    }

    fn animate_property(mut self, property: ViewProperty, values: &[f32], snap: bool) -> Self {
        self.require_targets();
        assert!(!values.is_empty(), "at least one waypoint value is required");
        for target in self.targets.clone() {
            if snap && values.len() > 1 {
                // Documented immediate side effect: the target jumps to the
                // explicit start value at call time.
                target.set(property, values[0]);
            }
            self.pending
                .push(Primitive::property(target, property, values.to_vec()));
        }
        self
    }

    fn animate_property_by(mut self, property: ViewProperty, delta: f32) -> Self {
        self.require_targets();
        for target in self.targets.clone() {
            let current = target.get(property);
            self.pending.push(Primitive::property(
                target,
                property,
                vec![current, current + delta],
            ));
        }
        self
    }

    fn resize(
        mut self,
        axis: Axis,
        value: f32,
        leading_margin: Option<f32>,
        trailing_margin: Option<f32>,
    ) -> Self {
        if value < 0.0 {
            panic!("{}", ChainError::NegativeDimension(value));
        }
        self.require_targets();
        for target in self.targets.clone() {
            self.pending.push(Primitive::resize(
                target,
                axis,
                value,
                leading_margin,
                trailing_margin,
            ));
        }
        self
    }

    /// Per-property requests are only valid on target-bearing steps.
    fn require_targets(&self) {
        if self.variant == Variant::Plain {
            panic!("this chain step was built from a primitive and has no animation targets");
        }
    }
}
