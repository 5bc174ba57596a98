//! Chainable Animation
//!
//! Fluent chaining of animation primitives into sequential and parallel
//! groups, driven as one cancellable unit:
//!
//! ```ignore
//! use chainable_animation::ChainAnimator;
//!
//! let cancellable = ChainAnimator::with(&scheduler.handle(), &[text1, text2])
//!     .alpha(&[0.0, 1.0])
//!     .translation_x(&[0.0, 100.0])
//!     .then(&[button])
//!     .translation_y(&[0.0, 100.0])
//!     .start();
//! // ... later, if needed:
//! cancellable.cancel();
//! ```
//!
//! # Features
//!
//! - **Sequential steps**: `then(...)` finalizes the current step and begins
//!   the next; steps play strictly in order
//! - **Parallel branches**: `in_parallel_with(...)` accumulates branches that
//!   are sealed into one simultaneous group
//! - **Per-step and whole-chain decoration**: duration, start delay, easing,
//!   lifecycle callbacks (with optional delay on end callbacks)
//! - **One-shot cancellation**: the handle returned by `start()` cancels the
//!   entire chain exactly once, including pending delayed callbacks

pub mod chain;
pub mod easing;
pub mod error;
pub mod primitive;
pub mod scheduler;

mod group;

#[cfg(test)]
pub(crate) mod testsupport;

pub use chain::{ChainAnimator, ChainHandle};
pub use easing::Easing;
pub use error::ChainError;
pub use primitive::Primitive;
pub use scheduler::{AnimationScheduler, ChainId, SchedulerHandle, DEFAULT_DURATION_MS};

// Re-export the core contracts so most users only need this crate.
pub use chainable_core::{
    AnimatedTarget, Axis, Cancellable, CancellableSet, DelayQueue, Margins, TargetHandle,
    ViewProperty,
};
