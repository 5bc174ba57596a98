//! Chainable Core
//!
//! Foundational contracts shared by the chainable animation crates:
//!
//! - **Cancellable**: uniform cancel/is-cancelled contract for anything that
//!   can stop an in-flight animation
//! - **CancellableSet**: fans cancellation out to a dynamic set of children
//! - **AnimatedTarget**: the property host being animated (get/set scalar
//!   attributes, dimensions, optional margin adjustment, re-layout requests)
//! - **DelayQueue**: deterministic delayed-callback facility for
//!   end-of-animation callbacks requested with a delay

pub mod cancel;
pub mod delay;
pub mod target;

pub use cancel::{Cancellable, CancellableSet};
pub use delay::DelayQueue;
pub use target::{AnimatedTarget, Axis, Margins, TargetHandle, ViewProperty};
