//! Error types for chainable_animation

use thiserror::Error;

/// Usage errors raised while constructing a chain.
///
/// The fluent entry points fail fast by panicking with the error's message;
/// `try_with` returns it for callers that prefer a `Result`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// A per-target step was requested with no targets.
    #[error("at least one animation target is required")]
    EmptyTargets,

    /// A resize animation was given a negative target dimension.
    #[error("target dimension must not be negative, got {0}")]
    NegativeDimension(f32),
}
