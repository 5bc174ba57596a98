//! Animated target abstraction
//!
//! The host being animated exposes get/set access for each animatable scalar
//! attribute plus a re-layout request for direct dimension mutation. Margin
//! adjustment is an explicit optional capability: targets that cannot adjust
//! margins simply report it unsupported and resize animations skip that part.

use std::sync::Arc;

/// Animatable scalar attributes of a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewProperty {
    X,
    Y,
    Z,
    Rotation,
    RotationX,
    RotationY,
    TranslationX,
    TranslationY,
    TranslationZ,
    ScaleX,
    ScaleY,
    Alpha,
}

/// Axis of a dimension resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Margins around a target, in the host's layout units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Margins {
    pub start: f32,
    pub end: f32,
    pub top: f32,
    pub bottom: f32,
}

/// A property host that animations read from and write to.
///
/// Implementations are expected to be cheap handles onto host-framework
/// state; every call is made from the animation tick.
pub trait AnimatedTarget: Send + Sync {
    /// Current value of a scalar attribute.
    fn get(&self, property: ViewProperty) -> f32;

    /// Writes a scalar attribute.
    fn set(&self, property: ViewProperty, value: f32);

    /// Current size along an axis.
    fn dimension(&self, axis: Axis) -> f32;

    /// Writes the size along an axis. Callers follow up with
    /// [`request_layout`](AnimatedTarget::request_layout).
    fn set_dimension(&self, axis: Axis, value: f32);

    /// Asks the host to re-run layout after a direct dimension mutation.
    fn request_layout(&self);

    /// Whether this target can adjust margins. Resize animations that were
    /// asked to move margins treat `false` as "feature unavailable" and skip
    /// the margin portion.
    fn supports_margin_adjustment(&self) -> bool {
        false
    }

    fn margins(&self) -> Margins {
        Margins::default()
    }

    fn set_margins(&self, _margins: Margins) {}
}

/// Shared handle to an animated target.
pub type TargetHandle = Arc<dyn AnimatedTarget>;
