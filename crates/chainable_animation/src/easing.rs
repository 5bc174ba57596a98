//! Easing functions
//!
//! Maps linear progress (0.0 to 1.0) onto eased progress. `Overshoot` may
//! return values above 1.0 near the end of the curve.

/// An easing curve applied to a step's progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Accelerates past the target and settles back, like a spring with one
    /// overshoot. Fixed tension of 2.0.
    Overshoot,
}

impl Easing {
    /// Apply the easing curve to linear progress `t` (clamped to 0..=1).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - 2.0 * (1.0 - t) * (1.0 - t)
                }
            }
            Easing::Overshoot => {
                const TENSION: f32 = 2.0;
                let t = t - 1.0;
                t * t * ((TENSION + 1.0) * t + TENSION) + 1.0
            }
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Linear
    }
}
