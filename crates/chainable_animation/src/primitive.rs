//! Animation primitives
//!
//! A [`Primitive`] is one schedulable animated change bound to one target:
//! either a waypoint track over a scalar property, or a dimension resize that
//! may also move margins on capable targets. Primitives carry no timing of
//! their own; duration, delay and easing are resolved by the group they are
//! folded into.

use chainable_core::{Axis, TargetHandle, ViewProperty};

/// Margin endpoints captured when a resize primitive is built.
#[derive(Clone, Copy, Debug)]
struct MarginTrack {
    /// (from, to) for the leading margin (top for vertical, start for
    /// horizontal), when requested.
    leading: Option<(f32, f32)>,
    /// (from, to) for the trailing margin (bottom / end).
    trailing: Option<(f32, f32)>,
}

enum Track {
    Property {
        property: ViewProperty,
        /// Waypoints as given. A single waypoint animates from the value read
        /// off the target when the primitive first plays.
        values: Vec<f32>,
        /// Waypoints with the implicit start resolved, filled on first apply.
        resolved: Option<Vec<f32>>,
    },
    Resize {
        axis: Axis,
        from: f32,
        to: f32,
        margins: Option<MarginTrack>,
    },
}

/// One animated change bound to one target.
pub struct Primitive {
    target: TargetHandle,
    track: Track,
}

impl Primitive {
    /// A waypoint track over a scalar property. With a single waypoint the
    /// start value is read from the target when the primitive first plays;
    /// with several, the track is piecewise linear across equal segments.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn property(target: TargetHandle, property: ViewProperty, values: Vec<f32>) -> Self {
        assert!(!values.is_empty(), "at least one waypoint value is required");
        Self {
            target,
            track: Track::Property {
                property,
                values,
                resolved: None,
            },
        }
    }

    /// A resize of one dimension toward `to`, captured against the target's
    /// current size. Margin endpoints are only captured when the target
    /// reports the margin-adjustment capability; otherwise the margin part is
    /// silently unavailable.
    pub fn resize(
        target: TargetHandle,
        axis: Axis,
        to: f32,
        leading_margin: Option<f32>,
        trailing_margin: Option<f32>,
    ) -> Self {
        let from = target.dimension(axis);
        let wants_margins = leading_margin.is_some() || trailing_margin.is_some();
        let margins = if wants_margins && target.supports_margin_adjustment() {
            let current = target.margins();
            let (lead_from, trail_from) = match axis {
                Axis::Vertical => (current.top, current.bottom),
                Axis::Horizontal => (current.start, current.end),
            };
            Some(MarginTrack {
                leading: leading_margin.map(|to| (lead_from, to)),
                trailing: trailing_margin.map(|to| (trail_from, to)),
            })
        } else {
            None
        };
        Self {
            target,
            track: Track::Resize {
                axis,
                from,
                to,
                margins,
            },
        }
    }

    /// Writes the track's value at eased progress `eased_t` to the target.
    pub(crate) fn apply(&mut self, eased_t: f32) {
        let target = self.target.clone();
        match &mut self.track {
            Track::Property {
                property,
                values,
                resolved,
            } => {
                let resolved = resolved.get_or_insert_with(|| {
                    if values.len() == 1 {
                        vec![target.get(*property), values[0]]
                    } else {
                        values.clone()
                    }
                });
                // Eased progress outside 0..=1 (overshoot) extrapolates the
                // outermost segment instead of pinning to the end waypoints.
                let n = resolved.len();
                let seg = eased_t * (n as f32 - 1.0);
                let i = (seg.floor().max(0.0) as usize).min(n - 2);
                let local = seg - i as f32;
                let value = resolved[i] + (resolved[i + 1] - resolved[i]) * local;
                target.set(*property, value);
            }
            Track::Resize {
                axis,
                from,
                to,
                margins,
            } => {
                target.set_dimension(*axis, *from + (*to - *from) * eased_t);
                if let Some(track) = margins {
                    let mut current = target.margins();
                    let lerp = |(from, to): (f32, f32)| from + (to - from) * eased_t;
                    match axis {
                        Axis::Vertical => {
                            if let Some(span) = track.leading {
                                current.top = lerp(span);
                            }
                            if let Some(span) = track.trailing {
                                current.bottom = lerp(span);
                            }
                        }
                        Axis::Horizontal => {
                            if let Some(span) = track.leading {
                                current.start = lerp(span);
                            }
                            if let Some(span) = track.trailing {
                                current.end = lerp(span);
                            }
                        }
                    }
                    target.set_margins(current);
                }
                target.request_layout();
            }
        }
    }
}
