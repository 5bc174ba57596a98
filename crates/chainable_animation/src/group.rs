//! Groups: finalized chain steps
//!
//! A [`Group`] is the result of finalizing a chain step: members that play
//! together, decoration overrides, and once-only lifecycle callbacks. Groups
//! nest when parallel branches are sealed. Identity is a session-issued id,
//! used to guard the shared ordered list against re-insertion.

use crate::easing::Easing;
use crate::primitive::Primitive;

/// Once-only lifecycle callback.
pub(crate) type Callback = Box<dyn FnOnce() + Send>;

/// Lifecycle callbacks registered on a group or on the whole chain. Each
/// fires at most once; end callbacks are pre-wrapped with the chain's
/// cancelled-flag check so they suppress themselves at invocation time.
#[derive(Default)]
pub(crate) struct Callbacks {
    pub on_start: Vec<Callback>,
    pub on_end: Vec<Callback>,
    pub on_cancel: Vec<Callback>,
    /// (callback, delay in ms) routed through the session's delay queue when
    /// the group ends.
    pub on_end_delayed: Vec<(Callback, f32)>,
}

/// Session-scoped group identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GroupId(pub u64);

pub(crate) enum GroupMember {
    Primitive(Primitive),
    Group(Group),
}

pub(crate) struct Group {
    pub id: GroupId,
    pub members: Vec<GroupMember>,
    pub duration_ms: Option<f32>,
    pub start_delay_ms: Option<f32>,
    pub easing: Option<Easing>,
    pub callbacks: Callbacks,
}

impl Group {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            members: Vec::new(),
            duration_ms: None,
            start_delay_ms: None,
            easing: None,
            callbacks: Callbacks::default(),
        }
    }
}

/// Whole-chain decorations and callbacks. When overall duration or easing is
/// set it propagates to every primitive at materialization, overriding
/// per-group values.
#[derive(Default)]
pub(crate) struct Overall {
    pub duration_ms: Option<f32>,
    pub start_delay_ms: Option<f32>,
    pub easing: Option<Easing>,
    pub callbacks: Callbacks,
}
