use std::fmt;

/// Lifecycle of a teleport.
///
/// `None → Start → {Requested | Queued} → Moving → StartArrival → Arriving
/// → None`, with `Local` as a shortcut for same-region hops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TeleportState {
    /// No teleport in progress.
    #[default]
    None,
    /// The request has been accepted and sent.
    Start,
    /// The server acknowledged the request.
    Requested,
    /// Held back until the region event poll settles.
    Queued,
    /// The destination accepted the agent; the handoff is underway.
    Moving,
    /// Attached to the destination region, arrival side effects pending.
    StartArrival,
    /// Arrival side effects applied, waiting for movement to complete.
    Arriving,
    /// Same-region relocation.
    Local,
}

impl TeleportState {
    pub fn is_active(self) -> bool {
        self != Self::None
    }

    /// Whether the destination has not yet committed to the teleport.
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Start | Self::Requested | Self::Queued)
    }
}

impl fmt::Display for TeleportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Start => "start",
            Self::Requested => "requested",
            Self::Queued => "queued",
            Self::Moving => "moving",
            Self::StartArrival => "start-arrival",
            Self::Arriving => "arriving",
            Self::Local => "local",
        };
        f.write_str(name)
    }
}
