use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::DVec3;
use vantage_math::{RegionContext, RegionHandle};

/// Server messages relevant to the agent, delivered between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// The server acknowledged a teleport request.
    TeleportStarted,
    /// The destination accepted the agent.
    TeleportFinished { region: RegionHandle },
    /// A same-region teleport completed. The position is absent when the
    /// server sends it later in a regular update.
    TeleportLocal { position_global: Option<DVec3> },
    TeleportFailed { reason: String },
    /// The agent's authoritative region changed, after the capability
    /// handshake for it finished.
    RegionAttached(RegionContext),
    /// The agent finished moving into its current region.
    MovementComplete { position_global: DVec3 },
    AgentPosition { position_global: DVec3 },
}

/// Channel the network layer uses to hand events to the agent.
pub fn network_channel() -> (Sender<NetworkEvent>, Receiver<NetworkEvent>) {
    unbounded()
}
