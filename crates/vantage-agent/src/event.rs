use vantage_camera::{CameraEffect, CameraMode};
use vantage_math::RegionHandle;
use vantage_teleport::{TeleportEffect, TeleportState};

use crate::input::MovementDeltas;

/// Notifications for UI and network collaborators, drained once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    CameraModeChanged {
        from: CameraMode,
        to: CameraMode,
    },
    Camera(CameraEffect),
    TeleportStateChanged {
        from: TeleportState,
        to: TeleportState,
        reason: Option<String>,
    },
    Teleport(TeleportEffect),
    RegionChanged {
        from: Option<RegionHandle>,
        to: RegionHandle,
    },
    /// Movement controls applied this frame, for the agent update message.
    Movement(MovementDeltas),
}
