use glam::DVec3;

use crate::state::TeleportState;

/// Why objects need their visibility re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Walked or flew across a region border.
    BorderCrossing,
    /// Arrived by teleport, across regions or far within one.
    Teleport,
}

/// Side effects requested by the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub enum TeleportEffect {
    StandUp,
    CloseLandFloater,
    DeselectLand,
    /// Close menus; `change_camera` also returns the camera to its default.
    ResetView { change_camera: bool },
    /// Keep the current camera direction through the teleport.
    DetachCameraFocus,
    ShowProgress,
    HideProgress,
    ClearStaleFetches,
    DelayMeshFetches,
    ResetLowMemory,
    ParcelArrival { position_global: DVec3 },
    ClearKeyboardFocus,
    ScheduleVisibilityRefresh(RefreshKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TeleportEvent {
    StateChanged {
        from: TeleportState,
        to: TeleportState,
        /// Set when a teleport ends in failure or cancellation.
        reason: Option<String>,
    },
    Effect(TeleportEffect),
}
