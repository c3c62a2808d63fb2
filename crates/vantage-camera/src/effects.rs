//! Side effects requested by camera mode changes.
//!
//! The controller never touches UI or animation state directly. It queues
//! these for the host to apply, in the order they were requested.

use crate::mode::CameraMode;

/// Active tool palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toolset {
    Basic,
    Mouselook,
    FaceEdit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraEffect {
    StartIdleMotions,
    StopIdleMotions,
    ShowPointer,
    HidePointer,
    CenterPointer,
    SetToolset(Toolset),
    CloseBuildTools,
    CloseMenus,
    ShowMenus,
    HideMenus,
    /// Hide floating views while in first person.
    PushFloaters,
    PopFloaters,
    ClearKeyboardFocus,
    Deselect,
    /// Swap hold and aim animations for first-person weapons.
    SwapWeaponAnimations { aimed: bool },
    ClearLookAt,
    ShowMiniMap,
    HideMiniMap,
    StartCustomizeAnimation,
    StopCustomizeAnimation,
    StandUp,
    PauseAvatar,
    ResumeAvatar,
    /// Attachments are hidden in first person.
    UpdateAttachmentVisibility(CameraMode),
}

/// Notification drained from the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraEvent {
    ModeChanged { from: CameraMode, to: CameraMode },
    Effect(CameraEffect),
}
