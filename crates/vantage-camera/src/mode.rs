//! Camera modes.

use std::fmt;

/// How the camera is currently placed relative to the avatar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CameraMode {
    /// Orbiting behind the avatar (or around a focus point).
    #[default]
    ThirdPerson,
    /// First person, at the avatar's eyes.
    Mouselook,
    /// Driven by a scripted follow camera.
    Follow,
    /// Facing the avatar for appearance editing.
    CustomizeAvatar,
}

impl CameraMode {
    pub fn is_mouselook(self) -> bool {
        self == Self::Mouselook
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ThirdPerson => "third-person",
            Self::Mouselook => "mouselook",
            Self::Follow => "follow",
            Self::CustomizeAvatar => "customize-avatar",
        };
        f.write_str(name)
    }
}
