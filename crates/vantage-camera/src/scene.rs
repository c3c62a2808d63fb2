//! Read-only views of the scene the camera consults, and the render sink it
//! drives.

use std::fmt;

use glam::{DVec3, Quat, Vec3};
use uuid::Uuid;

/// Identifier of an object in the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the camera needs to know about a scene object.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub position_global: DVec3,
    pub rotation: Quat,
    /// Full extents of the bounding box along the object's local axes.
    pub scale: Vec3,
    pub is_avatar: bool,
    /// Mesh objects have no meaningful box, so the camera may get arbitrarily close.
    pub is_mesh: bool,
    /// Avatar this object is worn by, for attachments.
    pub attached_to: Option<ObjectId>,
}

impl SceneObject {
    pub fn new(id: ObjectId, position_global: DVec3) -> Self {
        Self {
            id,
            position_global,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            is_avatar: false,
            is_mesh: false,
            attached_to: None,
        }
    }
}

/// Scene lookups. Objects may disappear between frames; callers must treat a
/// `None` lookup as "the object no longer exists".
pub trait SceneView {
    fn object(&self, id: ObjectId) -> Option<SceneObject>;

    /// Terrain height at the horizontal position of `position`.
    fn land_height_global(&self, position: DVec3) -> f64;
}

/// Renderer-side camera the controller pushes its pose into every frame.
pub trait RenderCamera {
    /// Position and focus are region-local.
    fn update_location(&mut self, position_agent: Vec3, up: Vec3, focus_agent: Vec3);

    fn set_view(&mut self, fov_radians: f32);
}

/// Per-frame snapshot of the avatar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvatarPose {
    pub position_global: DVec3,
    pub velocity: Vec3,
    /// Root to eyes, in the avatar frame.
    pub eye_offset: Vec3,
    /// Rotation of the object the avatar sits on, if any.
    pub parent_rotation: Option<Quat>,
    pub sitting: bool,
    pub in_air: bool,
    /// Seconds since the avatar left the ground.
    pub time_in_air: f32,
    /// Gods ignore draw-distance camera limits.
    pub godlike: bool,
}

impl Default for AvatarPose {
    fn default() -> Self {
        Self {
            position_global: DVec3::ZERO,
            velocity: Vec3::ZERO,
            eye_offset: Vec3::new(0.1, 0.0, 0.7),
            parent_rotation: None,
            sitting: false,
            in_air: false,
            time_in_air: 0.0,
            godlike: false,
        }
    }
}
