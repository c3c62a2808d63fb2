//! Agent camera: pose solving, mode transitions, smoothing and focus handling.
//!
//! [`CameraController`] owns the per-avatar camera state and runs once per
//! frame. The math it depends on lives in [`solver`] as pure functions over
//! explicit inputs, so it can be tested without a controller.

mod collide;
mod controller;
mod effects;
mod focus;
mod follow;
mod input;
mod limits;
mod mode;
mod navigation;
mod scene;
mod smoothing;
pub mod solver;
mod transition;
mod update;

pub use collide::{CAMERA_COLLIDE_EPSILON, CollidePlane, collide_distance};
pub use controller::{
    CameraContext, CameraController, CameraPose, DistanceConstraint, ExternalOverride, SitCamera,
    ZoomState,
};
pub use effects::{CameraEffect, CameraEvent, Toolset};
pub use focus::{FocusTarget, clamp_offset_to_extents, object_min_distance};
pub use follow::{FollowCamera, FollowParams, SmoothFollowCamera};
pub use input::InputSnapshot;
pub use limits::{
    APPEARANCE_MAX_ZOOM, APPEARANCE_MIN_ZOOM, AVATAR_MIN_ZOOM, DistanceBounds, DistanceQuery,
    FocusKind, INITIAL_ZOOM_FRACTION, LAND_MIN_ZOOM, MAX_ZOOM_FRACTION, MIN_CAMERA_DISTANCE,
    MIN_ZOOM_FRACTION, OBJECT_MIN_ZOOM, clamp_camera_distance,
};
pub use mode::CameraMode;
pub use navigation::clamp_pitch;
pub use scene::{AvatarPose, ObjectId, RenderCamera, SceneObject, SceneView};
pub use smoothing::{CameraSmoother, SmoothingSpace};
pub use transition::{AnimationSample, CameraAnimation};
