//! Pure camera pose math.
//!
//! Everything here is a function of [`PoseInputs`]. The controller gathers
//! those inputs each frame and owns the state carried between frames
//! ([`CameraDamping`], the FOV zoom factor).

use glam::{DVec3, Quat, Vec3};
use vantage_config::CameraConfig;
use vantage_math::{RegionContext, SpatialFrame, interpolant};

use crate::collide::{CollidePlane, collide_distance};
use crate::focus::{FocusTarget, object_min_distance};
use crate::limits::{APPEARANCE_MAX_ZOOM, MIN_CAMERA_DISTANCE};
use crate::mode::CameraMode;
use crate::scene::{AvatarPose, SceneObject, SceneView};

pub const CAMERA_ZOOM_HALF_LIFE: f32 = 0.07;
pub const FOV_ZOOM_HALF_LIFE: f32 = 0.07;
pub const CAMERA_LAG_HALF_LIFE: f32 = 0.25;
const LAG_DECAY_HALF_LIFE: f32 = 0.15;

const MIN_CAMERA_LAG: f32 = 0.5;
const MAX_CAMERA_LAG: f32 = 5.0;
const GROUND_TO_AIR_START_SECS: f32 = 0.5;
const GROUND_TO_AIR_TIME_SECS: f32 = 0.5;

const MAX_FOV_ZOOM_FACTOR: f32 = 1000.0;

/// Camera and focus offsets for third person, in the avatar frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraOffsets {
    pub camera: Vec3,
    pub focus: Vec3,
    pub scale: f32,
    /// Pivot above the avatar root the camera orbits around.
    pub head: Vec3,
}

impl CameraOffsets {
    pub fn from_config(config: &CameraConfig) -> Self {
        let (camera, focus) = if config.front_view {
            (config.offset_front_view, config.focus_offset_front_view)
        } else {
            (config.offset_default, config.focus_offset_default)
        };
        Self {
            camera,
            focus,
            scale: config.offset_scale,
            head: config.head_offset,
        }
    }
}

/// Camera placement defined by the object the avatar sits on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SitCameraView {
    pub seat_position_global: DVec3,
    pub seat_rotation: Quat,
    pub camera: Vec3,
    pub focus: Vec3,
}

/// Current output of an active follow camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FollowView {
    pub position_global: DVec3,
    pub focus_global: DVec3,
}

/// Distance and lag state carried between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraDamping {
    pub current_distance: f32,
    pub target_distance: f32,
    pub lag: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraTarget {
    pub position: DVec3,
    /// A distance or ground constraint moved the camera.
    pub hit_limit: bool,
    pub damping: CameraDamping,
}

/// Everything the pose solver reads.
pub struct PoseInputs<'a> {
    pub mode: CameraMode,
    pub frame: &'a SpatialFrame,
    pub avatar: &'a AvatarPose,
    pub region: Option<&'a RegionContext>,
    pub scene: &'a dyn SceneView,
    pub focus: &'a FocusTarget,
    /// Resolved focus object. `None` also when the bound object was deleted.
    pub focus_object: Option<&'a SceneObject>,
    pub sit_camera: Option<SitCameraView>,
    pub follow: Option<FollowView>,
    pub offsets: CameraOffsets,
    pub zoom_fraction: f32,
    pub camera_focus_offset: DVec3,
    pub collide_plane: Option<CollidePlane>,
    pub ignore_collisions: bool,
    pub constraints_disabled: bool,
    pub animating: bool,
    pub draw_distance: f32,
    pub dynamic_strength: f32,
    pub near_clip: f32,
    pub dt: f32,
}

impl PoseInputs<'_> {
    fn region_origin(&self) -> DVec3 {
        self.region.map_or(DVec3::ZERO, RegionContext::origin_global)
    }

    fn follow_active(&self) -> bool {
        self.mode == CameraMode::Follow && self.focus.on_avatar && self.follow.is_some()
    }
}

/// Avatar orientation, including the seat it sits on.
pub fn body_rotation(frame: &SpatialFrame, avatar: &AvatarPose) -> Quat {
    let own = frame.quaternion();
    match avatar.parent_rotation {
        Some(parent) if avatar.sitting => (parent * own).normalize(),
        _ => own,
    }
}

/// Eye position used in first person.
pub fn mouselook_position(frame: &SpatialFrame, avatar: &AvatarPose) -> DVec3 {
    let mut eyes = avatar.eye_offset;
    if avatar.sitting {
        eyes.z += 0.1;
    }
    avatar.position_global + (body_rotation(frame, avatar) * eyes).as_dvec3()
}

/// Lowest the camera may go above the terrain.
pub fn min_off_ground(mode: CameraMode, constraints_disabled: bool) -> f64 {
    if constraints_disabled {
        -1000.0
    } else if mode == CameraMode::Mouselook {
        0.0
    } else {
        0.5
    }
}

/// Point the camera should look at this frame.
pub fn compute_focus_target(inputs: &PoseInputs<'_>) -> DVec3 {
    if inputs.follow_active()
        && let Some(follow) = inputs.follow
    {
        return follow.focus_global;
    }
    if inputs.mode == CameraMode::Mouselook {
        let at = body_rotation(inputs.frame, inputs.avatar) * Vec3::X;
        return mouselook_position(inputs.frame, inputs.avatar) + at.as_dvec3();
    }
    if !inputs.focus.on_avatar {
        return match inputs.focus_object {
            Some(object) => object.position_global + inputs.focus.object_offset().as_dvec3(),
            None => inputs.focus.target_global,
        };
    }
    if inputs.mode == CameraMode::CustomizeAvatar {
        return inputs.focus.target_global;
    }
    if let Some(sit) = inputs.sit_camera {
        return sit.seat_position_global + (sit.seat_rotation * sit.focus).as_dvec3();
    }
    let rotation = body_rotation(inputs.frame, inputs.avatar);
    inputs.avatar.position_global + (rotation * inputs.offsets.focus).as_dvec3()
}

/// Where the camera wants to be this frame, before animation and smoothing.
pub fn compute_camera_target(inputs: &PoseInputs<'_>, damping: CameraDamping) -> CameraTarget {
    let (mut position, damping) = if inputs.follow_active()
        && let Some(follow) = inputs.follow
    {
        (follow.position_global, damping)
    } else if inputs.mode == CameraMode::Mouselook {
        (mouselook_position(inputs.frame, inputs.avatar), damping)
    } else if inputs.focus.on_avatar && inputs.mode != CameraMode::CustomizeAvatar {
        third_person_position(inputs, damping)
    } else {
        (compute_focus_target(inputs) + inputs.camera_focus_offset, damping)
    };

    let mut hit_limit = false;
    let avatar = inputs.avatar.position_global;
    let estate_manager = inputs.region.is_some_and(|r| r.can_manage_estate);
    if !inputs.constraints_disabled && !inputs.avatar.godlike && !estate_manager {
        let max_distance = if inputs.mode == CameraMode::CustomizeAvatar {
            f64::from(APPEARANCE_MAX_ZOOM)
        } else {
            f64::from(inputs.draw_distance)
        };
        let offset = position - avatar;
        let len = offset.length();
        if len > max_distance {
            position = avatar + offset * (max_distance / len);
            hit_limit = true;
        }
    }

    let floor = inputs.scene.land_height_global(position)
        + min_off_ground(inputs.mode, inputs.constraints_disabled);
    if position.z < floor {
        position.z = floor;
        hit_limit = true;
    }

    CameraTarget {
        position,
        hit_limit,
        damping,
    }
}

fn third_person_position(inputs: &PoseInputs<'_>, mut damping: CameraDamping) -> (DVec3, CameraDamping) {
    if let Some(sit) = inputs.sit_camera {
        let position = sit.seat_position_global + (sit.seat_rotation * sit.camera).as_dvec3();
        return (position, damping);
    }

    let local_offset = inputs.offsets.camera * inputs.zoom_fraction * inputs.offsets.scale;
    let offset = match inputs.avatar.parent_rotation {
        Some(parent) if inputs.avatar.sitting => parent * inputs.frame.rotate_to_absolute(local_offset),
        _ => inputs.frame.rotate_to_absolute(local_offset),
    };
    let pivot = inputs.avatar.position_global + inputs.offsets.head.as_dvec3();

    let mut distance = offset.length();
    if !inputs.ignore_collisions
        && !inputs.avatar.sitting
        && let Some(plane) = inputs.collide_plane
    {
        let pivot_local = (pivot - inputs.region_origin()).as_vec3();
        distance = collide_distance(&plane, pivot_local, offset);
    }

    damping.target_distance = distance.max(MIN_CAMERA_DISTANCE);
    if damping.current_distance != damping.target_distance {
        let t = interpolant(CAMERA_ZOOM_HALF_LIFE, inputs.dt);
        damping.current_distance += (damping.target_distance - damping.current_distance) * t;
    }

    let dir = offset.normalize_or(Vec3::NEG_X);
    let mut position = pivot + (dir * damping.current_distance).as_dvec3();

    damping.lag = update_lag(inputs, damping.lag);
    position -= damping.lag.as_dvec3();
    (position, damping)
}

/// Pull the camera back while flying so the avatar stays ahead of it.
fn update_lag(inputs: &PoseInputs<'_>, lag: Vec3) -> Vec3 {
    let avatar = inputs.avatar;
    if !avatar.in_air || inputs.animating {
        return lag.lerp(Vec3::ZERO, interpolant(LAG_DECAY_HALF_LIFE, inputs.dt));
    }

    let at = inputs.frame.at_axis();
    let frame_at = Vec3::new(at.x, at.y, 0.0).normalize_or(Vec3::X);
    let u = ((avatar.time_in_air - GROUND_TO_AIR_START_SECS) / GROUND_TO_AIR_TIME_SECS).clamp(0.0, 1.0);
    let lag_interp = interpolant(CAMERA_LAG_HALF_LIFE, inputs.dt) * u;

    let target_lag = avatar.velocity * inputs.dynamic_strength / 30.0;
    let mut lag = lag.lerp(target_lag, lag_interp).clamp_length_max(MAX_CAMERA_LAG);

    let floor = MIN_CAMERA_LAG * u;
    let forward = lag.dot(frame_at);
    if forward < floor {
        lag += frame_at * (floor - forward);
    }
    lag
}

/// How far the camera is pushed back from an object focus so the object fits
/// in view. Always zero in first person and never negative.
pub fn compute_fov_zoom_factor(inputs: &PoseInputs<'_>, camera_global: DVec3, previous: f32) -> f32 {
    if inputs.mode == CameraMode::Mouselook {
        return 0.0;
    }
    let Some(object) = inputs.focus_object.filter(|o| !o.is_avatar && !inputs.focus.on_avatar) else {
        return previous.max(0.0);
    };

    let min_distance = if inputs.constraints_disabled {
        0.0
    } else {
        object_min_distance_for(inputs, object, camera_global).unwrap_or(0.0)
    };

    let current = (inputs.camera_focus_offset.length() as f32).max(0.001);
    ((min_distance - current) / current).clamp(0.0, MAX_FOV_ZOOM_FACTOR)
}

/// [`object_min_distance`] for the current focus point and a camera at
/// `camera_global`.
pub fn object_min_distance_for(
    inputs: &PoseInputs<'_>,
    object: &SceneObject,
    camera_global: DVec3,
) -> Option<f32> {
    let target = inputs.focus.target_global;
    object_min_distance(
        object,
        (target - object.position_global).as_vec3(),
        (camera_global - target).as_vec3(),
        (camera_global - object.position_global).as_vec3(),
        inputs.near_clip,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scene::ObjectId;
    use proptest::prelude::*;
    use vantage_math::RegionHandle;

    pub(crate) struct FlatScene {
        pub land: f64,
        pub objects: Vec<SceneObject>,
    }

    impl SceneView for FlatScene {
        fn object(&self, id: ObjectId) -> Option<SceneObject> {
            self.objects.iter().find(|o| o.id == id).cloned()
        }

        fn land_height_global(&self, _position: DVec3) -> f64 {
            self.land
        }
    }

    fn region() -> RegionContext {
        RegionContext::new(RegionHandle::from_origin(256_000, 256_000), "Test")
    }

    fn avatar() -> AvatarPose {
        AvatarPose {
            position_global: DVec3::new(256_128.0, 256_128.0, 20.0),
            ..Default::default()
        }
    }

    fn inputs<'a>(
        mode: CameraMode,
        frame: &'a SpatialFrame,
        avatar: &'a AvatarPose,
        region: &'a RegionContext,
        scene: &'a FlatScene,
        focus: &'a FocusTarget,
    ) -> PoseInputs<'a> {
        PoseInputs {
            mode,
            frame,
            avatar,
            region: Some(region),
            scene,
            focus,
            focus_object: None,
            sit_camera: None,
            follow: None,
            offsets: CameraOffsets::from_config(&CameraConfig::default()),
            zoom_fraction: 1.0,
            camera_focus_offset: DVec3::ZERO,
            collide_plane: None,
            ignore_collisions: false,
            constraints_disabled: false,
            animating: false,
            draw_distance: 128.0,
            dynamic_strength: 2.0,
            near_clip: 0.1,
            // Long enough that damping converges in one step.
            dt: 10.0,
        }
    }

    fn flat() -> FlatScene {
        FlatScene { land: 0.0, objects: Vec::new() }
    }

    #[test]
    fn test_third_person_behind_and_above() {
        let (frame, avatar, region, scene, focus) =
            (SpatialFrame::new(), avatar(), region(), flat(), FocusTarget::default());
        let inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        let target = compute_camera_target(&inp, CameraDamping::default());
        let expected = avatar.position_global + DVec3::new(-3.0, 0.0, 1.75);
        assert!((target.position - expected).length() < 1e-3);
        assert!(!target.hit_limit);
        let focus_point = compute_focus_target(&inp);
        assert!((focus_point - (avatar.position_global + DVec3::new(1.0, 0.0, 1.0))).length() < 1e-6);
    }

    #[test]
    fn test_zoom_fraction_scales_distance() {
        let (frame, avatar, region, scene, focus) =
            (SpatialFrame::new(), avatar(), region(), flat(), FocusTarget::default());
        let mut inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        inp.zoom_fraction = 2.0;
        let target = compute_camera_target(&inp, CameraDamping::default());
        let expected_distance = Vec3::new(-3.0, 0.0, 0.75).length() * 2.0;
        assert!((target.damping.target_distance - expected_distance).abs() < 1e-4);
    }

    #[test]
    fn test_mouselook_at_eyes_looking_forward() {
        let (frame, avatar, region, scene, focus) =
            (SpatialFrame::new(), avatar(), region(), flat(), FocusTarget::default());
        let inp = inputs(CameraMode::Mouselook, &frame, &avatar, &region, &scene, &focus);
        let camera = compute_camera_target(&inp, CameraDamping::default()).position;
        let focus_point = compute_focus_target(&inp);
        assert!((camera - (avatar.position_global + avatar.eye_offset.as_dvec3())).length() < 1e-6);
        assert!(((focus_point - camera) - DVec3::X).length() < 1e-6);
    }

    #[test]
    fn test_unbound_focus_uses_last_target() {
        let (frame, avatar, region, scene) = (SpatialFrame::new(), avatar(), region(), flat());
        let focus = FocusTarget {
            on_avatar: false,
            target_global: DVec3::new(256_140.0, 256_130.0, 22.0),
            ..Default::default()
        };
        let mut inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        inp.camera_focus_offset = DVec3::new(-4.0, 0.0, 1.0);
        assert_eq!(compute_focus_target(&inp), focus.target_global);
        let camera = compute_camera_target(&inp, CameraDamping::default()).position;
        assert!((camera - (focus.target_global + inp.camera_focus_offset)).length() < 1e-9);
    }

    #[test]
    fn test_collide_plane_shortens_camera() {
        let (frame, avatar, region, scene, focus) =
            (SpatialFrame::new(), avatar(), region(), flat(), FocusTarget::default());
        let mut inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        // Wall one meter behind the avatar.
        inp.collide_plane = CollidePlane::new(Vec3::X, 127.0);
        let target = compute_camera_target(&inp, CameraDamping::default());
        let local = region.global_to_local(target.position);
        assert!(local.x >= 127.0 + crate::collide::CAMERA_COLLIDE_EPSILON - 1e-3);
    }

    #[test]
    fn test_draw_distance_limits_camera() {
        let (frame, avatar, region, scene) = (SpatialFrame::new(), avatar(), region(), flat());
        let focus = FocusTarget {
            on_avatar: false,
            target_global: avatar.position_global,
            ..Default::default()
        };
        let mut inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        inp.camera_focus_offset = DVec3::new(-40.0, 0.0, 0.0);
        inp.draw_distance = 10.0;
        let target = compute_camera_target(&inp, CameraDamping::default());
        assert!(target.hit_limit);
        assert!(((target.position - avatar.position_global).length() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_ground_clamp() {
        let (frame, avatar, region, focus) = (SpatialFrame::new(), avatar(), region(), FocusTarget::default());
        let scene = FlatScene { land: 30.0, objects: Vec::new() };
        let inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        let target = compute_camera_target(&inp, CameraDamping::default());
        assert!(target.hit_limit);
        assert!((target.position.z - 30.5).abs() < 1e-9);
    }

    #[test]
    fn test_flying_lag_keeps_avatar_ahead() {
        let (frame, region, scene, focus) = (SpatialFrame::new(), region(), flat(), FocusTarget::default());
        let avatar = AvatarPose {
            in_air: true,
            time_in_air: 3.0,
            velocity: Vec3::new(-20.0, 0.0, 0.0),
            ..avatar()
        };
        let inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        let target = compute_camera_target(&inp, CameraDamping::default());
        // Flying backwards would pull the camera ahead; the floor keeps it behind.
        assert!(target.damping.lag.dot(Vec3::X) >= MIN_CAMERA_LAG - 1e-4);
        assert!(target.damping.lag.length() <= MAX_CAMERA_LAG + 1e-3);
    }

    #[test]
    fn test_lag_decays_on_ground() {
        let (frame, avatar, region, scene, focus) =
            (SpatialFrame::new(), avatar(), region(), flat(), FocusTarget::default());
        let inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        let damping = CameraDamping {
            lag: Vec3::new(2.0, 0.0, 0.0),
            ..Default::default()
        };
        assert!(compute_camera_target(&inp, damping).damping.lag.length() < 1e-6);
    }

    #[test]
    fn test_fov_zoom_pushes_back_from_large_object() {
        let (frame, avatar, region, scene) = (SpatialFrame::new(), avatar(), region(), flat());
        let object = SceneObject {
            scale: Vec3::splat(10.0),
            ..SceneObject::new(ObjectId::new_v4(), DVec3::new(256_140.0, 256_128.0, 25.0))
        };
        let mut focus = FocusTarget {
            on_avatar: false,
            target_global: object.position_global,
            ..Default::default()
        };
        focus.bind(&object);
        let mut inp = inputs(CameraMode::ThirdPerson, &frame, &avatar, &region, &scene, &focus);
        inp.focus_object = Some(&object);
        inp.camera_focus_offset = DVec3::new(-2.0, 0.0, 0.0);
        let camera = object.position_global + inp.camera_focus_offset;
        let factor = compute_fov_zoom_factor(&inp, camera, 0.0);
        assert!(factor > 0.0);

        inp.mode = CameraMode::Mouselook;
        assert_eq!(compute_fov_zoom_factor(&inp, camera, factor), 0.0);
    }

    proptest! {
        #[test]
        fn fov_zoom_factor_never_negative(
            offset in -50.0f64..50.0,
            previous in -10.0f32..10.0,
            scale in 0.01f32..20.0,
            mouselook in any::<bool>(),
        ) {
            let (frame, avatar, region, scene) = (SpatialFrame::new(), avatar(), region(), flat());
            let object = SceneObject {
                scale: Vec3::splat(scale),
                ..SceneObject::new(ObjectId::new_v4(), DVec3::new(256_140.0, 256_128.0, 25.0))
            };
            let focus = FocusTarget {
                on_avatar: false,
                target_global: object.position_global,
                ..Default::default()
            };
            let mode = if mouselook { CameraMode::Mouselook } else { CameraMode::ThirdPerson };
            let mut inp = inputs(mode, &frame, &avatar, &region, &scene, &focus);
            inp.focus_object = Some(&object);
            inp.camera_focus_offset = DVec3::new(offset, 1.0, 0.5);
            let camera = object.position_global + inp.camera_focus_offset;
            let factor = compute_fov_zoom_factor(&inp, camera, previous);
            if mouselook {
                prop_assert_eq!(factor, 0.0);
            } else {
                prop_assert!(factor >= 0.0);
            }
        }
    }
}
