//! The camera focus point and its optional binding to a scene object.

use glam::{DVec3, Quat, Vec3};

use crate::scene::{ObjectId, SceneObject};

/// Slack allowed around an object's box before the focus counts as outside it.
const OBJECT_EXTENTS_PADDING: f32 = 0.5;
const NEAR_ZERO: f32 = 1e-3;
/// Avatar boxes are loose; shrink them per axis before computing distances.
const AVATAR_EXTENT_FACTORS: Vec3 = Vec3::new(0.55, 0.7, 1.15);

/// Where the camera looks when it is not locked to the avatar.
#[derive(Clone, Debug, PartialEq)]
pub struct FocusTarget {
    /// Focus follows the avatar's own position.
    pub on_avatar: bool,
    pub target_global: DVec3,
    pub(crate) object: Option<ObjectId>,
    /// World-axis offset from the bound object's position.
    pub(crate) object_offset: Vec3,
    pub(crate) last_object_position: Option<DVec3>,
}

impl Default for FocusTarget {
    fn default() -> Self {
        Self {
            on_avatar: true,
            target_global: DVec3::ZERO,
            object: None,
            object_offset: Vec3::ZERO,
            last_object_position: None,
        }
    }
}

impl FocusTarget {
    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    pub fn object_offset(&self) -> Vec3 {
        self.object_offset
    }

    /// Bind to `object`, keeping the focus point at `target_global` as long as
    /// it lies within the object's box.
    pub fn bind(&mut self, object: &SceneObject) {
        self.object = Some(object.id);
        self.last_object_position = Some(object.position_global);
        self.object_offset = clamp_offset_to_extents(
            (self.target_global - object.position_global).as_vec3(),
            object.rotation,
            object.scale,
        );
        self.target_global = object.position_global + self.object_offset.as_dvec3();
    }

    pub fn clear_object(&mut self) {
        self.object = None;
        self.object_offset = Vec3::ZERO;
        self.last_object_position = None;
    }

    /// Re-derive the focus point after the bound object may have moved.
    ///
    /// With `track` set the focus moves with the object. Otherwise the focus
    /// stays put until it would leave the object's box.
    pub fn follow_object(&mut self, object: &SceneObject, track: bool) -> DVec3 {
        let moved = self
            .last_object_position
            .is_none_or(|p| p != object.position_global);
        if moved {
            let offset = if track {
                self.object_offset
            } else {
                (self.target_global - object.position_global).as_vec3()
            };
            self.object_offset = clamp_offset_to_extents(offset, object.rotation, object.scale);
            self.last_object_position = Some(object.position_global);
        }
        self.target_global = object.position_global + self.object_offset.as_dvec3();
        self.target_global
    }
}

/// Clamp a world-axis `offset` from an object's center into its box.
pub fn clamp_offset_to_extents(offset: Vec3, rotation: Quat, scale: Vec3) -> Vec3 {
    let half = scale.abs() * 0.5;
    let local = rotation.inverse() * offset;
    rotation * local.clamp(-half, half)
}

/// Closest the camera may get to a focused object without clipping into it.
///
/// * `target_offset` - focus point relative to the object center
/// * `camera_offset_target` - camera relative to the focus point
/// * `camera_offset_object` - camera relative to the object center
///
/// Returns `None` when the focus point lies outside the object and the camera
/// is on the same side of it, where no sensible minimum exists.
pub fn object_min_distance(
    object: &SceneObject,
    target_offset: Vec3,
    camera_offset_target: Vec3,
    camera_offset_object: Vec3,
    near_clip: f32,
) -> Option<f32> {
    if object.is_mesh {
        return Some(0.0);
    }

    let inverse = object.rotation.inverse();
    let camera_local = inverse * camera_offset_target;
    let target_local = inverse * target_offset;

    let soft_limit = object.is_avatar;
    let mut extents = object.scale.abs();
    if soft_limit {
        extents *= AVATAR_EXTENT_FACTORS;
    }

    let abs_target = target_local.abs();
    let mut target_outside = false;
    for i in 0..3 {
        if abs_target[i] * 2.0 > extents[i] + OBJECT_EXTENTS_PADDING {
            target_outside = true;
        }
        if camera_local[i] > 0.0 {
            extents[i] -= target_local[i] * 2.0;
        } else {
            extents[i] += target_local[i] * 2.0;
        }
    }
    let extents = extents.max(Vec3::splat(NEAR_ZERO));

    let camera_dir = camera_local.abs().normalize_or_zero();
    let axis = dominant_axis(camera_dir / extents);
    let mut min_distance = if camera_dir[axis] < NEAR_ZERO {
        extents[axis] * 0.5
    } else {
        extents[axis] * 0.5 / camera_dir[axis]
    };

    let target_dir = abs_target.normalize_or_zero();
    let split = dominant_axis(target_dir / extents);
    let camera_clip = camera_offset_object[split];
    let target_clip = target_local[split];
    if target_outside
        && ((camera_clip > 0.0 && target_clip > 0.0) || (camera_clip < 0.0 && target_clip < 0.0))
    {
        return None;
    }

    min_distance = min_distance.min(10.0 * 3.0_f32.sqrt());
    Some(min_distance + near_clip + if soft_limit { 0.1 } else { 0.2 })
}

fn dominant_axis(v: Vec3) -> usize {
    if v.x > v.y && v.x > v.z {
        0
    } else if v.y > v.z {
        1
    } else {
        2
    }
}
