//! Camera collision against a single plane (e.g. the seat the avatar is on).

use glam::Vec3;

/// Distance the camera is kept off the collide plane.
pub const CAMERA_COLLIDE_EPSILON: f32 = 0.1;

/// Plane of points `p` with `p.dot(normal) == distance`, region-local.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollidePlane {
    normal: Vec3,
    distance: f32,
}

impl CollidePlane {
    /// `None` for a degenerate normal.
    pub fn new(normal: Vec3, distance: f32) -> Option<Self> {
        let normal = normal.try_normalize()?;
        Some(Self { normal, distance })
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }
}

/// Shorten a camera `offset` from `pivot` so the camera stays on the pivot's
/// side of `plane`, at least [`CAMERA_COLLIDE_EPSILON`] away from it.
///
/// Returns the new camera distance along `offset`. A camera exactly on the
/// plane counts as crossing it. The result may be negative when the pivot
/// itself is closer than epsilon to the plane; callers clamp it.
pub fn collide_distance(plane: &CollidePlane, pivot: Vec3, offset: Vec3) -> f32 {
    let distance = offset.length();
    let offset_dot_norm = offset.dot(plane.normal);
    let pos_dot_norm = pivot.dot(plane.normal);
    let w = plane.distance;

    if pos_dot_norm > w {
        if offset_dot_norm + pos_dot_norm <= w {
            let denom = (-offset_dot_norm).max(1e-3);
            return distance * (pos_dot_norm - w - CAMERA_COLLIDE_EPSILON) / denom;
        }
    } else if offset_dot_norm + pos_dot_norm >= w {
        let denom = offset_dot_norm.max(1e-3);
        return distance * (w - pos_dot_norm - CAMERA_COLLIDE_EPSILON) / denom;
    }
    distance
}
