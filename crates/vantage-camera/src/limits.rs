//! Camera distance limits.

use glam::DVec3;

use crate::mode::CameraMode;

pub const MIN_ZOOM_FRACTION: f32 = 0.25;
pub const INITIAL_ZOOM_FRACTION: f32 = 1.0;
pub const MAX_ZOOM_FRACTION: f32 = 8.0;

pub const LAND_MIN_ZOOM: f32 = 0.15;
pub const AVATAR_MIN_ZOOM: f32 = 0.5;
pub const OBJECT_MIN_ZOOM: f32 = 0.02;

pub const APPEARANCE_MIN_ZOOM: f32 = 0.39;
pub const APPEARANCE_MAX_ZOOM: f32 = 8.0;

/// Shortest camera-to-pivot distance after collision.
pub const MIN_CAMERA_DISTANCE: f32 = 0.1;

pub(crate) const MAX_CAMERA_DISTANCE_FROM_AGENT: f32 = 50.0;
pub(crate) const UNCONSTRAINED_MAX_DISTANCE: f32 = 4096.0;
/// Kept between the camera and the edge of the draw distance or region.
pub(crate) const DIST_FUDGE: f32 = 16.0;

/// What the camera is looking at, for choosing the minimum distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusKind {
    Land,
    Avatar,
    Object,
}

/// Inputs to [`clamp_camera_distance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceQuery {
    pub mode: CameraMode,
    pub focus: FocusKind,
    /// Sitting on an object that defines its own camera placement.
    pub sit_camera: bool,
    pub constraints_disabled: bool,
    pub draw_distance: f32,
    pub region_width: f32,
}

/// Allowed camera-to-focus distance range. `min <= max` always holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceBounds {
    pub min: f32,
    pub max: f32,
}

/// Distance range for the given camera situation.
pub fn clamp_camera_distance(query: &DistanceQuery) -> DistanceBounds {
    if query.constraints_disabled || query.sit_camera {
        return DistanceBounds {
            min: 0.0,
            max: UNCONSTRAINED_MAX_DISTANCE,
        };
    }
    if query.mode == CameraMode::CustomizeAvatar {
        return DistanceBounds {
            min: APPEARANCE_MIN_ZOOM,
            max: APPEARANCE_MAX_ZOOM,
        };
    }

    let min = match (query.mode, query.focus) {
        (CameraMode::Mouselook, _) => 0.0,
        (_, FocusKind::Avatar) => AVATAR_MIN_ZOOM,
        (_, FocusKind::Object) => OBJECT_MIN_ZOOM,
        (_, FocusKind::Land) => LAND_MIN_ZOOM,
    };
    let max = (query.draw_distance - DIST_FUDGE)
        .min(query.region_width - DIST_FUDGE)
        .min(MAX_CAMERA_DISTANCE_FROM_AGENT);

    DistanceBounds {
        min,
        max: if max.is_finite() { max.max(min) } else { min },
    }
}

impl DistanceBounds {
    pub fn clamp(&self, distance: f32) -> f32 {
        distance.clamp(self.min, self.max)
    }

    pub fn contains(&self, distance: f32) -> bool {
        distance >= self.min && distance <= self.max
    }

    /// Narrow by an externally imposed range. The external maximum wins over
    /// the computed minimum when they conflict.
    #[must_use]
    pub fn constrain(self, min: Option<f32>, max: Option<f32>) -> Self {
        let max = max.map_or(self.max, |m| self.max.min(m.max(0.0)));
        let min = min.map_or(self.min, |m| self.min.max(m)).min(max);
        Self { min, max }
    }

    /// Scale `offset` so its length lies within the bounds.
    ///
    /// A zero offset is pushed out along `fallback_dir` when the minimum is
    /// non-zero. Offsets already in range are returned unchanged.
    pub fn clamp_offset(&self, offset: DVec3, fallback_dir: DVec3) -> DVec3 {
        let len = offset.length();
        if len < 1e-9 {
            return if self.min > 0.0 {
                fallback_dir.normalize_or_zero() * f64::from(self.min)
            } else {
                offset
            };
        }
        if len >= f64::from(self.min) && len <= f64::from(self.max) {
            return offset;
        }
        let target = len.clamp(f64::from(self.min), f64::from(self.max));
        offset * (target / len)
    }
}
