//! Orbit, pan and zoom operations.

use std::f32::consts::PI;

use glam::{DQuat, DVec3, Vec3};
use vantage_math::{SpatialFrame, clamp_rescale, rescale};

use crate::controller::{CameraContext, CameraController};
use crate::limits::{
    APPEARANCE_MAX_ZOOM, APPEARANCE_MIN_ZOOM, AVATAR_MIN_ZOOM, LAND_MIN_ZOOM, MAX_ZOOM_FRACTION,
    MIN_ZOOM_FRACTION, OBJECT_MIN_ZOOM, UNCONSTRAINED_MAX_DISTANCE,
};
use crate::mode::CameraMode;
use crate::solver::{compute_camera_target, object_min_distance_for};

const DEG_TO_RAD: f32 = PI / 180.0;

const LOOK_UP_LIMIT: f32 = 10.0 * DEG_TO_RAD;
const LOOK_DOWN_LIMIT: f32 = 170.0 * DEG_TO_RAD;
const SITTING_LOOK_DOWN_LIMIT: f32 = 130.0 * DEG_TO_RAD;

const ORBIT_OVER_MIN: f32 = DEG_TO_RAD;
const ORBIT_OVER_MAX: f32 = 179.0 * DEG_TO_RAD;

/// Scroll step: each click scales the distance by the fourth root of two.
const ROOT_ROOT_TWO: f32 = 1.189_207_1;

/// Limit a pitch so the avatar never looks within 10 degrees of straight up,
/// nor past 170 degrees down (130 while sitting).
pub fn clamp_pitch(frame: &SpatialFrame, sitting: bool, angle: f32) -> f32 {
    let from_skyward = frame.at_axis().dot(Vec3::Z).clamp(-1.0, 1.0).acos();
    let look_down_limit = if sitting {
        SITTING_LOOK_DOWN_LIMIT
    } else {
        LOOK_DOWN_LIMIT
    };

    if angle > 0.0 && from_skyward + angle > look_down_limit {
        (look_down_limit - from_skyward).max(0.0)
    } else if angle < 0.0 && from_skyward + angle < LOOK_UP_LIMIT {
        (LOOK_UP_LIMIT - from_skyward).min(0.0)
    } else {
        angle
    }
}

impl CameraController {
    fn orbits_avatar(&self) -> bool {
        self.focus.on_avatar && self.mode == CameraMode::ThirdPerson
    }

    /// Orbit horizontally around the focus. Around the avatar this turns the
    /// avatar itself.
    pub fn orbit_around(&mut self, ctx: &mut CameraContext<'_>, radians: f32) {
        if self.focus.on_avatar && matches!(self.mode, CameraMode::ThirdPerson | CameraMode::Follow) {
            ctx.frame.rotate(radians, Vec3::Z);
        } else {
            let rotation = DQuat::from_rotation_z(f64::from(radians));
            self.camera_focus_offset_target = rotation * self.camera_focus_offset_target;
            self.zoom_in(ctx, 1.0);
        }
    }

    /// Orbit vertically. Positive angles move the camera up.
    pub fn orbit_over(&mut self, ctx: &mut CameraContext<'_>, angle: f32) {
        if self.orbits_avatar() {
            let angle = clamp_pitch(ctx.frame, ctx.avatar.sitting, angle);
            ctx.frame.pitch(angle);
            return;
        }

        let offset_unit = self.camera_focus_offset_target.normalize_or_zero().as_vec3();
        let from_up = offset_unit.dot(Vec3::Z).clamp(-1.0, 1.0).acos();
        let new_angle = (from_up - angle).clamp(ORBIT_OVER_MIN, ORBIT_OVER_MAX);
        let (_, left, _) = self.camera_axes();
        let rotation = DQuat::from_axis_angle(left.as_dvec3(), f64::from(from_up - new_angle));
        self.camera_focus_offset_target = rotation * self.camera_focus_offset_target;
        self.zoom_in(ctx, 1.0);
    }

    /// Scale the focus distance by `fraction` (< 1 moves closer), respecting
    /// the minimum and maximum distances.
    pub fn zoom_in(&mut self, ctx: &mut CameraContext<'_>, fraction: f32) {
        let current = self.camera_focus_offset_target.length();
        if current < 1e-9 {
            return;
        }
        let unit = self.camera_focus_offset_target / current;
        let mut new_distance = current as f32 * fraction;

        let constrained = !self.config.disable_constraints;
        if constrained {
            let focus_object = self.resolve_focus_object(ctx);
            let min_zoom = match &focus_object {
                Some(object) if object.is_avatar => {
                    let inputs = self.pose_inputs(ctx, focus_object.as_ref(), 0.0);
                    object_min_distance_for(&inputs, object, self.pose.position_global)
                        .unwrap_or(AVATAR_MIN_ZOOM)
                }
                Some(_) => OBJECT_MIN_ZOOM,
                None => LAND_MIN_ZOOM,
            };
            new_distance = new_distance.max(min_zoom);
        }

        let max_distance = if constrained {
            let width = ctx.region.map_or(vantage_math::REGION_WIDTH_METERS, |r| r.width);
            self.draw_distance.min(width)
        } else {
            UNCONSTRAINED_MAX_DISTANCE
        };
        new_distance = new_distance.min(max_distance);

        if self.mode == CameraMode::CustomizeAvatar {
            new_distance = new_distance.clamp(APPEARANCE_MIN_ZOOM, APPEARANCE_MAX_ZOOM);
        }

        self.camera_focus_offset_target = unit * f64::from(new_distance);
    }

    /// Move toward the focus by `meters`. Zooming all the way in on the avatar
    /// switches to first person.
    pub fn orbit_in(&mut self, ctx: &mut CameraContext<'_>, meters: f32) {
        if self.orbits_avatar() {
            let offset_distance = (self.offsets.camera.length() * self.offsets.scale).max(0.001);
            let zoom_fraction = (self.damping.target_distance - meters) / offset_distance;
            if zoom_fraction < MIN_ZOOM_FRACTION && meters > 0.0 {
                self.enter_mouselook(ctx, false);
            }
            self.zoom_fraction = zoom_fraction.clamp(MIN_ZOOM_FRACTION, MAX_ZOOM_FRACTION);
            return;
        }

        let current = self.camera_focus_offset_target.length();
        if current < 1e-9 {
            return;
        }
        let unit = self.camera_focus_offset_target / current;
        let focus_object = self.resolve_focus_object(ctx);
        let bounds = self.distance_bounds(ctx, focus_object.as_ref());
        let new_distance = bounds.clamp(current as f32 - meters);
        self.camera_focus_offset_target = unit * f64::from(new_distance);
    }

    /// Handle mouse-wheel clicks; positive clicks zoom out.
    pub fn handle_scroll_wheel(&mut self, ctx: &mut CameraContext<'_>, clicks: i32) {
        if self.mode == CameraMode::Follow && self.focus.on_avatar {
            ctx.follow.zoom(clicks);
            if ctx.follow.is_zoomed_to_minimum() {
                self.enter_mouselook(ctx, false);
            }
            return;
        }
        if self.animation.is_some() {
            return;
        }

        let step = 1.0 - ROOT_ROOT_TWO.powi(clicks);
        if self.orbits_avatar() {
            let offset_distance = self.offsets.camera.length() * self.offsets.scale;
            if offset_distance <= 0.0 {
                return;
            }
            let current_fraction = self.damping.target_distance / offset_distance * step;
            self.orbit_in(ctx, current_fraction * offset_distance);
        } else {
            let current = self.camera_focus_offset_target.length() as f32;
            self.orbit_in(ctx, current * step);
        }
    }

    /// Zoom in `[0, 1]`: 0 is all the way out, 1 all the way in.
    pub fn camera_zoom_fraction(&self, ctx: &CameraContext<'_>) -> f32 {
        if self.orbits_avatar() {
            return clamp_rescale(self.zoom_fraction, MIN_ZOOM_FRACTION, MAX_ZOOM_FRACTION, 1.0, 0.0);
        }
        let distance = self.camera_focus_offset_target.length() as f32;
        if self.mode == CameraMode::CustomizeAvatar {
            return clamp_rescale(distance, APPEARANCE_MIN_ZOOM, APPEARANCE_MAX_ZOOM, 1.0, 0.0);
        }
        let focus_object = self.resolve_focus_object(ctx);
        let bounds = self.distance_bounds(ctx, focus_object.as_ref());
        clamp_rescale(distance, bounds.min, bounds.max, 1.0, 0.0)
    }

    /// Inverse of [`camera_zoom_fraction`](Self::camera_zoom_fraction).
    pub fn set_camera_zoom_fraction(&mut self, ctx: &mut CameraContext<'_>, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        if self.orbits_avatar() {
            self.zoom_fraction = rescale(fraction, 0.0, 1.0, MAX_ZOOM_FRACTION, MIN_ZOOM_FRACTION);
        } else {
            let (near, far) = if self.mode == CameraMode::CustomizeAvatar {
                (APPEARANCE_MIN_ZOOM, APPEARANCE_MAX_ZOOM)
            } else {
                let focus_object = self.resolve_focus_object(ctx);
                let bounds = self.distance_bounds(ctx, focus_object.as_ref());
                (bounds.min, bounds.max)
            };
            let dir = self.camera_focus_offset_target.normalize_or(DVec3::NEG_X);
            self.camera_focus_offset_target = dir * f64::from(rescale(fraction, 0.0, 1.0, far, near));
        }
        self.start_animation();
    }

    /// Slide the focus along the camera's view direction.
    pub fn pan_in(&mut self, ctx: &mut CameraContext<'_>, meters: f32) {
        let (at, _, _) = self.camera_axes();
        self.pan_focus(ctx, at, meters, false);
    }

    pub fn pan_left(&mut self, ctx: &mut CameraContext<'_>, meters: f32) {
        let (_, left, _) = self.camera_axes();
        self.pan_focus(ctx, left, meters, true);
    }

    pub fn pan_up(&mut self, ctx: &mut CameraContext<'_>, meters: f32) {
        let (_, _, up) = self.camera_axes();
        self.pan_focus(ctx, up, meters, true);
    }

    /// Panning detaches the focus from the avatar; the camera moves rigidly
    /// with the focus, without smoothing or animation.
    fn pan_focus(&mut self, ctx: &mut CameraContext<'_>, axis: Vec3, meters: f32, stop_smoothing: bool) {
        if self.focus.on_avatar {
            self.set_focus_on_avatar(ctx, false, false);
        }
        self.focus.target_global += axis.as_dvec3() * f64::from(meters);
        self.focus_global = self.focus.target_global;

        if stop_smoothing {
            self.smoother.stop();
            self.zoom_in(ctx, 1.0);
        }
        if let Some(object) = self.resolve_focus_object(ctx) {
            self.focus.bind(&object);
        }

        let focus_object = self.resolve_focus_object(ctx);
        let inputs = self.pose_inputs(ctx, focus_object.as_ref(), 0.0);
        let camera = compute_camera_target(&inputs, self.damping).position;
        self.smoother.reset_to(camera, ctx.avatar.position_global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_pitch_limits_looking_up() {
        let frame = SpatialFrame::new();
        // Level frame is 90 degrees from skyward; can pitch up 80 more.
        let clamped = clamp_pitch(&frame, false, -2.0);
        assert!((clamped + 80.0_f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn test_clamp_pitch_sitting_limits_looking_down() {
        let frame = SpatialFrame::new();
        let clamped = clamp_pitch(&frame, true, 1.0);
        assert!((clamped - 40.0_f32.to_radians()).abs() < 1e-4);
        assert_eq!(clamp_pitch(&frame, false, 1.0), 1.0);
    }

    #[test]
    fn test_clamp_pitch_small_angles_pass() {
        let frame = SpatialFrame::new();
        assert_eq!(clamp_pitch(&frame, false, 0.1), 0.1);
        assert_eq!(clamp_pitch(&frame, false, -0.1), -0.1);
    }
}
