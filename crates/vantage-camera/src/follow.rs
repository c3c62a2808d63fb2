//! Scripted follow camera: an external collaborator the controller hands the
//! camera to while active.

use glam::{DVec3, Quat, Vec3};
use vantage_math::interpolant;

/// Zoom step per scroll click, as a fraction of the current distance.
const FOLLOW_CAM_ZOOM_FACTOR: f32 = 0.1;
const FOLLOW_CAM_MIN_ZOOM_AMOUNT: f32 = 0.1;
const FOLLOW_CAM_MIN_DISTANCE: f32 = 0.5;
const FOLLOW_CAM_MAX_DISTANCE: f32 = 10.0;

/// A camera that tracks its subject on its own.
pub trait FollowCamera {
    fn is_active(&self) -> bool;

    /// Advance the simulation toward the subject.
    fn update(&mut self, subject_position: DVec3, subject_rotation: Quat, dt: f32);

    /// Restart the simulation from an existing camera placement.
    fn reset(&mut self, position: DVec3, focus: DVec3, up: Vec3);

    fn simulated_position(&self) -> DVec3;

    fn simulated_focus(&self) -> DVec3;

    fn up_vector(&self) -> Vec3;

    /// Positive clicks move the camera away from the subject.
    fn zoom(&mut self, clicks: i32);

    /// The last zoom tried to move closer than the minimum distance.
    fn is_zoomed_to_minimum(&self) -> bool;
}

/// Script-provided follow camera parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FollowParams {
    /// Preferred distance behind the subject.
    pub distance: f32,
    /// Height of the camera above the subject.
    pub pitch_offset: f32,
    /// Focus offset in the subject frame.
    pub focus_offset: Vec3,
    pub position_lag_secs: f32,
    pub focus_lag_secs: f32,
    /// Camera stays where it is and only turns toward the subject.
    pub position_locked: bool,
    pub focus_locked: bool,
}

impl Default for FollowParams {
    fn default() -> Self {
        Self {
            distance: 3.0,
            pitch_offset: 1.0,
            focus_offset: Vec3::ZERO,
            position_lag_secs: 0.1,
            focus_lag_secs: 0.1,
            position_locked: false,
            focus_locked: false,
        }
    }
}

/// Follow camera that eases toward a point behind its subject.
#[derive(Clone, Debug, Default)]
pub struct SmoothFollowCamera {
    params: Option<FollowParams>,
    position: DVec3,
    focus: DVec3,
    up: Vec3,
    zoom_distance: f32,
    zoomed_to_minimum: bool,
}

impl SmoothFollowCamera {
    #[must_use]
    pub fn new() -> Self {
        Self {
            up: Vec3::Z,
            ..Default::default()
        }
    }

    /// Activate with script parameters.
    pub fn activate(&mut self, params: FollowParams) {
        self.zoom_distance = params
            .distance
            .clamp(FOLLOW_CAM_MIN_DISTANCE, FOLLOW_CAM_MAX_DISTANCE);
        self.zoomed_to_minimum = false;
        self.params = Some(params);
    }

    pub fn deactivate(&mut self) {
        self.params = None;
    }

    pub fn params(&self) -> Option<&FollowParams> {
        self.params.as_ref()
    }
}

impl FollowCamera for SmoothFollowCamera {
    fn is_active(&self) -> bool {
        self.params.is_some()
    }

    fn update(&mut self, subject_position: DVec3, subject_rotation: Quat, dt: f32) {
        let Some(params) = self.params else {
            return;
        };

        if !params.focus_locked {
            let ideal_focus = subject_position + (subject_rotation * params.focus_offset).as_dvec3();
            let t = f64::from(interpolant(params.focus_lag_secs, dt));
            self.focus = self.focus.lerp(ideal_focus, t);
        }

        if !params.position_locked {
            let behind = subject_rotation * Vec3::new(-self.zoom_distance, 0.0, params.pitch_offset);
            let ideal_position = subject_position + behind.as_dvec3();
            let t = f64::from(interpolant(params.position_lag_secs, dt));
            self.position = self.position.lerp(ideal_position, t);
        }
    }

    fn reset(&mut self, position: DVec3, focus: DVec3, up: Vec3) {
        self.position = position;
        self.focus = focus;
        self.up = up;
    }

    fn simulated_position(&self) -> DVec3 {
        self.position
    }

    fn simulated_focus(&self) -> DVec3 {
        self.focus
    }

    fn up_vector(&self) -> Vec3 {
        self.up
    }

    fn zoom(&mut self, clicks: i32) {
        if clicks == 0 {
            return;
        }
        let mut amount = clicks as f32 * self.zoom_distance * FOLLOW_CAM_ZOOM_FACTOR;
        if amount.abs() < FOLLOW_CAM_MIN_ZOOM_AMOUNT {
            amount = FOLLOW_CAM_MIN_ZOOM_AMOUNT.copysign(amount);
        }

        self.zoom_distance += amount;
        self.zoomed_to_minimum = false;
        if self.zoom_distance < FOLLOW_CAM_MIN_DISTANCE {
            self.zoom_distance = FOLLOW_CAM_MIN_DISTANCE;
            self.zoomed_to_minimum = amount < 0.0;
        } else if self.zoom_distance > FOLLOW_CAM_MAX_DISTANCE {
            self.zoom_distance = FOLLOW_CAM_MAX_DISTANCE;
        }
    }

    fn is_zoomed_to_minimum(&self) -> bool {
        self.zoomed_to_minimum
    }
}
