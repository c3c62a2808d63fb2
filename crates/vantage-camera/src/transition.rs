//! Animated camera transitions between the previous pose and the current
//! target: mode changes, focus changes and scripted camera moves.
//!
//! The animation only stores where it started. Targets are supplied every
//! frame, so a moving avatar or focus object is tracked while animating.

use glam::DVec3;
use vantage_math::smoothstep;

/// Keep the animated camera this far outside the avatar's head when moving
/// into or out of first person.
pub(crate) const HEAD_BUFFER_SIZE: f64 = 0.3;

/// An in-progress camera animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraAnimation {
    camera_start: DVec3,
    focus_start: DVec3,
    elapsed: f32,
    duration: f32,
}

/// Camera and focus for one frame of an animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSample {
    pub camera: DVec3,
    pub focus: DVec3,
    /// False while the camera is inside the avatar's head buffer.
    pub show_avatar: bool,
    pub finished: bool,
}

impl CameraAnimation {
    pub fn new(camera_start: DVec3, focus_start: DVec3, duration: f32) -> Self {
        Self {
            camera_start,
            focus_start,
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    pub fn camera_start(&self) -> DVec3 {
        self.camera_start
    }

    pub fn focus_start(&self) -> DVec3 {
        self.focus_start
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration.max(0.0);
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    /// Linear progress in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    /// Blend from the start pose toward this frame's targets.
    ///
    /// Leaving first person starts the camera outside the head buffer so the
    /// avatar never renders from the inside; entering it finishes early for
    /// the same reason.
    pub fn sample(
        &self,
        camera_target: DVec3,
        focus_target: DVec3,
        leaving_mouselook: bool,
        entering_mouselook: bool,
    ) -> AnimationSample {
        let travel = (self.camera_start - camera_target).length();
        let skip = if travel > 1e-6 {
            (HEAD_BUFFER_SIZE / travel).min(1.0) as f32
        } else {
            0.0
        };
        let start_fraction = if leaving_mouselook { skip } else { 0.0 };
        let finish_fraction = if entering_mouselook { 1.0 - skip } else { 1.0 };

        let linear = self.fraction();
        if linear >= 1.0 || finish_fraction <= start_fraction || linear >= finish_fraction {
            return AnimationSample {
                camera: camera_target,
                focus: focus_target,
                show_avatar: !entering_mouselook,
                finished: true,
            };
        }

        let eased = smoothstep(start_fraction + linear * (finish_fraction - start_fraction));
        let t = f64::from(eased);
        AnimationSample {
            camera: self.camera_start.lerp(camera_target, t),
            focus: self.focus_start.lerp(focus_target, t),
            show_avatar: true,
            finished: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anim() -> CameraAnimation {
        CameraAnimation::new(DVec3::ZERO, DVec3::new(0.0, 0.0, 1.0), 1.0)
    }

    #[test]
    fn test_starts_at_start_pose() {
        let s = anim().sample(DVec3::new(10.0, 0.0, 0.0), DVec3::ZERO, false, false);
        assert!(!s.finished);
        assert!(s.camera.length() < 1e-9);
        assert!((s.focus - DVec3::new(0.0, 0.0, 1.0)).length() < 1e-9);
    }

    #[test]
    fn test_midpoint_is_halfway() {
        let mut a = anim();
        a.advance(0.5);
        let s = a.sample(DVec3::new(10.0, 0.0, 0.0), DVec3::ZERO, false, false);
        assert!((s.camera.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_finishes_on_target() {
        let mut a = anim();
        a.advance(1.5);
        let target = DVec3::new(10.0, 0.0, 0.0);
        let s = a.sample(target, DVec3::ZERO, false, false);
        assert!(s.finished);
        assert_eq!(s.camera, target);
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let a = CameraAnimation::new(DVec3::ZERO, DVec3::ZERO, 0.0);
        assert!(a.sample(DVec3::X, DVec3::ZERO, false, false).finished);
    }

    #[test]
    fn test_leaving_mouselook_skips_head_buffer() {
        let s = anim().sample(DVec3::new(3.0, 0.0, 0.0), DVec3::ZERO, true, false);
        // smoothstep(0.1) of a 3 m move.
        assert!(s.camera.x > 0.05);
    }

    #[test]
    fn test_entering_mouselook_finishes_early() {
        let mut a = anim();
        a.advance(0.95);
        let target = DVec3::new(3.0, 0.0, 0.0);
        let s = a.sample(target, DVec3::ZERO, false, true);
        assert!(s.finished);
        assert!(!s.show_avatar);
    }
}
