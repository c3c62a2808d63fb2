//! Per-frame camera position smoothing.

use glam::DVec3;
use vantage_math::interpolant;

/// Base half-life, scaled by the configured smoothing strength.
pub(crate) const SMOOTHING_HALF_LIFE: f32 = 0.02;
/// Jumps larger than this are taken as teleports and never smoothed.
const MAX_CAMERA_SMOOTH_DISTANCE: f64 = 50.0;

/// Space in which the camera is smoothed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmoothingSpace {
    /// Relative to the avatar, so walking does not smear the camera.
    Agent,
    Global,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSmoother {
    last_relative: DVec3,
    last_global: DVec3,
    stopped: bool,
}

impl CameraSmoother {
    /// Skip smoothing for the next frame only.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Record `camera` as the last position without smoothing.
    pub fn reset_to(&mut self, camera: DVec3, avatar: DVec3) {
        self.last_global = camera;
        self.last_relative = camera - avatar;
    }

    /// Smooth `camera` toward the last frame's position. `space` of `None`
    /// disables smoothing this frame.
    pub fn apply(
        &mut self,
        camera: DVec3,
        avatar: DVec3,
        space: Option<SmoothingSpace>,
        strength: f32,
        dt: f32,
    ) -> DVec3 {
        let mut camera = camera;
        let mut relative = camera - avatar;

        if let Some(space) = space
            && !self.stopped
        {
            let t = f64::from(interpolant(SMOOTHING_HALF_LIFE * strength, dt));
            match space {
                SmoothingSpace::Agent => {
                    if (relative - self.last_relative).length() < MAX_CAMERA_SMOOTH_DISTANCE {
                        relative = self.last_relative.lerp(relative, t);
                        camera = avatar + relative;
                    }
                }
                SmoothingSpace::Global => {
                    if (camera - self.last_global).length() < MAX_CAMERA_SMOOTH_DISTANCE {
                        camera = self.last_global.lerp(camera, t);
                    }
                }
            }
        }

        self.last_relative = relative;
        self.last_global = camera;
        self.stopped = false;
        camera
    }
}
