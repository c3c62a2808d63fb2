//! Per-frame input accumulation.

use vantage_camera::InputSnapshot;

/// Camera keys with an analog strength in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraKey {
    OrbitLeft,
    OrbitRight,
    OrbitUp,
    OrbitDown,
    OrbitIn,
    OrbitOut,
    PanIn,
    PanOut,
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
}

/// Avatar movement controls for one frame. Translations are in `[-1, 1]`,
/// rotations in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementDeltas {
    pub at: f32,
    pub left: f32,
    pub up: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl MovementDeltas {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn translates(&self) -> bool {
        self.at != 0.0 || self.left != 0.0 || self.up != 0.0
    }
}

/// Collects movement and camera input between frames.
///
/// Everything is consumed and zeroed by [`take`](Self::take) once per frame.
#[derive(Debug, Clone, Default)]
pub struct InputAccumulator {
    movement: MovementDeltas,
    camera: InputSnapshot,
}

impl InputAccumulator {
    pub fn move_at(&mut self, amount: f32) {
        self.movement.at = (self.movement.at + amount).clamp(-1.0, 1.0);
    }

    pub fn move_left(&mut self, amount: f32) {
        self.movement.left = (self.movement.left + amount).clamp(-1.0, 1.0);
    }

    pub fn move_up(&mut self, amount: f32) {
        self.movement.up = (self.movement.up + amount).clamp(-1.0, 1.0);
    }

    pub fn move_yaw(&mut self, radians: f32) {
        self.movement.yaw += radians;
    }

    pub fn move_pitch(&mut self, radians: f32) {
        self.movement.pitch += radians;
    }

    /// Drive a camera key this frame. The strongest press wins.
    pub fn camera_key(&mut self, key: CameraKey, amount: f32) {
        let c = &mut self.camera;
        let slot = match key {
            CameraKey::OrbitLeft => &mut c.orbit_left,
            CameraKey::OrbitRight => &mut c.orbit_right,
            CameraKey::OrbitUp => &mut c.orbit_up,
            CameraKey::OrbitDown => &mut c.orbit_down,
            CameraKey::OrbitIn => &mut c.orbit_in,
            CameraKey::OrbitOut => &mut c.orbit_out,
            CameraKey::PanIn => &mut c.pan_in,
            CameraKey::PanOut => &mut c.pan_out,
            CameraKey::PanLeft => &mut c.pan_left,
            CameraKey::PanRight => &mut c.pan_right,
            CameraKey::PanUp => &mut c.pan_up,
            CameraKey::PanDown => &mut c.pan_down,
        };
        *slot = slot.max(amount.clamp(0.0, 1.0));
    }

    pub fn movement(&self) -> MovementDeltas {
        self.movement
    }

    pub fn camera(&self) -> &InputSnapshot {
        &self.camera
    }

    /// Hand over this frame's input and start the next frame from zero.
    pub fn take(&mut self) -> (MovementDeltas, InputSnapshot) {
        (std::mem::take(&mut self.movement), std::mem::take(&mut self.camera))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_zeroes_everything() {
        let mut input = InputAccumulator::default();
        input.move_at(1.0);
        input.move_yaw(0.2);
        input.camera_key(CameraKey::OrbitLeft, 1.0);

        let (movement, camera) = input.take();
        assert_eq!(movement.at, 1.0);
        assert_eq!(movement.yaw, 0.2);
        assert_eq!(camera.orbit_left, 1.0);

        let (movement, camera) = input.take();
        assert!(movement.is_zero());
        assert!(camera.is_idle());
    }

    #[test]
    fn test_translation_is_clamped() {
        let mut input = InputAccumulator::default();
        input.move_left(0.7);
        input.move_left(0.7);
        assert_eq!(input.movement().left, 1.0);
        input.move_up(-3.0);
        assert_eq!(input.movement().up, -1.0);
        assert!(input.movement().translates());
    }

    #[test]
    fn test_strongest_camera_press_wins() {
        let mut input = InputAccumulator::default();
        input.camera_key(CameraKey::PanUp, 0.8);
        input.camera_key(CameraKey::PanUp, 0.3);
        input.camera_key(CameraKey::PanDown, 4.0);
        assert_eq!(input.camera().pan_up, 0.8);
        assert_eq!(input.camera().pan_down, 1.0);
    }
}
