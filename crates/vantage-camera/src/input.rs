//! Per-frame keyboard camera input.

/// Held camera keys, each a rate in `[0, 1]`.
///
/// Orbit rates are scaled to radians per second and pan rates to meters per
/// second by the controller. The controller consumes the snapshot each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub orbit_left: f32,
    pub orbit_right: f32,
    pub orbit_up: f32,
    pub orbit_down: f32,
    pub orbit_in: f32,
    pub orbit_out: f32,
    pub pan_in: f32,
    pub pan_out: f32,
    pub pan_left: f32,
    pub pan_right: f32,
    pub pan_up: f32,
    pub pan_down: f32,
}

impl InputSnapshot {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}
