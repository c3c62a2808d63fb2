//! The avatar's body frame: a region-local origin plus forward/left/up axes.
//!
//! Conventions are Z-up and X-forward, so the identity frame has
//! `at = +X`, `left = +Y`, `up = +Z`.

use glam::{Mat3, Quat, Vec3};

/// A local coordinate frame with orthonormal axes.
///
/// Every mutating rotation re-orthonormalizes the axes, so accumulated float
/// drift never skews the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialFrame {
    origin: Vec3,
    at: Vec3,
    left: Vec3,
    up: Vec3,
}

impl Default for SpatialFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialFrame {
    /// Identity frame at the region origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Vec3::ZERO,
            at: Vec3::X,
            left: Vec3::Y,
            up: Vec3::Z,
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    pub fn at_axis(&self) -> Vec3 {
        self.at
    }

    pub fn left_axis(&self) -> Vec3 {
        self.left
    }

    pub fn up_axis(&self) -> Vec3 {
        self.up
    }

    /// Replace all three axes, then re-orthonormalize around `at`.
    pub fn set_axes(&mut self, at: Vec3, left: Vec3, up: Vec3) {
        self.at = at;
        self.left = left;
        self.up = up;
        self.orthonormalize();
    }

    /// Snap back to the identity orientation, keeping the origin.
    pub fn reset_axes(&mut self) {
        self.at = Vec3::X;
        self.left = Vec3::Y;
        self.up = Vec3::Z;
    }

    /// Point the frame along `look_at`, keeping `skyward` as the reference up.
    ///
    /// Returns `false` and leaves the frame untouched when `look_at` is zero or
    /// parallel to `skyward`.
    pub fn look_along(&mut self, look_at: Vec3, skyward: Vec3) -> bool {
        if look_at.cross(skyward).length_squared() < 1e-12 {
            return false;
        }
        let Some(at) = look_at.try_normalize() else {
            return false;
        };
        let left = skyward.cross(at);
        let up = at.cross(left);
        self.set_axes(at, left, up);
        true
    }

    /// Rotate by `angle` radians about `axis`. A zero axis is ignored.
    pub fn rotate(&mut self, angle: f32, axis: Vec3) {
        if let Some(axis) = axis.try_normalize() {
            self.rotate_quat(Quat::from_axis_angle(axis, angle));
        }
    }

    pub fn rotate_quat(&mut self, rotation: Quat) {
        self.at = rotation * self.at;
        self.left = rotation * self.left;
        self.up = rotation * self.up;
        self.orthonormalize();
    }

    /// Rotate about the left axis. Positive angles tip the nose down.
    pub fn pitch(&mut self, angle: f32) {
        self.rotate(angle, self.left);
    }

    pub fn yaw(&mut self, angle: f32) {
        self.rotate(angle, self.up);
    }

    pub fn roll(&mut self, angle: f32) {
        self.rotate(angle, self.at);
    }

    /// Orientation of the frame as a rotation from the identity frame.
    pub fn quaternion(&self) -> Quat {
        Quat::from_mat3(&Mat3::from_cols(self.at, self.left, self.up)).normalize()
    }

    /// Express a frame-local vector in the parent (region) space.
    pub fn rotate_to_absolute(&self, local: Vec3) -> Vec3 {
        self.at * local.x + self.left * local.y + self.up * local.z
    }

    /// True when all axes are unit length and mutually perpendicular within `eps`.
    pub fn is_orthonormal(&self, eps: f32) -> bool {
        (self.at.length() - 1.0).abs() < eps
            && (self.left.length() - 1.0).abs() < eps
            && (self.up.length() - 1.0).abs() < eps
            && self.at.dot(self.left).abs() < eps
            && self.at.dot(self.up).abs() < eps
            && self.left.dot(self.up).abs() < eps
    }

    fn orthonormalize(&mut self) {
        let Some(at) = self.at.try_normalize() else {
            self.reset_axes();
            return;
        };
        let left = (self.left - at * at.dot(self.left))
            .try_normalize()
            .or_else(|| self.up.cross(at).try_normalize());
        let Some(left) = left else {
            self.reset_axes();
            return;
        };
        self.at = at;
        self.left = left;
        self.up = at.cross(left);
    }
}
