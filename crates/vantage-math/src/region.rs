//! Region handles and region-relative coordinate conversion.

use std::fmt;

use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Grid spacing of region handles in meters.
pub const REGION_WIDTH_METERS: f32 = 256.0;

/// Packed global origin of a region: grid X in the high 32 bits, grid Y in
/// the low 32 bits, both in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionHandle(pub u64);

impl RegionHandle {
    pub fn from_origin(x: u32, y: u32) -> Self {
        Self((u64::from(x) << 32) | u64::from(y))
    }

    /// Handle of the grid cell containing a global position.
    pub fn from_global(position: DVec3) -> Self {
        let width = REGION_WIDTH_METERS as u32;
        let x = position.x.max(0.0) as u32;
        let y = position.y.max(0.0) as u32;
        Self::from_origin(x - x % width, y - y % width)
    }

    /// Global position of the region's south-west corner at height zero.
    pub fn origin_global(self) -> DVec3 {
        let x = (self.0 >> 32) as u32;
        let y = (self.0 & 0xFFFF_FFFF) as u32;
        DVec3::new(f64::from(x), f64::from(y), 0.0)
    }
}

impl fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.origin_global();
        write!(f, "{}:{}", o.x as u32, o.y as u32)
    }
}

/// Read-only view of the region the avatar is attached to.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionContext {
    pub handle: RegionHandle,
    pub name: String,
    /// Edge length in meters; variable-size regions may exceed the grid spacing.
    pub width: f32,
    /// Estate managers are exempt from camera distance limits.
    pub can_manage_estate: bool,
}

impl RegionContext {
    pub fn new(handle: RegionHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            width: REGION_WIDTH_METERS,
            can_manage_estate: false,
        }
    }

    pub fn origin_global(&self) -> DVec3 {
        self.handle.origin_global()
    }

    pub fn global_to_local(&self, global: DVec3) -> Vec3 {
        (global - self.origin_global()).as_vec3()
    }

    pub fn local_to_global(&self, local: Vec3) -> DVec3 {
        self.origin_global() + local.as_dvec3()
    }

    /// Human readable location, e.g. `Ahern (128, 64, 22)`.
    pub fn location_string(&self, local: Vec3) -> String {
        format!(
            "{} ({}, {}, {})",
            self.name,
            local.x.round() as i32,
            local.y.round() as i32,
            local.z.round() as i32
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_from_global_snaps_to_grid() {
        let h = RegionHandle::from_global(DVec3::new(256_000.0 + 100.5, 254_976.0 + 3.0, 40.0));
        assert_eq!(h, RegionHandle::from_origin(256_000, 254_976));
        assert_eq!(h.origin_global(), DVec3::new(256_000.0, 254_976.0, 0.0));
    }

    #[test]
    fn test_same_region_same_handle() {
        let a = RegionHandle::from_global(DVec3::new(1000.0, 2000.0, 0.0));
        let b = RegionHandle::from_global(DVec3::new(1020.0, 2040.0, 500.0));
        let c = RegionHandle::from_global(DVec3::new(1024.0, 2040.0, 0.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_local_global_conversion() {
        let region = RegionContext::new(RegionHandle::from_origin(512, 768), "Test");
        let global = DVec3::new(600.0, 800.0, 25.0);
        let local = region.global_to_local(global);
        assert_eq!(local, Vec3::new(88.0, 32.0, 25.0));
        assert_eq!(region.local_to_global(local), global);
    }

    #[test]
    fn test_location_string() {
        let region = RegionContext::new(RegionHandle::from_origin(0, 0), "Ahern");
        assert_eq!(region.location_string(Vec3::new(127.6, 64.2, 22.0)), "Ahern (128, 64, 22)");
    }
}
