//! Spatial primitives shared by the camera and teleport subsystems: the
//! avatar's local coordinate frame, region handles and critical damping.

mod damp;
mod frame;
mod region;

pub use damp::{clamp_rescale, interpolant, rescale, smoothstep};
pub use frame::SpatialFrame;
pub use region::{REGION_WIDTH_METERS, RegionContext, RegionHandle};
