use vantage_math::RegionHandle;

use crate::payload::TeleportPayload;

/// The network session as seen by the sequencer.
pub trait SessionLink {
    fn send_teleport_request(&mut self, payload: &TeleportPayload);

    fn send_teleport_cancel(&mut self);

    /// Whether the region's event poll request is currently outstanding.
    fn is_poll_in_flight(&self, region: RegionHandle) -> bool;
}
