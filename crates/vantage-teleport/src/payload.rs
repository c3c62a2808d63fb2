//! Teleport request payloads.

use std::fmt;
use std::ops::BitOr;
use std::time::Instant;

use glam::Vec3;
use uuid::Uuid;
use vantage_math::RegionHandle;

/// Inventory landmark to teleport to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LandmarkId(pub Uuid);

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Teleport offer received from another resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LureId(pub Uuid);

impl fmt::Display for LureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Flags sent with a lure request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TeleportFlags(pub u32);

impl TeleportFlags {
    pub const NONE: Self = Self(0);
    pub const VIA_LURE: Self = Self(1 << 2);
    pub const VIA_GODLIKE_LURE: Self = Self(1 << 4);
    pub const DISABLE_CANCEL: Self = Self(1 << 7);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags for accepting a lure.
    pub fn for_lure(godlike: bool) -> Self {
        if godlike {
            Self::VIA_GODLIKE_LURE | Self::DISABLE_CANCEL
        } else {
            Self::VIA_LURE
        }
    }
}

impl BitOr for TeleportFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What gets sent to the server once the request is allowed to fire.
#[derive(Debug, Clone, PartialEq)]
pub enum TeleportPayload {
    Location {
        region: RegionHandle,
        position_local: Vec3,
        look_at: Vec3,
    },
    /// `None` teleports home.
    Landmark { landmark: Option<LandmarkId> },
    Lure { lure: LureId, flags: TeleportFlags },
}

impl TeleportPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Location { .. } => "location",
            Self::Landmark { .. } => "landmark",
            Self::Lure { .. } => "lure",
        }
    }

    pub fn disables_cancel(&self) -> bool {
        matches!(self, Self::Lure { flags, .. } if flags.contains(TeleportFlags::DISABLE_CANCEL))
    }
}

/// A payload waiting for the event poll guard, with its expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedRequest {
    pub payload: TeleportPayload,
    pub expires_at: Instant,
}

impl QueuedRequest {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_lure_flags() {
        let godlike = TeleportFlags::for_lure(true);
        assert!(godlike.contains(TeleportFlags::VIA_GODLIKE_LURE));
        assert!(godlike.contains(TeleportFlags::DISABLE_CANCEL));
        assert!(!godlike.contains(TeleportFlags::VIA_LURE));
        assert_eq!(TeleportFlags::for_lure(false), TeleportFlags::VIA_LURE);
    }

    #[test]
    fn test_godlike_lure_disables_cancel() {
        let lure = LureId(Uuid::new_v4());
        let godlike = TeleportPayload::Lure {
            lure,
            flags: TeleportFlags::for_lure(true),
        };
        let plain = TeleportPayload::Lure {
            lure,
            flags: TeleportFlags::for_lure(false),
        };
        assert!(godlike.disables_cancel());
        assert!(!plain.disables_cancel());
        assert!(!TeleportPayload::Landmark { landmark: None }.disables_cancel());
    }

    #[test]
    fn test_queued_request_expiry() {
        let now = Instant::now();
        let queued = QueuedRequest {
            payload: TeleportPayload::Landmark { landmark: None },
            expires_at: now + Duration::from_millis(1500),
        };
        assert!(!queued.is_expired(now));
        assert!(queued.is_expired(now + Duration::from_millis(1500)));
    }
}
