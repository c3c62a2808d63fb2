//! Teleport sequencing for a single agent.
//!
//! A teleport is accepted by [`TeleportSequencer`], optionally held back
//! while the region's event poll is in flight, and then driven to completion
//! by network callbacks. Side effects are emitted as [`TeleportEvent`]s for
//! the caller to apply between frames.

mod error;
mod event;
mod link;
mod payload;
mod sequencer;
mod state;

pub use error::TeleportError;
pub use event::{RefreshKind, TeleportEffect, TeleportEvent};
pub use link::SessionLink;
pub use payload::{LandmarkId, LureId, QueuedRequest, TeleportFlags, TeleportPayload};
pub use sequencer::{DepartureSnapshot, TeleportContext, TeleportSequencer};
pub use state::TeleportState;
