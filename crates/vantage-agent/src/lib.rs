//! The agent controller: owns the avatar's spatial frame, camera and
//! teleport state, and is the entry point for UI and network collaborators.
//!
//! Input and network events are accumulated between frames and applied in
//! [`Agent::tick`]. Everything the outside world needs to react to comes
//! back as [`AgentEvent`]s.

mod agent;
mod error;
mod event;
mod input;
mod network;
mod settings;

pub use agent::{Agent, Collaborators, TeleportRequest};
pub use error::{PositionError, SettingsError};
pub use event::AgentEvent;
pub use input::{CameraKey, InputAccumulator, MovementDeltas};
pub use network::{NetworkEvent, network_channel};
pub use settings::{HOME_POSITION_KEY, HomePosition, MemorySettings, SettingsStore};
