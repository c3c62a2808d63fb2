//! Configuration for the Vantage agent controller.
//!
//! Camera tunables, teleport queueing policy, draw distance and logging
//! settings persist to disk as RON. Command-line flags override loaded values.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CameraConfig, Config, DebugConfig, RenderConfig, TeleportConfig};
pub use error::ConfigError;
