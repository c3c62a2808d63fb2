//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Camera tunables.
    pub camera: CameraConfig,
    /// Teleport sequencing policy.
    pub teleport: TeleportConfig,
    /// Rendering limits the camera respects.
    pub render: RenderConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Camera tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Duration of mode and focus transitions in seconds.
    pub zoom_time_secs: f32,
    /// Rear-view camera offset from the avatar head, in avatar frame.
    pub offset_default: Vec3,
    /// Rear-view focus offset from the avatar, in avatar frame.
    pub focus_offset_default: Vec3,
    /// Front-view camera offset.
    pub offset_front_view: Vec3,
    /// Front-view focus offset.
    pub focus_offset_front_view: Vec3,
    /// Use the front-view offsets in third person.
    pub front_view: bool,
    /// Multiplier on the camera offset.
    pub offset_scale: f32,
    /// Offset from the avatar root to the point the third-person camera orbits.
    pub head_offset: Vec3,
    /// Multiplier on the 0.02 s camera position smoothing half-life (0 disables).
    pub position_smoothing: f32,
    /// How strongly the camera lags behind a flying avatar.
    pub dynamic_strength: f32,
    /// Skip the collide-plane test.
    pub ignore_collisions: bool,
    /// Lift every distance and ground constraint.
    pub disable_constraints: bool,
    /// Follow a moving focus object instead of pinning the focus point.
    pub track_focus_object: bool,
    /// Unzoomed vertical field of view in radians.
    pub default_fov_radians: f32,
    /// Near clip plane distance in meters.
    pub near_clip: f32,
    /// Play the customize animation when entering avatar customization.
    pub appearance_animation: bool,
    /// Resetting the view turns the avatar to face the camera direction.
    pub reset_view_rotates_avatar: bool,
}

/// Teleport sequencing policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TeleportConfig {
    /// Defer relocation requests while the region poll is in flight.
    pub race_workaround: bool,
    /// Expected long-poll timing margin in milliseconds (clamped to 200..=2000).
    pub poll_margin_ms: u32,
    /// Fixed slack added to twice the poll margin to form the queue expiry.
    pub queue_expiry_slack_ms: u32,
    /// Drop stale fetch queues on cross-region arrival.
    pub clear_stale_fetches: bool,
    /// Delay pending mesh fetches on cross-region arrival.
    pub delay_mesh_fetches: bool,
    /// Seconds a committed teleport may take before it is abandoned.
    pub expiry_secs: f32,
    /// Extra expiry seconds per worn attachment.
    pub expiry_per_attachment_secs: f32,
    /// Arrival completes on its own after this many milliseconds.
    pub arrival_delay_ms: u32,
    /// A same-region teleport completes on its own after this many milliseconds.
    pub local_delay_ms: u32,
}

/// Rendering limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Far clip distance in meters.
    pub draw_distance: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            zoom_time_secs: 0.5,
            offset_default: Vec3::new(-3.0, 0.0, 0.75),
            focus_offset_default: Vec3::new(1.0, 0.0, 1.0),
            offset_front_view: Vec3::new(2.2, 0.0, 0.0),
            focus_offset_front_view: Vec3::ZERO,
            front_view: false,
            offset_scale: 1.0,
            head_offset: Vec3::new(0.0, 0.0, 1.0),
            position_smoothing: 1.0,
            dynamic_strength: 2.0,
            ignore_collisions: false,
            disable_constraints: false,
            track_focus_object: true,
            default_fov_radians: 1.047,
            near_clip: 0.1,
            appearance_animation: true,
            reset_view_rotates_avatar: true,
        }
    }
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self {
            race_workaround: true,
            poll_margin_ms: 500,
            queue_expiry_slack_ms: 500,
            clear_stale_fetches: true,
            delay_mesh_fetches: true,
            expiry_secs: 15.0,
            expiry_per_attachment_secs: 3.0,
            arrival_delay_ms: 2000,
            local_delay_ms: 1000,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            draw_distance: 128.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl TeleportConfig {
    /// Poll timing margin, clamped to 200..=2000 ms.
    pub fn poll_margin(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_margin_ms.clamp(200, 2000)))
    }

    /// How long a queued request waits for the poll guard before firing anyway.
    pub fn queue_expiry(&self) -> Duration {
        self.poll_margin() * 2 + Duration::from_millis(u64::from(self.queue_expiry_slack_ms))
    }

    /// How long a committed teleport may stall before it is abandoned.
    /// Attachments take time to rez in the destination.
    pub fn teleport_expiry(&self, attachments: u32) -> Duration {
        let secs = self.expiry_secs + self.expiry_per_attachment_secs * attachments as f32;
        Duration::try_from_secs_f32(secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn arrival_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.arrival_delay_ms))
    }

    pub fn local_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.local_delay_ms))
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Per-user configuration directory (`<config dir>/vantage`).
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join("vantage"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
