//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Vantage command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "vantage", about = "Headless agent camera and teleport driver")]
pub struct CliArgs {
    /// Draw distance in meters.
    #[arg(long)]
    pub draw_distance: Option<f32>,

    /// Long-poll timing margin in milliseconds.
    #[arg(long)]
    pub poll_margin_ms: Option<u32>,

    /// Enable or disable the teleport race workaround.
    #[arg(long)]
    pub race_workaround: Option<bool>,

    /// Lift camera distance and ground constraints.
    #[arg(long)]
    pub disable_camera_constraints: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(d) = args.draw_distance {
            self.render.draw_distance = d;
        }
        if let Some(m) = args.poll_margin_ms {
            self.teleport.poll_margin_ms = m;
        }
        if let Some(w) = args.race_workaround {
            self.teleport.race_workaround = w;
        }
        if let Some(off) = args.disable_camera_constraints {
            self.camera.disable_constraints = off;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            draw_distance: None,
            poll_margin_ms: None,
            race_workaround: None,
            disable_camera_constraints: None,
            log_level: None,
            frames: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            draw_distance: Some(64.0),
            poll_margin_ms: Some(1200),
            log_level: Some("debug".to_string()),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.render.draw_distance, 64.0);
        assert_eq!(config.teleport.poll_margin_ms, 1200);
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert!(config.teleport.race_workaround);
        assert!(!config.camera.disable_constraints);
    }

    #[test]
    fn test_cli_no_override() {
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "vantage",
            "--frames",
            "120",
            "--race-workaround",
            "false",
        ]);
        assert_eq!(args.frames, Some(120));
        assert_eq!(args.race_workaround, Some(false));
    }
}
