//! Structured logging for Vantage.
//!
//! Console output with uptime timestamps and targets, plus a JSON file layer
//! in debug builds. The filter comes from `RUST_LOG` when set, otherwise from
//! the configured log level. Subsystems log under the `camera`, `teleport`
//! and `agent` targets so they can be filtered independently.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vantage_config::Config;

const DEFAULT_FILTER: &str = "info";

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - enables the file layer
/// * `config` - supplies `debug.log_level` when `RUST_LOG` is unset
///
/// ```no_run
/// use vantage_config::Config;
/// use vantage_log::init_logging;
///
/// let config = Config::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_string(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join("vantage.log"))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        tracing::debug!(dir = %log_dir.display(), "file logging enabled");
        return;
    }

    subscriber.init();
}

/// Filter used when neither `RUST_LOG` nor a config level is present.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

fn filter_string(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}
