use glam::DVec3;

/// Rejected position updates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionError {
    #[error("position is not finite: {0:?}")]
    NonFinite(DVec3),
}

/// Errors reading or writing persisted agent settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to parse setting `{key}`: {source}")]
    Parse {
        key: String,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("failed to serialize setting: {0}")]
    Serialize(#[source] ron::Error),
}
