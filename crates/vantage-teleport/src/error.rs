use crate::state::TeleportState;

/// Reasons a teleport operation is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TeleportError {
    /// Another teleport is still in progress.
    #[error("a teleport is already in progress ({0})")]
    AlreadyActive(TeleportState),
    /// The agent is not attached to any region.
    #[error("current region is unknown")]
    NoRegion,
    /// The destination contains NaN or infinite coordinates.
    #[error("teleport destination is not finite")]
    NonFinite,
    /// Cancellation is only possible before the destination commits.
    #[error("teleport cannot be cancelled in state {0}")]
    NotCancellable(TeleportState),
}
