//! Error types for the `mason-world` crate.

use mason_types::BlockPos;

/// Errors raised when reading the live world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The world can no longer be observed (connection lost, client closed).
    #[error("world unavailable: {reason}")]
    Unavailable {
        /// Why the world cannot be read.
        reason: String,
    },

    /// The position lies outside the loaded region.
    #[error("position {0} is not loaded")]
    NotLoaded(BlockPos),
}

/// Errors raised when assembling a plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Two target cells share a position.
    #[error("duplicate target cell at {0}")]
    DuplicatePosition(BlockPos),

    /// The plan has more cells than an action index can address.
    #[error("plan has {0} cells, more than the supported maximum")]
    TooLarge(usize),
}
