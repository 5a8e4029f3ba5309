//! Shared type definitions for the Mason build engine.
//!
//! Types defined here are used by every crate in the workspace and flow to
//! `TypeScript` via `ts-rs` for external build monitors.
//!
//! # Modules
//!
//! - [`geometry`] -- Block positions, points, and faces
//! - [`block`] -- Block states, observed blocks, and item identifiers
//! - [`actions`] -- Pending place/remove actions
//! - [`events`] -- Build events, run states, and progress snapshots
//! - [`ids`] -- Type-safe UUID wrappers

pub mod actions;
pub mod block;
pub mod events;
pub mod geometry;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use actions::{ActionKind, PendingAction};
pub use block::{AIR, Block, BlockState, BoundingBox, Half, ItemId};
pub use events::{
    BuildEvent, BuildEventRecord, BuildOutcome, FailureKind, ProgressSnapshot, RunState,
};
pub use geometry::{BlockPos, Face, Vec3};
pub use ids::BuildId;
