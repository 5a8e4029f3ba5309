//! Observable build events, run states, and progress snapshots.
//!
//! The drive loop and the control handle publish [`BuildEventRecord`]s; any
//! number of observers may subscribe. Records are plain data so they can be
//! forwarded to logs, dashboards, or chat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::BlockPos;
use crate::ids::BuildId;

/// Run state of an active build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RunState {
    /// Selecting and executing actions.
    Running,
    /// Parked at an iteration boundary until resumed.
    Paused,
    /// Stopped for good.
    Cancelled,
}

/// Classification of a build failure, carried on error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum FailureKind {
    /// The actor could not reach a position to place from.
    NavigationFailure,
    /// The required item is not held and cannot be obtained.
    SupplyFailure,
    /// The placed block does not match the desired state.
    PlacementMismatch,
    /// A removal found nothing to remove.
    RemovalTargetMissing,
    /// The block could not be broken.
    RemovalFailure,
    /// No reference block can be used to place from where the actor stands.
    PlacementUnavailable,
    /// A failure outside a single action; the build stops regardless of policy.
    Fatal,
}

impl FailureKind {
    /// Whether this failure ends the build regardless of the error policy.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }
}

impl core::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::NavigationFailure => "navigation failure",
            Self::SupplyFailure => "supply failure",
            Self::PlacementMismatch => "placement mismatch",
            Self::RemovalTargetMissing => "removal target missing",
            Self::RemovalFailure => "removal failure",
            Self::PlacementUnavailable => "placement unavailable",
            Self::Fatal => "fatal engine error",
        };
        f.write_str(name)
    }
}

/// Progress of a build, derived from the live action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProgressSnapshot {
    /// Actions completed by this build.
    pub completed: u32,
    /// Actions still outstanding.
    pub remaining: u32,
    /// Target cells given up on by the caller.
    pub abandoned: u32,
}

impl ProgressSnapshot {
    /// Completed share of all known actions, in `0.0..=1.0`.
    ///
    /// An empty build counts as fully done.
    pub fn fraction(&self) -> f64 {
        let total = u64::from(self.completed).saturating_add(u64::from(self.remaining));
        if total == 0 {
            return 1.0;
        }
        f64::from(self.completed) / f64::from(u32::try_from(total).unwrap_or(u32::MAX))
    }

    /// Whether nothing remains to be done.
    pub const fn is_done(&self) -> bool {
        self.remaining == 0
    }
}

/// Something an observer may want to know about a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuildEvent {
    /// An action completed and was verified.
    Progress {
        /// Progress right after the completion.
        snapshot: ProgressSnapshot,
    },
    /// The build entered the paused state.
    Paused,
    /// The build left the paused state.
    Resumed,
    /// The build was cancelled.
    Cancelled,
    /// Every target cell matches the plan.
    Finished,
    /// Actions remain but none can be performed right now.
    Stalled {
        /// Outstanding actions.
        remaining: u32,
    },
    /// A failure, published before any pause or cancel it causes.
    Error {
        /// Failure class.
        kind: FailureKind,
        /// Human-readable cause.
        message: String,
        /// Target cell of the failed action, if any.
        position: Option<BlockPos>,
    },
}

/// A [`BuildEvent`] stamped with its build and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuildEventRecord {
    /// Build that produced the event.
    pub build_id: BuildId,
    /// When it was published.
    pub at: DateTime<Utc>,
    /// The event itself.
    pub event: BuildEvent,
}

/// How a drive loop ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuildOutcome {
    /// All target cells match the plan.
    Finished,
    /// Actions remain but none is currently performable.
    Stalled {
        /// Outstanding actions.
        remaining: u32,
    },
    /// The build was cancelled.
    Cancelled,
}
