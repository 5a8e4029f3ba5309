//! Pending actions derived from the difference between plan and world.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::block::{BlockState, ItemId};
use crate::geometry::BlockPos;

/// The operation needed to reconcile one cell with its target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionKind {
    /// Put the desired block into an empty cell.
    Place,
    /// Break whatever occupies the cell.
    Remove,
}

impl ActionKind {
    /// Decide which operation reconciles `current` with `desired`.
    ///
    /// Returns `None` when the cell already matches. A cell holding some
    /// other block has to be cleared first; the placement is derived again
    /// once the cell reads as empty.
    pub fn between(current: &BlockState, desired: &BlockState) -> Option<Self> {
        if current == desired {
            return None;
        }
        if current.is_air() {
            Some(Self::Place)
        } else {
            Some(Self::Remove)
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Place => f.write_str("place"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// One outstanding operation on one target cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PendingAction {
    /// Target cell.
    pub position: BlockPos,
    /// Place or remove.
    pub kind: ActionKind,
    /// End state the plan wants at `position`.
    pub desired: BlockState,
    /// State observed at `position` when the action was derived.
    pub current: BlockState,
    /// Item to place with. `None` for removals.
    pub item: Option<ItemId>,
    /// Index of the target cell in plan order, used as the stable tie-break.
    pub plan_index: u32,
}
