//! The plan store: one desired block state per position.
//!
//! A [`Plan`] is fixed once built. It keeps the caller's ordering, which the
//! engine uses as the final tie-break when two actions are equally close.

use std::collections::BTreeMap;

use mason_types::{BlockPos, BlockState, ItemId};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// A position together with the block state the structure wants there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCell {
    /// Cell position.
    pub position: BlockPos,
    /// Desired end state. `air` means the cell must be cleared.
    pub state: BlockState,
    /// Item used to place the block.
    pub item: ItemId,
}

impl TargetCell {
    /// A cell placed with the item named after its block.
    pub fn new(position: BlockPos, state: BlockState) -> Self {
        let item = ItemId::new(state.name.clone());
        Self {
            position,
            state,
            item,
        }
    }

    /// A cell that must end up empty.
    pub fn cleared(position: BlockPos) -> Self {
        Self::new(position, BlockState::air())
    }

    /// Use a different item than the block name (e.g. `redstone` for
    /// `redstone_wire`).
    #[must_use]
    pub fn with_item(mut self, item: ItemId) -> Self {
        self.item = item;
        self
    }
}

/// Immutable, position-keyed list of target cells.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    cells: Vec<TargetCell>,
    by_position: BTreeMap<BlockPos, usize>,
}

impl Plan {
    /// Build a plan, rejecting duplicate positions.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicatePosition`] if two cells share a
    /// position and [`PlanError::TooLarge`] if the cell count does not fit
    /// a `u32` action index.
    pub fn new(cells: Vec<TargetCell>) -> Result<Self, PlanError> {
        if u32::try_from(cells.len()).is_err() {
            return Err(PlanError::TooLarge(cells.len()));
        }
        let mut by_position = BTreeMap::new();
        for (index, cell) in cells.iter().enumerate() {
            if by_position.insert(cell.position, index).is_some() {
                return Err(PlanError::DuplicatePosition(cell.position));
            }
        }
        Ok(Self { cells, by_position })
    }

    /// Number of target cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the plan has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Target cell at `position`, if the plan covers it.
    pub fn get(&self, position: BlockPos) -> Option<&TargetCell> {
        self.by_position
            .get(&position)
            .and_then(|&index| self.cells.get(index))
    }

    /// Plan index of the cell at `position`.
    pub fn index_of(&self, position: BlockPos) -> Option<usize> {
        self.by_position.get(&position).copied()
    }

    /// Cells in plan order.
    pub fn cells(&self) -> &[TargetCell] {
        &self.cells
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stone_at(x: i32) -> TargetCell {
        TargetCell::new(BlockPos::new(x, 0, 0), BlockState::new("stone"))
    }

    #[test]
    fn plan_preserves_order_and_lookup() {
        let plan = Plan::new(vec![stone_at(2), stone_at(0), stone_at(1)]).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.index_of(BlockPos::new(0, 0, 0)), Some(1));
        assert_eq!(
            plan.cells().first().map(|c| c.position),
            Some(BlockPos::new(2, 0, 0))
        );
        assert!(plan.get(BlockPos::new(5, 0, 0)).is_none());
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let result = Plan::new(vec![stone_at(0), stone_at(0)]);
        assert_eq!(
            result.err(),
            Some(PlanError::DuplicatePosition(BlockPos::new(0, 0, 0)))
        );
    }

    #[test]
    fn item_defaults_to_block_name() {
        let cell = stone_at(0);
        assert_eq!(cell.item, ItemId::new("stone"));
        let wire = TargetCell::new(BlockPos::new(0, 0, 0), BlockState::new("redstone_wire"))
            .with_item(ItemId::new("redstone"));
        assert_eq!(wire.item.as_str(), "redstone");
    }

    #[test]
    fn empty_plan_is_valid() {
        let plan = Plan::new(Vec::new()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn cells_deserialize_from_json() {
        let json = r#"{
            "position": { "x": 1, "y": 2, "z": 3 },
            "state": { "name": "oak_stairs", "properties": { "facing": "east" } },
            "item": "oak_stairs"
        }"#;
        let cell: TargetCell = serde_json::from_str(json).unwrap();
        assert_eq!(cell.position, BlockPos::new(1, 2, 3));
        assert_eq!(cell.state.property("facing"), Some("east"));
        assert_eq!(cell.item, ItemId::new("oak_stairs"));
    }

    #[test]
    fn cleared_cell_targets_air() {
        let cell = TargetCell::cleared(BlockPos::new(0, 0, 0));
        assert!(cell.state.is_air());
    }
}
