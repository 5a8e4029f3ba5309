//! The action queue: outstanding work derived from plan and live world.
//!
//! Nothing here is cached. Every query re-reads the world, so blocks changed
//! by anyone else between iterations are picked up, and a cell that already
//! matches its target never produces an action.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use mason_types::{ActionKind, BlockPos, ItemId, PendingAction, ProgressSnapshot};
use mason_world::{Plan, TargetCell, WorldError, WorldView};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The world still requires the action that was reported complete.
    #[error("{kind} at {position} is still required")]
    NotResolved {
        /// Target cell of the action.
        position: BlockPos,
        /// The action that is still derived there.
        kind: ActionKind,
    },

    /// Reading the world failed.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Pending actions of one build.
pub struct ActionQueue {
    plan: Plan,
    world: Arc<dyn WorldView>,
    completed: AtomicU32,
    abandoned: RwLock<BTreeSet<BlockPos>>,
}

impl core::fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionQueue")
            .field("cells", &self.plan.len())
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .field("abandoned", &self.abandoned.read().len())
            .finish_non_exhaustive()
    }
}

impl ActionQueue {
    /// A queue for `plan` observing `world`.
    pub fn new(plan: Plan, world: Arc<dyn WorldView>) -> Self {
        Self {
            plan,
            world,
            completed: AtomicU32::new(0),
            abandoned: RwLock::new(BTreeSet::new()),
        }
    }

    /// The plan this queue works through.
    pub const fn plan(&self) -> &Plan {
        &self.plan
    }

    fn derive(&self, index: usize, cell: &TargetCell) -> Result<Option<PendingAction>, WorldError> {
        let current = self.world.state_at(cell.position)?;
        let Some(kind) = ActionKind::between(&current, &cell.state) else {
            return Ok(None);
        };
        let item = match kind {
            ActionKind::Place => Some(cell.item.clone()),
            ActionKind::Remove => None,
        };
        Ok(Some(PendingAction {
            position: cell.position,
            kind,
            desired: cell.state.clone(),
            current,
            item,
            plan_index: u32::try_from(index).unwrap_or(u32::MAX),
        }))
    }

    /// Every outstanding action, in plan order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn all_pending(&self) -> Result<Vec<PendingAction>, WorldError> {
        let abandoned = self.abandoned.read().clone();
        let mut pending = Vec::new();
        for (index, cell) in self.plan.cells().iter().enumerate() {
            if abandoned.contains(&cell.position) {
                continue;
            }
            if let Some(action) = self.derive(index, cell)? {
                pending.push(action);
            }
        }
        Ok(pending)
    }

    /// The action currently derived at `position`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn pending_at(&self, position: BlockPos) -> Result<Option<PendingAction>, WorldError> {
        if self.abandoned.read().contains(&position) {
            return Ok(None);
        }
        let Some(index) = self.plan.index_of(position) else {
            return Ok(None);
        };
        let Some(cell) = self.plan.cells().get(index) else {
            return Ok(None);
        };
        self.derive(index, cell)
    }

    /// Number of outstanding actions.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn remaining_count(&self) -> Result<usize, WorldError> {
        Ok(self.all_pending()?.len())
    }

    /// Record `action` as done once the world confirms it.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotResolved`] if the same action is still
    /// derived at its position, and [`QueueError::World`] if the world
    /// cannot be read.
    pub fn complete(&self, action: &PendingAction) -> Result<(), QueueError> {
        if let Some(still) = self.pending_at(action.position)?
            && still.kind == action.kind
        {
            return Err(QueueError::NotResolved {
                position: action.position,
                kind: action.kind,
            });
        }
        let completed = self
            .completed
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        debug!(position = %action.position, kind = %action.kind, completed, "Action completed");
        Ok(())
    }

    /// Give up on the cell at `position`. Returns `false` if the plan does
    /// not cover it or it was already abandoned.
    pub fn abandon(&self, position: BlockPos) -> bool {
        if self.plan.get(position).is_none() {
            return false;
        }
        self.abandoned.write().insert(position)
    }

    /// Item totals needed by all outstanding placements.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn remaining_needed_resources(&self) -> Result<BTreeMap<ItemId, u32>, WorldError> {
        let mut needed = BTreeMap::new();
        for action in self.all_pending()? {
            if let Some(item) = action.item {
                let count: &mut u32 = needed.entry(item).or_default();
                *count = count.saturating_add(1);
            }
        }
        Ok(needed)
    }

    /// Actions completed so far.
    pub fn completed_count(&self) -> u32 {
        self.completed.load(Ordering::Acquire)
    }

    /// Progress read from the live world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn progress(&self) -> Result<ProgressSnapshot, WorldError> {
        let remaining = self.remaining_count()?;
        Ok(ProgressSnapshot {
            completed: self.completed_count(),
            remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
            abandoned: u32::try_from(self.abandoned.read().len()).unwrap_or(u32::MAX),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use mason_types::BlockState;
    use mason_world::GridWorld;

    use super::*;

    fn stone(x: i32) -> TargetCell {
        TargetCell::new(BlockPos::new(x, 1, 0), BlockState::new("stone"))
    }

    fn queue(world: &Arc<GridWorld>, cells: Vec<TargetCell>) -> ActionQueue {
        let view: Arc<dyn WorldView> = Arc::clone(world) as Arc<dyn WorldView>;
        ActionQueue::new(Plan::new(cells).unwrap(), view)
    }

    #[test]
    fn satisfied_cells_are_never_pending() {
        let world = Arc::new(GridWorld::new());
        world.set_block(BlockPos::new(1, 1, 0), BlockState::new("stone"));
        let queue = queue(&world, vec![stone(0), stone(1), stone(2)]);

        let pending = queue.all_pending().unwrap();
        let positions: Vec<_> = pending.iter().map(|a| a.position.x).collect();
        assert_eq!(positions, vec![0, 2]);
        assert_eq!(pending[0].plan_index, 0);
        assert_eq!(pending[1].plan_index, 2);
    }

    #[test]
    fn derivation_follows_world_changes() {
        let world = Arc::new(GridWorld::new());
        let queue = queue(&world, vec![stone(0)]);
        assert_eq!(queue.remaining_count().unwrap(), 1);

        world.set_block(BlockPos::new(0, 1, 0), BlockState::new("stone"));
        assert_eq!(queue.remaining_count().unwrap(), 0);
        assert!(queue.all_pending().unwrap().is_empty());
    }

    #[test]
    fn wrong_block_is_removed_before_placing() {
        let world = Arc::new(GridWorld::new());
        world.set_block(BlockPos::new(0, 1, 0), BlockState::new("dirt"));
        let queue = queue(&world, vec![stone(0)]);

        let pending = queue.all_pending().unwrap();
        assert_eq!(pending[0].kind, ActionKind::Remove);
        assert_eq!(pending[0].item, None);

        world.remove_block(BlockPos::new(0, 1, 0));
        let pending = queue.all_pending().unwrap();
        assert_eq!(pending[0].kind, ActionKind::Place);
        assert_eq!(pending[0].item, Some(ItemId::new("stone")));
    }

    #[test]
    fn cleared_cells_derive_removals() {
        let world = Arc::new(GridWorld::new());
        world.set_block(BlockPos::new(0, 1, 0), BlockState::new("dirt"));
        let queue = queue(&world, vec![TargetCell::cleared(BlockPos::new(0, 1, 0))]);
        assert_eq!(queue.all_pending().unwrap()[0].kind, ActionKind::Remove);
    }

    #[test]
    fn completion_requires_world_confirmation() {
        let world = Arc::new(GridWorld::new());
        let queue = queue(&world, vec![stone(0)]);
        let action = queue.all_pending().unwrap().remove(0);

        let err = queue.complete(&action).unwrap_err();
        assert!(matches!(err, QueueError::NotResolved { kind: ActionKind::Place, .. }));
        assert_eq!(queue.completed_count(), 0);

        world.set_block(action.position, BlockState::new("stone"));
        queue.complete(&action).unwrap();
        assert_eq!(queue.completed_count(), 1);
    }

    #[test]
    fn removal_completes_when_placement_follows() {
        let world = Arc::new(GridWorld::new());
        world.set_block(BlockPos::new(0, 1, 0), BlockState::new("dirt"));
        let queue = queue(&world, vec![stone(0)]);
        let removal = queue.all_pending().unwrap().remove(0);

        world.remove_block(removal.position);
        queue.complete(&removal).unwrap();
        assert_eq!(queue.remaining_count().unwrap(), 1);
    }

    #[test]
    fn abandoned_cells_drop_out() {
        let world = Arc::new(GridWorld::new());
        let queue = queue(&world, vec![stone(0), stone(1)]);

        assert!(queue.abandon(BlockPos::new(0, 1, 0)));
        assert!(!queue.abandon(BlockPos::new(0, 1, 0)));
        assert!(!queue.abandon(BlockPos::new(9, 9, 9)));

        let progress = queue.progress().unwrap();
        assert_eq!(progress.remaining, 1);
        assert_eq!(progress.abandoned, 1);
        assert!(queue.pending_at(BlockPos::new(0, 1, 0)).unwrap().is_none());
    }

    #[test]
    fn resources_count_only_placements() {
        let world = Arc::new(GridWorld::new());
        world.set_block(BlockPos::new(2, 1, 0), BlockState::new("dirt"));
        let planks = TargetCell::new(BlockPos::new(5, 1, 0), BlockState::new("oak_planks"));
        let queue = queue(&world, vec![stone(0), stone(1), stone(2), planks]);

        let needed = queue.remaining_needed_resources().unwrap();
        assert_eq!(needed.get(&ItemId::new("stone")), Some(&2));
        assert_eq!(needed.get(&ItemId::new("oak_planks")), Some(&1));
    }

    #[test]
    fn world_failures_propagate() {
        let world = Arc::new(GridWorld::new());
        let queue = queue(&world, vec![stone(0)]);
        world.disconnect();
        assert!(matches!(
            queue.all_pending(),
            Err(WorldError::Unavailable { .. })
        ));
    }
}
