//! Read access to the live world, plus an in-memory grid implementation.
//!
//! The engine only ever reads the world through [`WorldView`]; changes come
//! from the actor's own placements and digs, or from anything else sharing
//! the world. [`GridWorld`] is a thread-safe grid used by the sandbox actor
//! and by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use mason_types::{Block, BlockPos, BlockState, BoundingBox};
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::error::WorldError;

/// Block names that occupy a cell without a solid collision box.
const NON_SOLID: &[&str] = &[
    "air",
    "water",
    "lava",
    "torch",
    "wall_torch",
    "redstone_wire",
    "grass",
    "short_grass",
    "tall_grass",
    "dandelion",
    "poppy",
    "snow",
    "rail",
];

/// Collision shape a freshly set block of `state` gets in a [`GridWorld`].
pub fn default_bounding_box(state: &BlockState) -> BoundingBox {
    if NON_SOLID.contains(&state.name.as_str()) {
        BoundingBox::Empty
    } else {
        BoundingBox::Block
    }
}

/// Read-only view of the world.
pub trait WorldView: Send + Sync {
    /// The block at `position`, or `None` if the cell is empty.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be observed.
    fn block_at(&self, position: BlockPos) -> Result<Option<Block>, WorldError>;

    /// The state at `position`, reading an empty cell as `air`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be observed.
    fn state_at(&self, position: BlockPos) -> Result<BlockState, WorldError> {
        Ok(self
            .block_at(position)?
            .map_or_else(BlockState::air, |block| block.state))
    }
}

/// In-memory world backed by a sorted map of non-empty cells.
///
/// Only the rows in `min_y..=max_y` are loaded; reads outside them fail
/// with [`WorldError::NotLoaded`]. A new world loads every row.
#[derive(Debug)]
pub struct GridWorld {
    blocks: RwLock<BTreeMap<BlockPos, Block>>,
    disconnected: AtomicBool,
    min_y: i32,
    max_y: i32,
}

impl Default for GridWorld {
    fn default() -> Self {
        Self {
            blocks: RwLock::default(),
            disconnected: AtomicBool::new(false),
            min_y: i32::MIN,
            max_y: i32::MAX,
        }
    }
}

impl GridWorld {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the loaded rows to `min_y..=max_y`.
    #[must_use]
    pub const fn with_height_limits(mut self, min_y: i32, max_y: i32) -> Self {
        self.min_y = min_y;
        self.max_y = max_y;
        self
    }

    /// Whether reads at `position` are served.
    pub const fn is_loaded(&self, position: BlockPos) -> bool {
        position.y >= self.min_y && position.y <= self.max_y
    }

    /// Set the state at `position`; setting `air` clears the cell.
    pub fn set_block(&self, position: BlockPos, state: BlockState) {
        let bounding_box = default_bounding_box(&state);
        self.set_block_with_box(position, state, bounding_box);
    }

    /// Set the state and collision shape at `position`.
    pub fn set_block_with_box(
        &self,
        position: BlockPos,
        state: BlockState,
        bounding_box: BoundingBox,
    ) {
        trace!(%position, %state, "Grid cell set");
        let mut blocks = self.blocks.write();
        if state.is_air() {
            blocks.remove(&position);
        } else {
            blocks.insert(
                position,
                Block {
                    position,
                    state,
                    bounding_box,
                },
            );
        }
    }

    /// Clear the cell at `position`. Returns the block that was there.
    pub fn remove_block(&self, position: BlockPos) -> Option<Block> {
        self.blocks.write().remove(&position)
    }

    /// Fill the horizontal square `[min, max]` at height `y` with `state`.
    pub fn fill_layer(&self, min: (i32, i32), max: (i32, i32), y: i32, state: &BlockState) {
        for x in min.0..=max.0 {
            for z in min.1..=max.1 {
                self.set_block(BlockPos::new(x, y, z), state.clone());
            }
        }
    }

    /// Number of non-empty cells.
    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }

    /// Make every subsequent read fail, as if the connection dropped.
    pub fn disconnect(&self) {
        warn!(blocks = self.block_count(), "Grid world disconnected");
        self.disconnected.store(true, Ordering::Release);
    }
}

impl WorldView for GridWorld {
    fn block_at(&self, position: BlockPos) -> Result<Option<Block>, WorldError> {
        if self.disconnected.load(Ordering::Acquire) {
            return Err(WorldError::Unavailable {
                reason: String::from("world connection closed"),
            });
        }
        if !self.is_loaded(position) {
            return Err(WorldError::NotLoaded(position));
        }
        Ok(self.blocks.read().get(&position).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_read_as_air() {
        let world = GridWorld::new();
        let pos = BlockPos::new(0, 0, 0);
        assert!(world.block_at(pos).unwrap().is_none());
        assert!(world.state_at(pos).unwrap().is_air());
    }

    #[test]
    fn set_and_clear() {
        let world = GridWorld::new();
        let pos = BlockPos::new(1, 2, 3);
        world.set_block(pos, BlockState::new("stone"));
        let block = world.block_at(pos).unwrap().unwrap();
        assert_eq!(block.name(), "stone");
        assert!(block.is_solid());

        world.set_block(pos, BlockState::air());
        assert_eq!(world.block_count(), 0);
    }

    #[test]
    fn torches_are_not_solid() {
        let world = GridWorld::new();
        let pos = BlockPos::new(0, 0, 0);
        world.set_block(pos, BlockState::new("torch"));
        assert!(!world.block_at(pos).unwrap().unwrap().is_solid());
    }

    #[test]
    fn fill_layer_covers_square() {
        let world = GridWorld::new();
        world.fill_layer((-1, -1), (1, 1), 0, &BlockState::new("grass_block"));
        assert_eq!(world.block_count(), 9);
    }

    #[test]
    fn rows_outside_the_height_limits_are_not_loaded() {
        let world = GridWorld::new().with_height_limits(-64, 319);
        let inside = BlockPos::new(0, 319, 0);
        let above = BlockPos::new(0, 320, 0);
        world.set_block(inside, BlockState::new("stone"));

        assert!(world.block_at(inside).unwrap().is_some());
        assert_eq!(world.block_at(above), Err(WorldError::NotLoaded(above)));
        assert_eq!(
            world.state_at(BlockPos::new(0, -65, 0)),
            Err(WorldError::NotLoaded(BlockPos::new(0, -65, 0)))
        );
    }

    #[test]
    fn disconnected_world_fails_reads() {
        let world = GridWorld::new();
        world.disconnect();
        assert!(matches!(
            world.block_at(BlockPos::new(0, 0, 0)),
            Err(WorldError::Unavailable { .. })
        ));
    }
}
