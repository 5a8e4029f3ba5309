//! In-memory actor for tests and the demo binary.
//!
//! [`SandboxBot`] implements every actor collaborator directly on a
//! [`GridWorld`]: it teleports instead of path finding, and a placement sets
//! the cell immediately. [`SandboxStorage`] adds chests for restocking.
//! Both share a [`SandboxInventory`], which can be handed to another task
//! to top up items while a build is running.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mason_types::{Block, BlockPos, BlockState, Face, ItemId, Vec3};
use mason_world::{GridWorld, PlacementGoal, WorldError, WorldView};
use parking_lot::Mutex;
use tracing::trace;

use crate::collaborators::{
    BlockInteractor, CollaboratorError, Container, MaterialSupplier, Navigator, PlaceOptions,
    Storage, ToolSelector,
};

/// Distance from the target searched for a standing cell.
const SEARCH_RADIUS: i32 = 5;

/// Default number of distinct item kinds kept before clearing the inventory.
pub const DEFAULT_CAPACITY: usize = 30;

/// How missing items are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyMode {
    /// Any item can be conjured. The inventory is cleared first when it
    /// already holds `capacity` distinct kinds.
    Unrestricted {
        /// Distinct item kinds kept before clearing.
        capacity: usize,
    },
    /// Only items actually held can be used.
    Restricted,
}

impl Default for SupplyMode {
    fn default() -> Self {
        Self::Unrestricted {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
struct InventoryState {
    items: BTreeMap<ItemId, u32>,
    held: Option<ItemId>,
}

/// Item counts and the held item, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct SandboxInventory {
    state: Arc<Mutex<InventoryState>>,
    mode: SupplyMode,
}

impl SandboxInventory {
    /// An empty inventory.
    pub fn new(mode: SupplyMode) -> Self {
        Self {
            state: Arc::default(),
            mode,
        }
    }

    /// Add `count` of `item`.
    pub fn give(&self, item: &ItemId, count: u32) {
        let mut state = self.state.lock();
        let entry = state.items.entry(item.clone()).or_default();
        *entry = entry.saturating_add(count);
    }

    /// How many of `item` are carried.
    pub fn count(&self, item: &ItemId) -> u32 {
        self.state.lock().items.get(item).copied().unwrap_or(0)
    }

    /// The item in hand.
    pub fn held(&self) -> Option<ItemId> {
        self.state.lock().held.clone()
    }

    /// Number of distinct item kinds carried.
    pub fn kinds(&self) -> usize {
        self.state.lock().items.len()
    }

    fn equip(&self, item: &ItemId) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock();
        let carried = state.items.get(item).copied().unwrap_or(0);
        if carried == 0 {
            let SupplyMode::Unrestricted { capacity } = self.mode else {
                return Err(CollaboratorError::MissingItem { item: item.clone() });
            };
            if state.items.len() >= capacity {
                trace!(kinds = state.items.len(), "Sandbox inventory full, clearing");
                state.items.clear();
            }
            state.items.insert(item.clone(), 1);
        }
        state.held = Some(item.clone());
        Ok(())
    }

    /// Use up one of the held item. Returns it, or `None` if the hand is
    /// empty.
    fn consume_held(&self) -> Option<ItemId> {
        let mut state = self.state.lock();
        let item = state.held.clone()?;
        let remaining = match state.items.get_mut(&item) {
            Some(count) if *count > 0 => {
                *count = count.saturating_sub(1);
                *count
            }
            _ => return None,
        };
        if remaining == 0 {
            state.items.remove(&item);
            state.held = None;
        }
        Some(item)
    }
}

/// One collaborator call recorded by the sandbox.
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxCall {
    /// Moved to stand in `feet`.
    Goto {
        /// Chosen standing cell.
        feet: BlockPos,
    },
    /// Equipped an item.
    Equip(ItemId),
    /// Equipped a tool for the named block.
    EquipTool(String),
    /// Looked at a point.
    LookAt(Vec3),
    /// Changed stance.
    Sneak(bool),
    /// Placed into `position` against `reference`.
    Place {
        /// Cell filled.
        position: BlockPos,
        /// Block clicked.
        reference: BlockPos,
        /// Face clicked.
        face: Face,
    },
    /// Broke the block at a position.
    Dig(BlockPos),
    /// Withdrew items from a container.
    Withdraw {
        /// Item taken.
        item: ItemId,
        /// Amount taken.
        count: u32,
    },
}

type Journal = Arc<Mutex<Vec<SandboxCall>>>;

fn disconnected(err: &WorldError) -> CollaboratorError {
    CollaboratorError::Disconnected {
        reason: err.to_string(),
    }
}

/// An actor living directly in a [`GridWorld`].
#[derive(Debug)]
pub struct SandboxBot {
    world: Arc<GridWorld>,
    position: Vec3,
    inventory: SandboxInventory,
    journal: Journal,
    sneaking: bool,
    navigation_blocked: bool,
    placed_states: BTreeMap<ItemId, BlockState>,
}

impl SandboxBot {
    /// A bot with its feet at `position` and an unrestricted inventory.
    pub fn new(world: Arc<GridWorld>, position: Vec3) -> Self {
        Self {
            world,
            position,
            inventory: SandboxInventory::default(),
            journal: Journal::default(),
            sneaking: false,
            navigation_blocked: false,
            placed_states: BTreeMap::new(),
        }
    }

    /// Use `inventory` instead of the default one.
    #[must_use]
    pub fn with_inventory(mut self, inventory: SandboxInventory) -> Self {
        self.inventory = inventory;
        self
    }

    /// Make every navigation request fail.
    #[must_use]
    pub const fn with_navigation_blocked(mut self) -> Self {
        self.navigation_blocked = true;
        self
    }

    /// Placing `item` yields `state` instead of the block named after it.
    #[must_use]
    pub fn with_placed_state(mut self, item: ItemId, state: BlockState) -> Self {
        self.placed_states.insert(item, state);
        self
    }

    /// A handle to the bot's inventory.
    pub fn inventory(&self) -> SandboxInventory {
        self.inventory.clone()
    }

    /// Every call made so far, in order.
    pub fn journal(&self) -> Vec<SandboxCall> {
        self.journal.lock().clone()
    }

    /// Whether the bot is sneaking.
    pub const fn is_sneaking(&self) -> bool {
        self.sneaking
    }

    fn record(&self, call: SandboxCall) {
        trace!(?call, "Sandbox call");
        self.journal.lock().push(call);
    }

    fn is_air(&self, position: BlockPos) -> Result<bool, CollaboratorError> {
        Ok(self
            .world
            .block_at(position)
            .map_err(|e| disconnected(&e))?
            .is_none_or(|block| block.state.is_air()))
    }

    fn can_stand(&self, feet: BlockPos) -> Result<bool, CollaboratorError> {
        let ground = self
            .world
            .block_at(feet.offset(0, -1, 0))
            .map_err(|e| disconnected(&e))?
            .is_some_and(|block| block.is_solid());
        Ok(ground && self.is_air(feet)? && self.is_air(feet.offset(0, 1, 0))?)
    }
}

#[async_trait]
impl Navigator for SandboxBot {
    fn position(&self) -> Vec3 {
        self.position
    }

    async fn goto(&mut self, goal: &PlacementGoal) -> Result<(), CollaboratorError> {
        if self.navigation_blocked {
            return Err(CollaboratorError::Unreachable {
                reason: format!("path to {} is blocked", goal.target),
            });
        }
        let mut best: Option<(f64, BlockPos)> = None;
        let span = SEARCH_RADIUS.saturating_neg()..=SEARCH_RADIUS;
        for dx in span.clone() {
            for dy in span.clone() {
                for dz in span.clone() {
                    let feet = goal.target.offset(dx, dy, dz);
                    if !goal.is_end(feet) || !self.can_stand(feet)? {
                        continue;
                    }
                    let distance = feet.corner().distance_squared(self.position);
                    if best.is_none_or(|(d, _)| distance < d) {
                        best = Some((distance, feet));
                    }
                }
            }
        }
        let Some((_, feet)) = best else {
            return Err(CollaboratorError::Unreachable {
                reason: format!("no standing position near {}", goal.target),
            });
        };
        self.position = feet.corner().offset(0.5, 0.0, 0.5);
        self.record(SandboxCall::Goto { feet });
        Ok(())
    }
}

#[async_trait]
impl MaterialSupplier for SandboxBot {
    async fn equip_item(&mut self, item: &ItemId) -> Result<(), CollaboratorError> {
        self.inventory.equip(item)?;
        self.record(SandboxCall::Equip(item.clone()));
        Ok(())
    }
}

#[async_trait]
impl ToolSelector for SandboxBot {
    async fn equip_for_block(&mut self, block: &Block) -> Result<(), CollaboratorError> {
        self.record(SandboxCall::EquipTool(block.name().to_owned()));
        Ok(())
    }
}

#[async_trait]
impl BlockInteractor for SandboxBot {
    async fn look_at(&mut self, point: Vec3) {
        self.record(SandboxCall::LookAt(point));
    }

    async fn set_sneak(&mut self, sneaking: bool) -> Result<(), CollaboratorError> {
        self.sneaking = sneaking;
        self.record(SandboxCall::Sneak(sneaking));
        Ok(())
    }

    async fn place_against(
        &mut self,
        reference: &Block,
        face: Face,
        _options: &PlaceOptions,
    ) -> Result<(), CollaboratorError> {
        let position = reference.position.neighbor(face);
        if !self.is_air(position)? {
            return Err(CollaboratorError::Rejected {
                reason: format!("cell {position} is occupied"),
            });
        }
        let Some(item) = self.inventory.consume_held() else {
            return Err(CollaboratorError::Rejected {
                reason: String::from("nothing in hand"),
            });
        };
        let state = self
            .placed_states
            .get(&item)
            .cloned()
            .unwrap_or_else(|| BlockState::new(item.as_str()));
        self.world.set_block(position, state);
        self.record(SandboxCall::Place {
            position,
            reference: reference.position,
            face,
        });
        Ok(())
    }

    async fn dig(&mut self, block: &Block) -> Result<(), CollaboratorError> {
        self.world.remove_block(block.position);
        self.record(SandboxCall::Dig(block.position));
        Ok(())
    }
}

/// Chests and inventory used for restocking in the sandbox.
#[derive(Debug)]
pub struct SandboxStorage {
    inventory: SandboxInventory,
    chests: BTreeMap<BlockPos, BTreeMap<ItemId, u32>>,
    journal: Journal,
}

impl SandboxStorage {
    /// Storage drawing into `inventory`.
    pub fn new(inventory: SandboxInventory) -> Self {
        Self {
            inventory,
            chests: BTreeMap::new(),
            journal: Journal::default(),
        }
    }

    /// Put `count` of `item` into the chest at `position`.
    pub fn stock(&mut self, position: BlockPos, item: &ItemId, count: u32) {
        let entry = self
            .chests
            .entry(position)
            .or_default()
            .entry(item.clone())
            .or_default();
        *entry = entry.saturating_add(count);
    }

    /// How many of `item` the chest at `position` holds.
    pub fn chest_count(&self, position: BlockPos, item: &ItemId) -> u32 {
        self.chests
            .get(&position)
            .and_then(|contents| contents.get(item))
            .copied()
            .unwrap_or(0)
    }

    /// Every call made so far, in order.
    pub fn journal(&self) -> Vec<SandboxCall> {
        self.journal.lock().clone()
    }
}

#[async_trait]
impl Storage for SandboxStorage {
    fn held_count(&self, item: &ItemId) -> u32 {
        self.inventory.count(item)
    }

    async fn open_container(
        &mut self,
        block: &Block,
    ) -> Result<Box<dyn Container + '_>, CollaboratorError> {
        let contents = self.chests.entry(block.position).or_default();
        Ok(Box::new(SandboxContainer {
            contents,
            inventory: self.inventory.clone(),
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct SandboxContainer<'a> {
    contents: &'a mut BTreeMap<ItemId, u32>,
    inventory: SandboxInventory,
    journal: Journal,
}

#[async_trait]
impl<'a> Container for SandboxContainer<'a> {
    async fn withdraw(&mut self, item: &ItemId, count: u32) -> Result<(), CollaboratorError> {
        let stocked = self.contents.get(item).copied().unwrap_or(0);
        if stocked < count {
            return Err(CollaboratorError::MissingItem { item: item.clone() });
        }
        self.contents.insert(item.clone(), stocked.saturating_sub(count));
        self.inventory.give(item, count);
        self.journal.lock().push(SandboxCall::Withdraw {
            item: item.clone(),
            count,
        });
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mason_world::ReferenceCandidate;

    use super::*;

    fn floor() -> Arc<GridWorld> {
        let world = Arc::new(GridWorld::new());
        world.fill_layer((-6, -6), (6, 6), 0, &BlockState::new("stone"));
        world
    }

    fn goal(target: BlockPos) -> PlacementGoal {
        PlacementGoal {
            target,
            candidates: vec![ReferenceCandidate {
                reference: target.neighbor(Face::Down),
                face: Face::Up,
            }],
            facing: None,
            facing_3d: false,
            half: None,
            reach: 4.5,
        }
    }

    #[test]
    fn unrestricted_supply_conjures_items() {
        let inventory = SandboxInventory::new(SupplyMode::Unrestricted { capacity: 2 });
        inventory.equip(&ItemId::new("stone")).unwrap();
        inventory.equip(&ItemId::new("dirt")).unwrap();
        assert_eq!(inventory.kinds(), 2);

        inventory.equip(&ItemId::new("glass")).unwrap();
        assert_eq!(inventory.kinds(), 1);
        assert_eq!(inventory.held(), Some(ItemId::new("glass")));
    }

    #[test]
    fn restricted_supply_needs_stock() {
        let inventory = SandboxInventory::new(SupplyMode::Restricted);
        let stone = ItemId::new("stone");
        assert!(matches!(
            inventory.equip(&stone),
            Err(CollaboratorError::MissingItem { .. })
        ));

        inventory.give(&stone, 1);
        inventory.equip(&stone).unwrap();
        assert_eq!(inventory.consume_held(), Some(stone.clone()));
        assert_eq!(inventory.count(&stone), 0);
        assert_eq!(inventory.held(), None);
    }

    #[tokio::test]
    async fn goto_picks_the_nearest_standing_cell() {
        let world = floor();
        let mut bot = SandboxBot::new(Arc::clone(&world), Vec3::new(-5.5, 1.0, 0.5));
        let target = BlockPos::new(3, 1, 0);

        bot.goto(&goal(target)).await.unwrap();
        let feet = bot.position().floored();
        assert!(goal(target).is_end(feet));
        assert!(feet.x < target.x);
    }

    #[tokio::test]
    async fn blocked_navigation_fails() {
        let mut bot = SandboxBot::new(floor(), Vec3::new(0.5, 1.0, 0.5)).with_navigation_blocked();
        let err = bot.goto(&goal(BlockPos::new(3, 1, 0))).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn placement_fills_the_neighbouring_cell() {
        let world = floor();
        let mut bot = SandboxBot::new(Arc::clone(&world), Vec3::new(0.5, 1.0, 0.5));
        let reference = world.block_at(BlockPos::new(2, 0, 0)).unwrap().unwrap();

        bot.equip_item(&ItemId::new("oak_planks")).await.unwrap();
        let options = PlaceOptions {
            half: None,
            delta: Vec3::new(0.5, 1.0, 0.5),
            facing: None,
        };
        bot.place_against(&reference, Face::Up, &options).await.unwrap();

        assert_eq!(
            world.state_at(BlockPos::new(2, 1, 0)).unwrap(),
            BlockState::new("oak_planks")
        );
        let err = bot.place_against(&reference, Face::Up, &options).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected { .. }));
    }

    #[tokio::test]
    async fn containers_move_items_into_the_inventory() {
        let inventory = SandboxInventory::new(SupplyMode::Restricted);
        let mut storage = SandboxStorage::new(inventory.clone());
        let chest_pos = BlockPos::new(0, 1, 0);
        let stone = ItemId::new("stone");
        storage.stock(chest_pos, &stone, 5);

        let chest = Block {
            position: chest_pos,
            state: BlockState::new("chest"),
            bounding_box: mason_types::BoundingBox::Block,
        };
        let mut container = storage.open_container(&chest).await.unwrap();
        container.withdraw(&stone, 3).await.unwrap();
        assert!(container.withdraw(&stone, 3).await.is_err());
        container.close().await.unwrap();

        assert_eq!(inventory.count(&stone), 3);
        assert_eq!(storage.chest_count(chest_pos, &stone), 2);
    }
}
