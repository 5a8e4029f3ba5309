//! The demo site: a stone floor with some clutter, and a small hut to build
//! on it.

use mason_types::{BlockPos, BlockState};
use mason_world::{GridWorld, Plan, PlanError, TargetCell};

/// Half-width of the floor around the origin.
const FLOOR_RADIUS: i32 = 8;

/// Lay out the floor, a dirt block in the way of the hut, and a stray
/// boulder that the plan clears.
pub fn prepare_site(world: &GridWorld) {
    world.fill_layer(
        (FLOOR_RADIUS.saturating_neg(), FLOOR_RADIUS.saturating_neg()),
        (FLOOR_RADIUS, FLOOR_RADIUS),
        0,
        &BlockState::new("stone"),
    );
    world.set_block(BlockPos::new(2, 1, 2), BlockState::new("dirt"));
    world.set_block(BlockPos::new(-3, 1, -3), BlockState::new("cobblestone"));
}

/// A 3x3 hut: plank walls two blocks high around an empty middle, a
/// slab roof, and a torch on the floor inside.
pub fn hut_plan() -> Result<Plan, PlanError> {
    let mut cells = Vec::new();
    for y in 1..=2 {
        for x in 0..=2 {
            for z in 0..=2 {
                if x == 1 && z == 1 {
                    continue;
                }
                // Doorway on the north side.
                if x == 1 && z == 0 {
                    continue;
                }
                cells.push(TargetCell::new(
                    BlockPos::new(x, y, z),
                    BlockState::new("oak_planks"),
                ));
            }
        }
    }
    for x in 0..=2 {
        for z in 0..=2 {
            cells.push(TargetCell::new(
                BlockPos::new(x, 3, z),
                BlockState::new("oak_slab").with_property("type", "bottom"),
            ));
        }
    }
    cells.push(TargetCell::new(BlockPos::new(1, 1, 1), BlockState::new("torch")));
    cells.push(TargetCell::cleared(BlockPos::new(-3, 1, -3)));
    Plan::new(cells)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mason_types::ActionKind;
    use mason_world::WorldView;

    use super::*;

    #[test]
    fn hut_plan_is_valid() {
        let plan = hut_plan().unwrap();
        // 7 wall cells per layer, 9 roof slabs, torch, cleared boulder.
        assert_eq!(plan.len(), 7 * 2 + 9 + 2);
    }

    #[test]
    fn site_needs_clearing_and_building() {
        let world = GridWorld::new();
        prepare_site(&world);
        let plan = hut_plan().unwrap();

        let dirt_spot = plan.get(BlockPos::new(2, 1, 2)).unwrap();
        let current = world.state_at(dirt_spot.position).unwrap();
        assert_eq!(
            ActionKind::between(&current, &dirt_spot.state),
            Some(ActionKind::Remove)
        );
        let boulder = plan.get(BlockPos::new(-3, 1, -3)).unwrap();
        assert!(boulder.state.is_air());
    }
}
