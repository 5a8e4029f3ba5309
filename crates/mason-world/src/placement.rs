//! Placement rules: which neighbours a block may be placed against and how
//! the actor must look to get the desired orientation.
//!
//! The full per-block tables belong to the game data; [`StandardRules`]
//! covers the common families (axis blocks, slabs, stairs, torches,
//! directional blocks) and callers can provide their own [`PlacementRules`].

use mason_types::{BlockState, Face};
use serde::{Deserialize, Serialize};

/// Look direction the actor needs while placing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Orientation {
    /// Direction the actor must face, if the resulting state depends on it.
    pub facing: Option<Face>,
    /// Whether `facing` is a full 3D direction (up/down allowed) rather than
    /// a horizontal cardinal.
    pub is_3d: bool,
}

/// Orientation tables consulted by the availability resolver.
pub trait PlacementRules: Send + Sync {
    /// Directions, seen from the target cell, in which a reference block may
    /// sit so that placing against it yields `state`.
    fn allowed_faces(&self, state: &BlockState) -> Vec<Face>;

    /// How the actor must look to obtain `state`.
    fn orientation(&self, state: &BlockState) -> Orientation;
}

/// Blocks that place their `facing` toward the actor rather than away.
const FACES_ACTOR: &[&str] = &[
    "furnace",
    "blast_furnace",
    "smoker",
    "chest",
    "trapped_chest",
    "ender_chest",
    "barrel",
    "dispenser",
    "dropper",
    "piston",
    "sticky_piston",
    "carved_pumpkin",
    "jack_o_lantern",
    "loom",
    "lectern",
    "stonecutter",
];

/// Blocks whose `facing` may point up or down.
const FACING_3D: &[&str] = &[
    "dispenser",
    "dropper",
    "observer",
    "piston",
    "sticky_piston",
    "barrel",
];

/// Blocks that react to a plain right click; placing against one requires
/// sneaking.
const INTERACTABLE: &[&str] = &[
    "chest",
    "trapped_chest",
    "ender_chest",
    "barrel",
    "crafting_table",
    "furnace",
    "blast_furnace",
    "smoker",
    "anvil",
    "enchanting_table",
    "brewing_stand",
    "hopper",
    "dispenser",
    "dropper",
    "lever",
    "note_block",
    "repeater",
    "comparator",
    "daylight_detector",
    "beacon",
    "cartography_table",
    "smithing_table",
    "grindstone",
    "stonecutter",
    "loom",
    "lectern",
    "bell",
    "jukebox",
];

/// Name suffixes of interactable block families.
const INTERACTABLE_SUFFIXES: &[&str] = &["_door", "_trapdoor", "_fence_gate", "_button", "_bed", "shulker_box"];

/// Whether placing against a block named `name` needs the actor to sneak.
pub fn requires_sneak(name: &str) -> bool {
    INTERACTABLE.contains(&name)
        || INTERACTABLE_SUFFIXES
            .iter()
            .any(|suffix| name.ends_with(suffix))
}

/// Default placement rules for common block families.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl PlacementRules for StandardRules {
    fn allowed_faces(&self, state: &BlockState) -> Vec<Face> {
        // Upper halves of doors and tall plants appear with their lower half.
        if state.property("half") == Some("upper") {
            return Vec::new();
        }

        if let Some(axis) = state.property("axis") {
            return match axis {
                "x" => vec![Face::West, Face::East],
                "z" => vec![Face::North, Face::South],
                _ => vec![Face::Down, Face::Up],
            };
        }

        if state.name.contains("wall_") {
            return state
                .property("facing")
                .and_then(Face::from_property)
                .map(|facing| vec![facing.opposite()])
                .unwrap_or_default();
        }

        if state.name.ends_with("torch") {
            return vec![Face::Down];
        }

        match state.property("half").or_else(|| state.property("type")) {
            Some("top") => Face::ALL
                .into_iter()
                .filter(|&face| face != Face::Down)
                .collect(),
            Some("bottom") => Face::ALL
                .into_iter()
                .filter(|&face| face != Face::Up)
                .collect(),
            _ => Face::ALL.to_vec(),
        }
    }

    fn orientation(&self, state: &BlockState) -> Orientation {
        if state.name.contains("wall_") {
            return Orientation::default();
        }
        let Some(facing) = state.property("facing").and_then(Face::from_property) else {
            return Orientation::default();
        };
        let is_3d = FACING_3D.contains(&state.name.as_str());
        let look = if FACES_ACTOR.contains(&state.name.as_str()) {
            facing.opposite()
        } else {
            facing
        };
        Orientation {
            facing: Some(look),
            is_3d,
        }
    }
}
