//! Block states, observed blocks, and item identifiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::BlockPos;

/// Name of the empty block state.
pub const AIR: &str = "air";

/// Identifier of an inventory item (for example `"stone"` or `"oak_planks"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ItemId(pub String);

impl ItemId {
    /// Create an item identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A block type together with its state properties.
///
/// Two states are equal only when the name and every property match, so a
/// bottom slab and a top slab of the same material are different states.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BlockState {
    /// Block type name, e.g. `"stone"` or `"oak_stairs"`.
    pub name: String,
    /// State properties such as `facing`, `half`, `type` or `axis`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    /// A state with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// The empty state.
    pub fn air() -> Self {
        Self::new(AIR)
    }

    /// Builder-style property setter.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether this is the empty state.
    pub fn is_air(&self) -> bool {
        self.name == AIR
    }

    /// Look up a property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The vertical half this state occupies.
    ///
    /// Stairs and trapdoors use the `half` property, slabs use `type`.
    pub fn half(&self) -> Option<Half> {
        self.property("half")
            .or_else(|| self.property("type"))
            .and_then(Half::from_property)
    }
}

impl core::fmt::Display for BlockState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)?;
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "[{}]", props.join(","))?;
        }
        Ok(())
    }
}

/// Vertical half of a cell targeted by a half-height placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Half {
    /// Upper half (`top`).
    Top,
    /// Lower half (`bottom`).
    Bottom,
}

impl Half {
    /// Parse the `half`/`type` property value. Values such as `double` or
    /// `upper` do not select a half and yield `None`.
    pub fn from_property(value: &str) -> Option<Self> {
        match value {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Collision shape of an observed block, used to decide whether it can
/// support a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BoundingBox {
    /// Full solid cube.
    Block,
    /// No collision (air, flowers, torches, fluids).
    Empty,
}

/// A block as observed in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Block {
    /// Where the block is.
    pub position: BlockPos,
    /// Its current state.
    pub state: BlockState,
    /// Its collision shape.
    pub bounding_box: BoundingBox,
}

impl Block {
    /// Whether another block can be placed against this one.
    pub fn is_solid(&self) -> bool {
        self.bounding_box == BoundingBox::Block && !self.state.is_air()
    }

    /// Block type name.
    pub fn name(&self) -> &str {
        &self.state.name
    }
}
