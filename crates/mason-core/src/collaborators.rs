//! Contracts for the subsystems the engine drives but does not implement.
//!
//! A real deployment backs these with a game client: a path finder, an
//! inventory manager, the network layer that sends clicks. The engine only
//! sees the traits below. [`crate::sandbox`] provides in-memory versions.

use async_trait::async_trait;
use mason_types::{Block, Face, Half, ItemId, Vec3};
use mason_world::PlacementGoal;
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// No path leads to a position satisfying the goal.
    #[error("unreachable: {reason}")]
    Unreachable {
        /// Why the navigator gave up.
        reason: String,
    },

    /// The item is neither held nor obtainable.
    #[error("missing item `{item}`")]
    MissingItem {
        /// The requested item.
        item: ItemId,
    },

    /// No tool can break the block.
    #[error("no tool for `{block}`")]
    NoTool {
        /// Name of the block to break.
        block: String,
    },

    /// The world refused the interaction.
    #[error("rejected: {reason}")]
    Rejected {
        /// What the world reported.
        reason: String,
    },

    /// The connection to the world is gone.
    #[error("disconnected: {reason}")]
    Disconnected {
        /// What closed the connection.
        reason: String,
    },
}

impl CollaboratorError {
    /// Whether the build cannot continue after this error.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

/// Moves the actor.
#[async_trait]
pub trait Navigator: Send {
    /// Current position of the actor's feet.
    fn position(&self) -> Vec3;

    /// Move until `goal` accepts the actor's feet cell.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Unreachable`] if no accepted position can
    /// be reached.
    async fn goto(&mut self, goal: &PlacementGoal) -> Result<(), CollaboratorError>;
}

/// Puts the right item into the actor's hand.
#[async_trait]
pub trait MaterialSupplier: Send {
    /// Equip `item`.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::MissingItem`] if it is not available.
    async fn equip_item(&mut self, item: &ItemId) -> Result<(), CollaboratorError>;
}

/// Picks the best tool for breaking a block.
#[async_trait]
pub trait ToolSelector: Send {
    /// Equip a tool for `block`.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::NoTool`] if nothing usable is held.
    async fn equip_for_block(&mut self, block: &Block) -> Result<(), CollaboratorError>;
}

/// Extra parameters of a placement click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceOptions {
    /// Half of the cell the click lands in.
    pub half: Option<Half>,
    /// Click point relative to the reference block's lower corner.
    pub delta: Vec3,
    /// Look direction held during the click.
    pub facing: Option<Face>,
}

/// Low-level block interaction.
#[async_trait]
pub trait BlockInteractor: Send {
    /// Turn the head toward `point`.
    async fn look_at(&mut self, point: Vec3);

    /// Start or stop sneaking.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] if the stance cannot be changed.
    async fn set_sneak(&mut self, sneaking: bool) -> Result<(), CollaboratorError>;

    /// Click `face` of `reference` with the held item.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] if the click is refused.
    async fn place_against(
        &mut self,
        reference: &Block,
        face: Face,
        options: &PlaceOptions,
    ) -> Result<(), CollaboratorError>;

    /// Break `block` with the held tool.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] if the block cannot be broken.
    async fn dig(&mut self, block: &Block) -> Result<(), CollaboratorError>;
}

/// Everything the drive loop needs from the actor.
pub trait Actor: Navigator + MaterialSupplier + ToolSelector + BlockInteractor {}

impl<T> Actor for T where T: Navigator + MaterialSupplier + ToolSelector + BlockInteractor {}

/// An open storage container.
#[async_trait]
pub trait Container: Send {
    /// Move `count` of `item` from the container into the inventory.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::MissingItem`] if the container holds
    /// fewer.
    async fn withdraw(&mut self, item: &ItemId, count: u32) -> Result<(), CollaboratorError>;

    /// Close the container window.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] if the window cannot be closed.
    async fn close(self: Box<Self>) -> Result<(), CollaboratorError>;
}

/// Inventory and container access used by restocking.
#[async_trait]
pub trait Storage: Send {
    /// How many of `item` the actor carries.
    fn held_count(&self, item: &ItemId) -> u32;

    /// Open the container block `block`.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] if it cannot be opened.
    async fn open_container(
        &mut self,
        block: &Block,
    ) -> Result<Box<dyn Container + '_>, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_disconnect_is_fatal() {
        let disconnected = CollaboratorError::Disconnected {
            reason: String::from("kicked"),
        };
        let missing = CollaboratorError::MissingItem {
            item: ItemId::new("stone"),
        };
        assert!(disconnected.is_fatal());
        assert!(!missing.is_fatal());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = CollaboratorError::MissingItem {
            item: ItemId::new("oak_planks"),
        };
        assert_eq!(err.to_string(), "missing item `oak_planks`");
    }
}
