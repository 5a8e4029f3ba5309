//! Plan store, world view, and placement geometry for the Mason build engine.
//!
//! # Modules
//!
//! - [`error`] -- Error types for world reads and plan assembly.
//! - [`goal`] -- Placement goals: acceptable standing positions and the
//!   reference face clicked from them.
//! - [`placement`] -- Placement rules (allowed reference faces, look
//!   direction) and the interactable-block table.
//! - [`plan`] -- The immutable, position-keyed list of target cells.
//! - [`world`] -- The [`WorldView`] read boundary and the in-memory
//!   [`GridWorld`].
//!
//! [`WorldView`]: world::WorldView
//! [`GridWorld`]: world::GridWorld

pub mod error;
pub mod goal;
pub mod placement;
pub mod plan;
pub mod world;

// Re-export primary types at crate root.
pub use error::{PlanError, WorldError};
pub use goal::{PlacementGeometry, PlacementGoal, ReferenceCandidate, eye_position};
pub use placement::{Orientation, PlacementRules, StandardRules, requires_sneak};
pub use plan::{Plan, TargetCell};
pub use world::{GridWorld, WorldView};
