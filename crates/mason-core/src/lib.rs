//! Action queue, availability resolver, and drive loop for the Mason build
//! engine.
//!
//! A build repeatedly derives the outstanding actions from plan and world,
//! keeps those that can be executed now, picks the nearest, executes it
//! through the actor collaborators, and confirms the result against the
//! world before counting it.
//!
//! # Modules
//!
//! - [`availability`] -- Which pending actions are executable, and the
//!   placement geometry for each.
//! - [`collaborators`] -- Traits for navigation, supply, tools, block
//!   interaction, and storage.
//! - [`config`] -- Configuration loading from `mason-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- Run state with pause, resume, and cancel.
//! - [`engine`] -- [`Builder`], [`BuildHandle`], and the drive loop.
//! - [`events`] -- Broadcast of build events to observers.
//! - [`queue`] -- Pending actions re-derived from the live world.
//! - [`restock`] -- Withdrawing missing materials from a container.
//! - [`sandbox`] -- In-memory actor and storage.
//!
//! [`Builder`]: engine::Builder
//! [`BuildHandle`]: engine::BuildHandle

pub mod availability;
pub mod collaborators;
pub mod config;
pub mod control;
pub mod engine;
pub mod events;
pub mod queue;
pub mod restock;
pub mod sandbox;

pub use engine::{ActionFailure, BuildError, BuildHandle, Builder};
