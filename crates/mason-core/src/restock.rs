//! Restocking: pull the materials a build still needs out of a container.

use std::collections::BTreeMap;

use mason_types::{BlockPos, BuildEvent, FailureKind, ItemId};
use mason_world::WorldError;
use thiserror::Error;
use tracing::{info, warn};

use crate::collaborators::{CollaboratorError, Storage};
use crate::engine::Builder;

/// Block names that can be restocked from.
const CONTAINERS: &[&str] = &["chest", "trapped_chest", "barrel"];

/// Errors parsing a [`ContainerLocator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected `x, y, z`, got `{input}`")]
pub struct LocatorParseError {
    /// The rejected input.
    pub input: String,
}

/// Position of a storage container, parsed from `"x, y, z"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLocator(pub BlockPos);

impl core::str::FromStr for ContainerLocator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LocatorParseError {
            input: s.to_owned(),
        };
        let coords = s
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        let [x, y, z] = coords.as_slice() else {
            return Err(invalid());
        };
        Ok(Self(BlockPos::new(*x, *y, *z)))
    }
}

/// Items moved during one restock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestockReport {
    /// Amount withdrawn per item.
    pub withdrawn: BTreeMap<ItemId, u32>,
}

/// Errors from [`Builder::restock`].
#[derive(Debug, Error)]
pub enum RestockError {
    /// Restocking only makes sense while a build is running.
    #[error("no build is active")]
    NoActiveBuild,

    /// The located block is not a storage container.
    #[error("block at {position} is `{found}`, not a container")]
    NotAContainer {
        /// Located position.
        position: BlockPos,
        /// Name of the block found there.
        found: String,
    },

    /// Reading the world failed.
    #[error("world read failed: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// The container or inventory refused.
    #[error("restock failed: {source}")]
    Collaborator {
        /// The underlying collaborator error.
        #[from]
        source: CollaboratorError,
    },
}

impl Builder {
    /// Withdraw from the container at `locator` whatever the active build
    /// still needs beyond what `storage` already holds.
    ///
    /// Failures are published as supply failures and returned; nothing is
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns [`RestockError`] if no build is active, the block is not a
    /// container, the world cannot be read, or a withdrawal fails.
    pub async fn restock<S>(
        &self,
        storage: &mut S,
        locator: ContainerLocator,
    ) -> Result<RestockReport, RestockError>
    where
        S: Storage + ?Sized,
    {
        let Some(active) = self.active_build() else {
            return Err(RestockError::NoActiveBuild);
        };
        let build_id = active.control.build_id();
        let result = self.withdraw_shortfall(storage, locator, &active.queue).await;
        match &result {
            Ok(report) => info!(%build_id, at = %locator.0, withdrawn = ?report.withdrawn, "Restocked"),
            Err(err) => {
                warn!(%build_id, at = %locator.0, error = %err, "Restock failed");
                self.events().publish(
                    build_id,
                    BuildEvent::Error {
                        kind: FailureKind::SupplyFailure,
                        message: err.to_string(),
                        position: Some(locator.0),
                    },
                );
            }
        }
        result
    }

    async fn withdraw_shortfall<S>(
        &self,
        storage: &mut S,
        locator: ContainerLocator,
        queue: &crate::queue::ActionQueue,
    ) -> Result<RestockReport, RestockError>
    where
        S: Storage + ?Sized,
    {
        let position = locator.0;
        let block = self.world().block_at(position)?;
        let block = match block {
            Some(block) if CONTAINERS.contains(&block.name()) => block,
            other => {
                let found = other.map_or_else(|| String::from(mason_types::AIR), |b| b.state.name);
                return Err(RestockError::NotAContainer { position, found });
            }
        };

        let shortfall: Vec<(ItemId, u32)> = queue
            .remaining_needed_resources()?
            .into_iter()
            .filter_map(|(item, needed)| {
                let missing = needed.saturating_sub(storage.held_count(&item));
                (missing > 0).then_some((item, missing))
            })
            .collect();

        let mut report = RestockReport::default();
        if shortfall.is_empty() {
            return Ok(report);
        }

        let mut container = storage.open_container(&block).await?;
        for (item, count) in shortfall {
            if let Err(err) = container.withdraw(&item, count).await {
                // Leave the window closed even when the withdrawal failed.
                let _ = container.close().await;
                return Err(err.into());
            }
            report.withdrawn.insert(item, count);
        }
        container.close().await?;
        Ok(report)
    }
}
