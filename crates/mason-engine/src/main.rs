//! Demo driver for the Mason build engine.
//!
//! Builds a small hut in an in-memory world with the sandbox actor, logging
//! every build event on the way.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `mason-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Prepare the demo site and plan
//! 4. Start the event log
//! 5. Run the build
//! 6. Log the result

mod demo;
mod error;
mod event_log;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use mason_core::Builder;
use mason_core::config::{LoggingConfig, MasonConfig};
use mason_core::sandbox::SandboxBot;
use mason_types::{BlockPos, BlockState, ItemId};
use mason_world::{GridWorld, WorldView};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Where the sandbox actor starts, a few blocks north of the hut.
const START: BlockPos = BlockPos::new(1, 1, -4);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration; logging settings live in it.
    let config = load_config().context("loading mason-config.yaml")?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        build_speed = config.builder.build_speed,
        on_error = ?config.builder.on_error,
        reach = config.builder.reach,
        "mason-engine starting"
    );

    // 3. Prepare the site.
    let grid = Arc::new(GridWorld::new());
    demo::prepare_site(&grid);
    let plan = demo::hut_plan().map_err(EngineError::from)?;
    info!(
        cells = plan.len(),
        world_blocks = grid.block_count(),
        "Demo site prepared"
    );

    let world: Arc<dyn WorldView> = Arc::clone(&grid) as Arc<dyn WorldView>;
    let builder = Builder::new(config.builder, world).map_err(EngineError::from)?;

    // 4. Start the event log before the build publishes anything.
    let logger = tokio::spawn(event_log::run(builder.subscribe(), builder.handle()));

    // 5. Run the build.
    let mut bot = SandboxBot::new(Arc::clone(&grid), START.corner().offset(0.5, 0.0, 0.5))
        .with_placed_state(
            ItemId::new("oak_slab"),
            BlockState::new("oak_slab").with_property("type", "bottom"),
        );
    let outcome = builder.build(&mut bot, plan).await;

    // Dropping the builder closes the event channel once the log drains.
    drop(builder);
    let events_seen = logger.await.unwrap_or(0);

    // 6. Log the result.
    let outcome = outcome.map_err(EngineError::from)?;
    info!(
        outcome = ?outcome,
        events_seen,
        actions = bot.journal().len(),
        "mason-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the configuration from `mason-config.yaml`.
///
/// Looks for the config file relative to the current working directory and
/// falls back to defaults (with environment overrides) when it is missing.
fn load_config() -> Result<MasonConfig, EngineError> {
    let config_path = Path::new("mason-config.yaml");
    if config_path.exists() {
        Ok(MasonConfig::from_file(config_path)?)
    } else {
        Ok(MasonConfig::parse("{}")?)
    }
}
