//! The build driver.
//!
//! [`Builder::build`] owns the actor for the duration of a build and runs the
//! drive loop:
//!
//! - **Cancel check**: a cancelled build stops at the next iteration
//! - **Pause check**: a paused build parks until resumed, consuming nothing
//! - **Availability**: re-derive the queue and keep what can be done now
//! - **Selection**: nearest action to the actor, plan order on ties
//! - **Execution**: run the place or remove sub-protocol, then confirm the
//!   completion against the world
//! - **Error policy**: action failures pause or cancel the build; fatal
//!   failures end it with an error
//!
//! Callers steer a running build through a [`BuildHandle`] and observe it
//! through [`Builder::subscribe`].

use std::sync::Arc;

use mason_types::{
    ActionKind, BlockPos, BuildEvent, BuildId, BuildOutcome, FailureKind, ItemId, PendingAction,
    ProgressSnapshot, RunState, Vec3,
};
use mason_world::{
    PlacementRules, Plan, StandardRules, WorldError, WorldView, eye_position, requires_sneak,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::availability::{AvailabilityResolver, AvailableAction, Executable, PlacementPlan};
use crate::collaborators::{Actor, CollaboratorError, PlaceOptions};
use crate::config::{BuilderConfig, ConfigError, ErrorPolicy};
use crate::control::BuildControl;
use crate::events::EventBus;
use crate::queue::{ActionQueue, QueueError};

/// One action that could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {position}: {message}")]
pub struct ActionFailure {
    /// Failure class.
    pub kind: FailureKind,
    /// Target cell of the action.
    pub position: BlockPos,
    /// Human-readable cause.
    pub message: String,
}

impl ActionFailure {
    fn new(kind: FailureKind, position: BlockPos, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            message: message.into(),
        }
    }

    /// Wrap a collaborator error; a disconnect is always fatal.
    fn collaborator(kind: FailureKind, position: BlockPos, err: &CollaboratorError) -> Self {
        let kind = if err.is_fatal() {
            FailureKind::Fatal
        } else {
            kind
        };
        Self::new(kind, position, err.to_string())
    }

    fn world(position: BlockPos, err: &WorldError) -> Self {
        Self::new(FailureKind::Fatal, position, err.to_string())
    }
}

/// Errors that end a build abnormally.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Another build is still running on this builder.
    #[error("a build is already active")]
    AlreadyActive,

    /// The world could not be read.
    #[error("world read failed: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// An action failed in a way no policy can recover from.
    #[error("build stopped: {0}")]
    Fatal(ActionFailure),
}

/// Shared parts of the build currently running.
#[derive(Debug, Clone)]
pub(crate) struct ActiveBuild {
    pub(crate) control: Arc<BuildControl>,
    pub(crate) queue: Arc<ActionQueue>,
}

type ActiveSlot = Arc<Mutex<Option<ActiveBuild>>>;

/// Clears the active slot when a build ends, however it ends.
struct ActiveGuard<'a> {
    slot: &'a Mutex<Option<ActiveBuild>>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

/// Runs builds against one world.
pub struct Builder {
    config: BuilderConfig,
    world: Arc<dyn WorldView>,
    rules: Arc<dyn PlacementRules>,
    events: EventBus,
    active: ActiveSlot,
}

impl Builder {
    /// A builder using [`StandardRules`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` fails validation.
    pub fn new(config: BuilderConfig, world: Arc<dyn WorldView>) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = EventBus::new(config.event_capacity);
        Ok(Self {
            config,
            world,
            rules: Arc::new(StandardRules),
            events,
            active: Arc::new(Mutex::new(None)),
        })
    }

    /// Replace the placement rules.
    #[must_use]
    pub fn with_rules(mut self, rules: Arc<dyn PlacementRules>) -> Self {
        self.rules = rules;
        self
    }

    /// The validated configuration.
    pub const fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<mason_types::BuildEventRecord> {
        self.events.subscribe()
    }

    /// A handle for steering whichever build is active.
    pub fn handle(&self) -> BuildHandle {
        BuildHandle {
            active: Arc::clone(&self.active),
        }
    }

    pub(crate) fn active_build(&self) -> Option<ActiveBuild> {
        self.active.lock().clone()
    }

    pub(crate) const fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn world(&self) -> &dyn WorldView {
        self.world.as_ref()
    }

    /// Build `plan` with `actor` until it finishes, stalls, or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::AlreadyActive`] if a build is running,
    /// [`BuildError::World`] if the world cannot be read, and
    /// [`BuildError::Fatal`] if an action fails fatally.
    pub async fn build<A>(&self, actor: &mut A, plan: Plan) -> Result<BuildOutcome, BuildError>
    where
        A: Actor + ?Sized,
    {
        let build_id = BuildId::new();
        let control = Arc::new(BuildControl::new(build_id, self.events.clone()));
        let queue = Arc::new(ActionQueue::new(plan, Arc::clone(&self.world)));
        {
            let mut slot = self.active.lock();
            if slot.is_some() {
                return Err(BuildError::AlreadyActive);
            }
            *slot = Some(ActiveBuild {
                control: Arc::clone(&control),
                queue: Arc::clone(&queue),
            });
        }
        let _guard = ActiveGuard { slot: &self.active };

        info!(
            %build_id,
            cells = queue.plan().len(),
            build_speed = self.config.build_speed,
            on_error = ?self.config.on_error,
            "Build starting"
        );
        let result = self.drive(actor, &control, &queue).await;
        match &result {
            Ok(outcome) => info!(
                %build_id,
                outcome = ?outcome,
                completed = queue.completed_count(),
                "Build ended"
            ),
            Err(err) => error!(%build_id, error = %err, "Build failed"),
        }
        result
    }

    async fn drive<A>(
        &self,
        actor: &mut A,
        control: &BuildControl,
        queue: &ActionQueue,
    ) -> Result<BuildOutcome, BuildError>
    where
        A: Actor + ?Sized,
    {
        let build_id = control.build_id();
        loop {
            match control.state() {
                RunState::Cancelled => return Ok(BuildOutcome::Cancelled),
                RunState::Paused => {
                    control.wait_while_paused(self.config.idle_poll()).await;
                    continue;
                }
                RunState::Running => {}
            }

            let pending = queue
                .all_pending()
                .map_err(|e| self.world_fault(build_id, e))?;
            let remaining = pending.len();
            let resolver = AvailabilityResolver::new(
                self.world.as_ref(),
                self.rules.as_ref(),
                &self.config.face_priority,
            );
            let available = resolver
                .available(pending)
                .map_err(|e| self.world_fault(build_id, e))?;

            let here = actor.position();
            let Some(next) = nearest(available, here) else {
                if remaining == 0 {
                    self.events.publish(build_id, BuildEvent::Finished);
                    return Ok(BuildOutcome::Finished);
                }
                let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
                info!(%build_id, remaining, "No action available");
                self.events
                    .publish(build_id, BuildEvent::Stalled { remaining });
                return Ok(BuildOutcome::Stalled { remaining });
            };

            debug!(
                %build_id,
                position = %next.action.position,
                kind = %next.action.kind,
                desired = %next.action.desired,
                "Executing action"
            );
            let executed = match &next.executable {
                Executable::Remove => self.remove(actor, &next.action).await,
                Executable::Place(plan) => self.place(actor, &next.action, plan).await,
            };
            if let Err(failure) = executed {
                self.on_failure(control, failure)?;
                continue;
            }

            match queue.complete(&next.action) {
                Ok(()) => {}
                Err(QueueError::World(e)) => return Err(self.world_fault(build_id, e)),
                Err(QueueError::NotResolved { position, kind }) => {
                    let failure_kind = match kind {
                        ActionKind::Place => FailureKind::PlacementMismatch,
                        ActionKind::Remove => FailureKind::RemovalFailure,
                    };
                    let failure = ActionFailure::new(
                        failure_kind,
                        position,
                        format!("{kind} reported done but the world still requires it"),
                    );
                    self.on_failure(control, failure)?;
                    continue;
                }
            }

            let snapshot = queue
                .progress()
                .map_err(|e| self.world_fault(build_id, e))?;
            self.events
                .publish(build_id, BuildEvent::Progress { snapshot });
            tokio::time::sleep(self.config.pacing_delay()).await;
        }
    }

    /// Publish a failure and apply the error policy to it.
    fn on_failure(&self, control: &BuildControl, failure: ActionFailure) -> Result<(), BuildError> {
        let build_id = control.build_id();
        warn!(
            %build_id,
            kind = %failure.kind,
            position = %failure.position,
            message = %failure.message,
            "Action failed"
        );
        self.events.publish(
            build_id,
            BuildEvent::Error {
                kind: failure.kind,
                message: failure.message.clone(),
                position: Some(failure.position),
            },
        );
        if failure.kind.is_fatal() {
            return Err(BuildError::Fatal(failure));
        }
        match self.config.on_error {
            ErrorPolicy::Pause => control.pause_after_error(),
            ErrorPolicy::Cancel => control.cancel(),
        };
        Ok(())
    }

    fn world_fault(&self, build_id: BuildId, err: WorldError) -> BuildError {
        self.events.publish(
            build_id,
            BuildEvent::Error {
                kind: FailureKind::Fatal,
                message: err.to_string(),
                position: None,
            },
        );
        BuildError::World { source: err }
    }

    async fn place<A>(
        &self,
        actor: &mut A,
        action: &PendingAction,
        plan: &PlacementPlan,
    ) -> Result<(), ActionFailure>
    where
        A: Actor + ?Sized,
    {
        let position = action.position;
        let goal = plan.goal(self.config.reach);

        if !goal.is_end(actor.position().floored()) {
            actor.goto(&goal).await.map_err(|e| {
                ActionFailure::collaborator(FailureKind::NavigationFailure, position, &e)
            })?;
        }

        let item = action
            .item
            .clone()
            .unwrap_or_else(|| ItemId::new(action.desired.name.clone()));
        actor
            .equip_item(&item)
            .await
            .map_err(|e| ActionFailure::collaborator(FailureKind::SupplyFailure, position, &e))?;

        let eye = eye_position(actor.position().floored());
        let Some(geometry) = goal.select(eye) else {
            return Err(ActionFailure::new(
                FailureKind::PlacementUnavailable,
                position,
                "no reference face within reach",
            ));
        };
        actor.look_at(geometry.contact).await;

        let reference = self
            .world
            .block_at(geometry.reference)
            .map_err(|e| ActionFailure::world(position, &e))?
            .filter(mason_types::Block::is_solid)
            .ok_or_else(|| {
                ActionFailure::new(
                    FailureKind::PlacementUnavailable,
                    position,
                    format!("reference block at {} is gone", geometry.reference),
                )
            })?;

        let options = PlaceOptions {
            half: plan.half,
            delta: geometry.delta,
            facing: plan.orientation.facing,
        };
        let sneak = requires_sneak(reference.name());
        if sneak {
            actor.set_sneak(true).await.map_err(|e| {
                ActionFailure::collaborator(FailureKind::PlacementMismatch, position, &e)
            })?;
        }
        let placed = actor.place_against(&reference, geometry.face, &options).await;
        let released = if sneak {
            actor.set_sneak(false).await
        } else {
            Ok(())
        };
        placed
            .and(released)
            .map_err(|e| ActionFailure::collaborator(FailureKind::PlacementMismatch, position, &e))?;

        let observed = self
            .world
            .state_at(position)
            .map_err(|e| ActionFailure::world(position, &e))?;
        if observed != action.desired {
            return Err(ActionFailure::new(
                FailureKind::PlacementMismatch,
                position,
                format!("expected {}, found {observed}", action.desired),
            ));
        }
        Ok(())
    }

    async fn remove<A>(&self, actor: &mut A, action: &PendingAction) -> Result<(), ActionFailure>
    where
        A: Actor + ?Sized,
    {
        let position = action.position;
        let block = self
            .world
            .block_at(position)
            .map_err(|e| ActionFailure::world(position, &e))?
            .filter(|block| !block.state.is_air())
            .ok_or_else(|| {
                ActionFailure::new(
                    FailureKind::RemovalTargetMissing,
                    position,
                    "nothing to remove",
                )
            })?;

        actor
            .equip_for_block(&block)
            .await
            .map_err(|e| ActionFailure::collaborator(FailureKind::SupplyFailure, position, &e))?;
        actor.look_at(position.center()).await;
        actor
            .dig(&block)
            .await
            .map_err(|e| ActionFailure::collaborator(FailureKind::RemovalFailure, position, &e))
    }
}

/// The available action closest to `here`, earliest in plan order on ties.
fn nearest(available: Vec<AvailableAction>, here: Vec3) -> Option<AvailableAction> {
    available.into_iter().min_by(|a, b| {
        let da = a.action.position.center().distance_squared(here);
        let db = b.action.position.center().distance_squared(here);
        da.total_cmp(&db)
            .then_with(|| a.action.plan_index.cmp(&b.action.plan_index))
    })
}

/// Steers the active build of a [`Builder`]. Every call is a no-op when no
/// build is running.
#[derive(Debug, Clone)]
pub struct BuildHandle {
    active: ActiveSlot,
}

impl BuildHandle {
    fn current(&self) -> Option<ActiveBuild> {
        self.active.lock().clone()
    }

    /// Whether a build is running.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Identifier of the running build.
    pub fn build_id(&self) -> Option<BuildId> {
        self.current().map(|build| build.control.build_id())
    }

    /// Run state of the running build.
    pub fn state(&self) -> Option<RunState> {
        self.current().map(|build| build.control.state())
    }

    /// Pause at the next iteration boundary. Returns whether the state
    /// changed.
    pub fn pause(&self) -> bool {
        self.current().is_some_and(|build| build.control.pause())
    }

    /// Resume a paused build. Returns whether the state changed.
    pub fn resume(&self) -> bool {
        self.current().is_some_and(|build| build.control.resume())
    }

    /// Cancel the build. Returns whether the state changed.
    pub fn cancel(&self) -> bool {
        self.current().is_some_and(|build| build.control.cancel())
    }

    /// Give up on the target cell at `position`.
    pub fn abandon(&self, position: BlockPos) -> bool {
        self.current()
            .is_some_and(|build| build.queue.abandon(position))
    }

    /// Progress of the running build, read from the live world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn progress(&self) -> Result<Option<ProgressSnapshot>, WorldError> {
        self.current()
            .map(|build| build.queue.progress())
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mason_types::BlockState;
    use mason_world::{GridWorld, TargetCell};

    use super::*;
    use crate::sandbox::SandboxBot;

    fn available(x: i32, plan_index: u32) -> AvailableAction {
        AvailableAction {
            action: PendingAction {
                position: BlockPos::new(x, 1, 0),
                kind: ActionKind::Remove,
                desired: BlockState::air(),
                current: BlockState::new("dirt"),
                item: None,
                plan_index,
            },
            executable: Executable::Remove,
        }
    }

    #[test]
    fn nearest_prefers_distance_then_plan_order() {
        let here = Vec3::new(0.5, 1.0, 0.5);
        let picked = nearest(vec![available(3, 0), available(-1, 1), available(1, 2)], here);
        assert_eq!(picked.unwrap().action.plan_index, 1);
        assert!(nearest(Vec::new(), here).is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BuilderConfig {
            build_speed: 0.0,
            ..BuilderConfig::default()
        };
        let world: Arc<dyn WorldView> = Arc::new(GridWorld::new());
        assert!(Builder::new(config, world).is_err());
    }

    #[test]
    fn handle_without_build_is_inert() {
        let world: Arc<dyn WorldView> = Arc::new(GridWorld::new());
        let builder = Builder::new(BuilderConfig::default(), world).unwrap();
        let handle = builder.handle();
        assert!(!handle.is_active());
        assert!(!handle.pause());
        assert!(!handle.cancel());
        assert_eq!(handle.state(), None);
        assert_eq!(handle.progress().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_is_cleared_after_a_build() {
        let grid = Arc::new(GridWorld::new());
        grid.fill_layer((-2, -2), (2, 2), 0, &BlockState::new("stone"));
        let world: Arc<dyn WorldView> = Arc::clone(&grid) as Arc<dyn WorldView>;
        let builder = Builder::new(BuilderConfig::default(), world).unwrap();
        let mut bot = SandboxBot::new(Arc::clone(&grid), Vec3::new(0.5, 1.0, 0.5));

        let plan = Plan::new(vec![TargetCell::new(
            BlockPos::new(2, 1, 2),
            BlockState::new("stone"),
        )])
        .unwrap();
        let outcome = builder.build(&mut bot, plan).await.unwrap();
        assert_eq!(outcome, BuildOutcome::Finished);
        assert!(!builder.handle().is_active());
    }
}
