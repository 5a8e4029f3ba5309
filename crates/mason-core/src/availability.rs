//! Decides which pending actions can be executed right now and, for
//! placements, against which neighbours.
//!
//! Resolution is a pure read of the world: nothing is moved or clicked. An
//! action that cannot be executed is simply left out of the available set;
//! it may become available after other actions complete.

use mason_types::{ActionKind, BlockPos, Face, Half, PendingAction};
use mason_world::{
    Orientation, PlacementGoal, PlacementRules, ReferenceCandidate, WorldError, WorldView,
};

/// Geometry needed to carry out one placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementPlan {
    /// Cell to place into.
    pub target: BlockPos,
    /// Solid neighbours to click, in face priority order.
    pub candidates: Vec<ReferenceCandidate>,
    /// Required look direction.
    pub orientation: Orientation,
    /// Half of the cell the block has to end up in.
    pub half: Option<Half>,
}

impl PlacementPlan {
    /// Navigation goal for this placement with the given reach.
    pub fn goal(&self, reach: f64) -> PlacementGoal {
        PlacementGoal {
            target: self.target,
            candidates: self.candidates.clone(),
            facing: self.orientation.facing,
            facing_3d: self.orientation.is_3d,
            half: self.half,
            reach,
        }
    }
}

/// How an available action is carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum Executable {
    /// Break the block in the cell.
    Remove,
    /// Place against one of the listed references.
    Place(PlacementPlan),
}

/// A pending action paired with the way to execute it.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableAction {
    /// The action.
    pub action: PendingAction,
    /// Its execution geometry.
    pub executable: Executable,
}

/// Checks pending actions against the live world.
pub struct AvailabilityResolver<'a> {
    world: &'a dyn WorldView,
    rules: &'a dyn PlacementRules,
    face_priority: &'a [Face],
}

impl<'a> AvailabilityResolver<'a> {
    /// A resolver walking neighbours in `face_priority` order.
    pub fn new(
        world: &'a dyn WorldView,
        rules: &'a dyn PlacementRules,
        face_priority: &'a [Face],
    ) -> Self {
        Self {
            world,
            rules,
            face_priority,
        }
    }

    /// How `action` can be executed, or `None` if it cannot be right now.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn resolve(&self, action: &PendingAction) -> Result<Option<Executable>, WorldError> {
        match action.kind {
            ActionKind::Remove => {
                let present = self
                    .world
                    .block_at(action.position)?
                    .is_some_and(|block| !block.state.is_air());
                Ok(present.then_some(Executable::Remove))
            }
            ActionKind::Place => Ok(self.placement(action)?.map(Executable::Place)),
        }
    }

    fn placement(&self, action: &PendingAction) -> Result<Option<PlacementPlan>, WorldError> {
        let allowed = self.rules.allowed_faces(&action.desired);
        let mut candidates = Vec::new();
        for &direction in self.face_priority {
            if !allowed.contains(&direction) {
                continue;
            }
            let reference = action.position.neighbor(direction);
            let solid = self
                .world
                .block_at(reference)?
                .is_some_and(|block| block.is_solid());
            if solid {
                candidates.push(ReferenceCandidate {
                    reference,
                    face: direction.opposite(),
                });
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }
        Ok(Some(PlacementPlan {
            target: action.position,
            candidates,
            orientation: self.rules.orientation(&action.desired),
            half: action.desired.half(),
        }))
    }

    /// The executable subset of `pending`, keeping its order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the world cannot be read.
    pub fn available(&self, pending: Vec<PendingAction>) -> Result<Vec<AvailableAction>, WorldError> {
        let mut available = Vec::with_capacity(pending.len());
        for action in pending {
            if let Some(executable) = self.resolve(&action)? {
                available.push(AvailableAction { action, executable });
            }
        }
        Ok(available)
    }
}
