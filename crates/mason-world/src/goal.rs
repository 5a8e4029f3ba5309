//! Placement goals: where the actor may stand to place a block, and which
//! reference face it clicks from there.
//!
//! A [`PlacementGoal`] is handed to the navigator as the acceptance
//! predicate for the final position, and used again after arrival to pick
//! the concrete reference face with [`PlacementGoal::select`].

use mason_types::{BlockPos, Face, Half, Vec3};
use serde::{Deserialize, Serialize};

/// Height of the actor's eyes above its feet cell.
pub const EYE_HEIGHT: f64 = 1.6;

/// Offset of the contact point from the face centre for half placements.
const HALF_OFFSET: f64 = 0.25;

/// A solid neighbour that can be clicked to place into the target cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCandidate {
    /// Position of the existing block.
    pub reference: BlockPos,
    /// Face of the reference that touches the target cell.
    pub face: Face,
}

/// The reference face picked for one placement, with its contact point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementGeometry {
    /// Position of the existing block clicked.
    pub reference: BlockPos,
    /// Face of the reference clicked.
    pub face: Face,
    /// World-space point the actor looks at and clicks.
    pub contact: Vec3,
    /// `contact` relative to the reference block's lower corner.
    pub delta: Vec3,
}

/// Acceptance predicate for the actor's position before a placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementGoal {
    /// Cell to place into.
    pub target: BlockPos,
    /// Viable references in priority order.
    pub candidates: Vec<ReferenceCandidate>,
    /// Required look direction, if the resulting state depends on it.
    pub facing: Option<Face>,
    /// Whether `facing` includes up/down.
    pub facing_3d: bool,
    /// Half of the cell the click has to land in.
    pub half: Option<Half>,
    /// Maximum distance from the eyes to the contact point.
    pub reach: f64,
}

/// Eye position of an actor whose feet are in `feet`.
pub fn eye_position(feet: BlockPos) -> Vec3 {
    feet.corner().offset(0.5, EYE_HEIGHT, 0.5)
}

/// The face a look vector points at most directly.
///
/// With `include_vertical` unset only the horizontal components are used,
/// matching how cardinal facing is derived from yaw alone.
pub fn dominant_direction(look: Vec3, include_vertical: bool) -> Face {
    let (ax, ay, az) = (look.x.abs(), look.y.abs(), look.z.abs());
    if include_vertical && ay >= ax && ay >= az {
        return if look.y < 0.0 { Face::Down } else { Face::Up };
    }
    if ax >= az {
        if look.x < 0.0 { Face::West } else { Face::East }
    } else if look.z < 0.0 {
        Face::North
    } else {
        Face::South
    }
}

impl PlacementGoal {
    /// Point on the candidate's face the actor clicks.
    pub fn contact_point(&self, candidate: ReferenceCandidate) -> Vec3 {
        let face_center = candidate
            .reference
            .center()
            .plus(candidate.face.normal().scaled(0.5));
        if !candidate.face.is_horizontal() {
            return face_center;
        }
        match self.half {
            Some(Half::Top) => face_center.offset(0.0, HALF_OFFSET, 0.0),
            Some(Half::Bottom) => face_center.offset(0.0, -HALF_OFFSET, 0.0),
            None => face_center,
        }
    }

    /// First candidate, in priority order, that can be clicked from `eye`
    /// while looking in the required direction.
    pub fn select(&self, eye: Vec3) -> Option<PlacementGeometry> {
        let reach_sq = self.reach * self.reach;
        self.candidates.iter().find_map(|&candidate| {
            let contact = self.contact_point(candidate);
            if contact.distance_squared(eye) > reach_sq {
                return None;
            }
            // A face can only be clicked from the side it points to.
            if eye.minus(contact).dot(candidate.face.normal()) <= 0.0 {
                return None;
            }
            if let Some(required) = self.facing {
                let look = contact.minus(eye);
                if dominant_direction(look, self.facing_3d) != required {
                    return None;
                }
            }
            Some(PlacementGeometry {
                reference: candidate.reference,
                face: candidate.face,
                contact,
                delta: contact.minus(candidate.reference.corner()),
            })
        })
    }

    /// Whether an actor standing in `feet` can place without moving.
    pub fn is_end(&self, feet: BlockPos) -> bool {
        if feet == self.target || feet.offset(0, 1, 0) == self.target {
            return false;
        }
        self.select(eye_position(feet)).is_some()
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn floor_goal(facing: Option<Face>) -> PlacementGoal {
        let target = BlockPos::new(0, 1, 0);
        PlacementGoal {
            target,
            candidates: vec![ReferenceCandidate {
                reference: target.neighbor(Face::Down),
                face: Face::Up,
            }],
            facing,
            facing_3d: false,
            half: None,
            reach: 4.5,
        }
    }

    #[test]
    fn contact_is_on_the_touching_face() {
        let goal = floor_goal(None);
        let contact = goal.contact_point(goal.candidates[0]);
        assert!((contact.y - 1.0).abs() < 1e-9);
        assert!((contact.x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn standing_inside_the_target_is_rejected() {
        let goal = floor_goal(None);
        assert!(!goal.is_end(BlockPos::new(0, 1, 0)));
        assert!(!goal.is_end(BlockPos::new(0, 0, 0)));
    }

    #[test]
    fn adjacent_actor_can_place() {
        let goal = floor_goal(None);
        assert!(goal.is_end(BlockPos::new(1, 1, 0)));
    }

    #[test]
    fn far_actor_cannot_place() {
        let goal = floor_goal(None);
        assert!(!goal.is_end(BlockPos::new(10, 1, 0)));
    }

    #[test]
    fn facing_constraint_picks_the_side() {
        // Looking east means standing west of the target.
        let goal = floor_goal(Some(Face::East));
        assert!(goal.is_end(BlockPos::new(-2, 1, 0)));
        assert!(!goal.is_end(BlockPos::new(2, 1, 0)));
    }

    #[test]
    fn faces_cannot_be_clicked_from_behind() {
        let target = BlockPos::new(0, 1, 0);
        let goal = PlacementGoal {
            target,
            candidates: vec![ReferenceCandidate {
                reference: target.neighbor(Face::Up),
                face: Face::Down,
            }],
            facing: None,
            facing_3d: false,
            half: None,
            reach: 4.5,
        };
        // Eyes at y = 2.6 are above the contact at y = 2.0.
        assert!(goal.select(eye_position(BlockPos::new(1, 1, 0))).is_none());
        // Eyes at y = 0.6 are below it.
        assert!(goal.select(eye_position(BlockPos::new(1, -1, 0))).is_some());
    }

    #[test]
    fn half_shifts_side_contacts() {
        let target = BlockPos::new(0, 1, 0);
        let goal = PlacementGoal {
            target,
            candidates: vec![ReferenceCandidate {
                reference: target.neighbor(Face::West),
                face: Face::East,
            }],
            facing: None,
            facing_3d: false,
            half: Some(Half::Top),
            reach: 4.5,
        };
        let contact = goal.contact_point(goal.candidates[0]);
        assert!((contact.y - 1.75).abs() < 1e-9);
    }

    #[test]
    fn dominant_direction_respects_vertical_flag() {
        let look = Vec3::new(0.2, -1.0, 0.1);
        assert_eq!(dominant_direction(look, true), Face::Down);
        assert_eq!(dominant_direction(look, false), Face::East);
        assert_eq!(dominant_direction(Vec3::new(0.1, 0.0, -2.0), false), Face::North);
    }
}
