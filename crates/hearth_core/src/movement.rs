//! Target-seeking movement with local separation.
//!
//! Every active unit does two things each tick:
//!
//! 1. **Separation** - it is nudged away from every other active unit closer
//!    than [`SEPARATION_RADIUS`]. This runs even while the unit is idle, so
//!    units stacked on the same spot drift apart on their own.
//! 2. **Seek** - if it is further than [`ARRIVAL_THRESHOLD`] from its target
//!    (measured on the ground plane) it steps toward the target at
//!    `speed * dt` and turns to face the direction of travel.
//!
//! Separation reads a snapshot of active positions taken before any unit
//! moves, so the result does not depend on iteration order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{AnimationCue, EntityId, Facing, Position};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Distance at which a unit counts as having reached its move target.
pub const ARRIVAL_THRESHOLD: Fixed = Fixed::ONE;

/// Neighbors closer than this push each other apart.
pub const SEPARATION_RADIUS: Fixed = Fixed::from_bits(3 << 31); // 1.5

/// Neighbors closer than this are treated as coincident and ignored.
pub const MIN_SEPARATION_DISTANCE: Fixed = Fixed::from_bits(42_949_673); // ~0.01

/// Scale applied to the averaged separation vector.
pub const SEPARATION_DAMPING: Fixed = Fixed::from_bits(1 << 31); // 0.5

/// Speed used when a unit carries no stats.
pub const DEFAULT_SPEED: Fixed = Fixed::from_bits(5 << 32);

/// Movement state for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mover {
    target: Vec2Fixed,
    moving: bool,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
}

impl Mover {
    /// Create a mover resting at `position`.
    #[must_use]
    pub const fn new(position: Vec2Fixed, speed: Fixed) -> Self {
        Self {
            target: position,
            moving: false,
            speed,
        }
    }

    /// Current move target.
    #[must_use]
    pub const fn target(&self) -> Vec2Fixed {
        self.target
    }

    /// Whether the unit moved on the last tick.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving
    }

    /// Speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Set a new target. Returns `false` if it was already the target.
    pub fn move_to(&mut self, target: Vec2Fixed) -> bool {
        if self.target == target {
            return false;
        }
        self.target = target;
        true
    }

    /// Drop the current target and stand still at `position`.
    pub fn stop(&mut self, position: Vec2Fixed) {
        self.target = position;
        self.moving = false;
    }
}

/// Registry of units taking part in movement and separation.
///
/// Units join when they are spawned or re-activated and leave when they are
/// removed or deactivated, so separation never sees stale entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSet {
    members: BTreeSet<EntityId>,
}

impl ActiveSet {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit. Returns `false` if it was already registered.
    pub fn register(&mut self, id: EntityId) -> bool {
        self.members.insert(id)
    }

    /// Remove a unit. Returns `false` if it was not registered.
    pub fn deregister(&mut self, id: EntityId) -> bool {
        self.members.remove(&id)
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    /// Registered units in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied()
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Separation displacement for one unit against a snapshot of neighbors.
///
/// Each neighbor within range contributes the unit vector pointing away
/// from it weighted by `1 / distance`, so closer neighbors push harder. The
/// contributions are averaged and scaled by `SEPARATION_DAMPING * dt`.
#[must_use]
pub fn separation_offset(
    id: EntityId,
    position: Vec2Fixed,
    neighbors: &[(EntityId, Vec2Fixed)],
    dt: Fixed,
) -> Vec2Fixed {
    let radius_sq = SEPARATION_RADIUS * SEPARATION_RADIUS;
    let mut push = Vec2Fixed::ZERO;
    let mut count: i32 = 0;

    for &(other, other_pos) in neighbors {
        if other == id {
            continue;
        }
        let dist_sq = position.distance_squared(other_pos);
        if dist_sq >= radius_sq {
            continue;
        }
        let dist = crate::math::fixed_sqrt(dist_sq);
        if dist <= MIN_SEPARATION_DISTANCE {
            continue;
        }
        // (offset / dist) / dist
        push += (position - other_pos) / dist_sq;
        count += 1;
    }

    if count == 0 {
        return Vec2Fixed::ZERO;
    }

    (push / Fixed::from_num(count)).scale(SEPARATION_DAMPING * dt)
}

/// Advance one unit by `dt`: separation first, then seek.
///
/// Returns a walk cue when the unit starts or stops moving.
pub fn step_mover(
    id: EntityId,
    position: &mut Position,
    facing: &mut Facing,
    mover: &mut Mover,
    neighbors: &[(EntityId, Vec2Fixed)],
    dt: Fixed,
) -> Option<AnimationCue> {
    position.value += separation_offset(id, position.value, neighbors, dt);

    let was_moving = mover.moving;
    let to_target = mover.target - position.value;
    let distance = to_target.length();

    if distance > ARRIVAL_THRESHOLD {
        mover.moving = true;
        let direction = to_target.normalize();
        let step = mover.speed.saturating_mul(dt);
        if step >= distance {
            position.value = mover.target;
        } else {
            position.value += direction.scale(step);
        }
        facing.look_along(direction);
    } else {
        mover.moving = false;
    }

    match (was_moving, mover.moving) {
        (false, true) => Some(AnimationCue::WalkStarted),
        (true, false) => Some(AnimationCue::WalkStopped),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: f64, y: f64) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    #[test]
    fn test_move_to_same_target_is_noop() {
        let mut mover = Mover::new(pos(0.0, 0.0), DEFAULT_SPEED);
        assert!(mover.move_to(pos(5.0, 0.0)));
        assert!(!mover.move_to(pos(5.0, 0.0)));
        assert_eq!(mover.target(), pos(5.0, 0.0));
    }

    #[test]
    fn test_stop_resets_target() {
        let mut mover = Mover::new(pos(0.0, 0.0), DEFAULT_SPEED);
        mover.move_to(pos(9.0, 9.0));
        mover.stop(pos(1.0, 1.0));
        assert_eq!(mover.target(), pos(1.0, 1.0));
        assert!(!mover.is_moving());
    }

    #[test]
    fn test_seek_moves_at_speed_and_faces_direction() {
        let mut position = Position::new(pos(0.0, 0.0));
        let mut facing = Facing::default();
        let mut mover = Mover::new(position.value, Fixed::from_num(4));
        mover.move_to(pos(10.0, 0.0));

        let cue = step_mover(1, &mut position, &mut facing, &mut mover, &[], Fixed::from_num(0.5));

        assert_eq!(cue, Some(AnimationCue::WalkStarted));
        assert_eq!(position.value, pos(2.0, 0.0));
        assert_eq!(facing.direction, pos(1.0, 0.0));
        assert!(mover.is_moving());
    }

    #[test]
    fn test_stops_inside_arrival_threshold() {
        let mut position = Position::new(pos(0.0, 0.0));
        let mut facing = Facing::default();
        let mut mover = Mover::new(position.value, Fixed::from_num(4));
        mover.move_to(pos(3.0, 0.0));

        let dt = Fixed::from_num(0.25);
        let mut cues = Vec::new();
        for _ in 0..4 {
            cues.extend(step_mover(1, &mut position, &mut facing, &mut mover, &[], dt));
        }

        // 1 unit per tick: 1, 2, then within 1.0 of the target
        assert_eq!(position.value, pos(2.0, 0.0));
        assert!(!mover.is_moving());
        assert_eq!(cues, vec![AnimationCue::WalkStarted, AnimationCue::WalkStopped]);
    }

    #[test]
    fn test_step_never_overshoots() {
        let mut position = Position::new(pos(0.0, 0.0));
        let mut facing = Facing::default();
        let mut mover = Mover::new(position.value, Fixed::from_num(100));
        mover.move_to(pos(3.0, 4.0));

        step_mover(1, &mut position, &mut facing, &mut mover, &[], Fixed::ONE);
        assert_eq!(position.value, pos(3.0, 4.0));
    }

    #[test]
    fn test_separation_pushes_apart_while_idle() {
        let neighbors = vec![(1, pos(0.0, 0.0)), (2, pos(1.0, 0.0))];
        let dt = Fixed::ONE;

        let push = separation_offset(1, pos(0.0, 0.0), &neighbors, dt);
        assert_eq!(push, pos(-0.5, 0.0));

        let mut position = Position::new(pos(0.0, 0.0));
        let mut facing = Facing::default();
        let mut mover = Mover::new(position.value, DEFAULT_SPEED);
        let cue = step_mover(1, &mut position, &mut facing, &mut mover, &neighbors, dt);
        assert_eq!(cue, None);
        assert_eq!(position.value, pos(-0.5, 0.0));
    }

    #[test]
    fn test_closer_neighbor_pushes_harder() {
        let close = separation_offset(1, pos(0.0, 0.0), &[(2, pos(0.5, 0.0))], Fixed::ONE);
        let far = separation_offset(1, pos(0.0, 0.0), &[(2, pos(1.0, 0.0))], Fixed::ONE);
        assert_eq!(close, pos(-1.0, 0.0));
        assert_eq!(far, pos(-0.5, 0.0));

        // Weights 2 and 1 in opposite directions: the closer one wins.
        let neighbors = vec![(2, pos(0.5, 0.0)), (3, pos(-1.0, 0.0))];
        let push = separation_offset(1, pos(0.0, 0.0), &neighbors, Fixed::ONE);
        assert_eq!(push, pos(-0.25, 0.0));
    }

    #[test]
    fn test_separation_averages_neighbors() {
        let neighbors = vec![(2, pos(1.0, 0.0)), (3, pos(-1.0, 0.0))];
        let push = separation_offset(1, pos(0.0, 0.0), &neighbors, Fixed::ONE);
        assert_eq!(push, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_separation_ignores_far_and_coincident_neighbors() {
        let neighbors = vec![(2, pos(1.5, 0.0)), (3, pos(0.0, 0.0)), (4, pos(0.0, 5.0))];
        let push = separation_offset(1, pos(0.0, 0.0), &neighbors, Fixed::ONE);
        assert_eq!(push, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_active_set_registration() {
        let mut set = ActiveSet::new();
        assert!(set.register(3));
        assert!(!set.register(3));
        assert!(set.register(1));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(set.deregister(3));
        assert!(!set.contains(3));
        assert_eq!(set.len(), 1);
    }
}
