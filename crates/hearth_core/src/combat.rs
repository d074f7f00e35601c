//! Target pursuit and attack cycles.
//!
//! An attacker with a target walks toward it until the target is within
//! range, then stops, faces it and starts an attack cycle. A cycle begins by
//! emitting an [`AnimationCue::Attack`]; the animation layer reports the end
//! of the swing through [`Simulation::end_attack`](crate::simulation::Simulation::end_attack),
//! which applies damage and re-arms the attacker. Damage is flat: the
//! attacker's `damage` minus the target's armor.

use serde::{Deserialize, Serialize};

use crate::components::{AnimationCue, EntityId, Facing, UnitStats};
use crate::data::AttackData;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::movement::Mover;

/// Attack role component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attacker {
    target: Option<EntityId>,
    attacking: bool,
    approaching: bool,
    #[serde(with = "fixed_serde")]
    range: Fixed,
    #[serde(with = "fixed_serde")]
    attack_speed: Fixed,
}

impl Attacker {
    /// Create an attacker with no target.
    #[must_use]
    pub const fn new(data: AttackData) -> Self {
        Self {
            target: None,
            attacking: false,
            approaching: false,
            range: data.range,
            attack_speed: data.attack_speed,
        }
    }

    /// Current target.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Whether an attack cycle is in progress.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.attacking
    }

    /// Engagement range.
    #[must_use]
    pub const fn range(&self) -> Fixed {
        self.range
    }

    /// Attack animation playback rate.
    #[must_use]
    pub const fn attack_speed(&self) -> Fixed {
        self.attack_speed
    }

    /// Set a new target. Any running cycle is abandoned.
    pub fn attack_target(&mut self, target: EntityId) {
        self.target = Some(target);
        self.attacking = false;
        self.approaching = false;
    }

    /// Drop the target.
    pub fn cancel_attack(&mut self) {
        self.target = None;
        self.attacking = false;
        self.approaching = false;
    }

    /// Close the running attack cycle.
    ///
    /// Returns the target to damage, or `None` when no cycle was running.
    pub fn end_attack(&mut self) -> Option<EntityId> {
        if !self.attacking {
            return None;
        }
        self.attacking = false;
        self.target
    }
}

/// What one attacker did this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackStep {
    /// No target; nothing to do.
    Idle,
    /// The target is gone and was dropped.
    TargetLost(EntityId),
    /// Walking toward the target. `started` is set on the first tick of the approach.
    Approaching {
        /// Whether this tick began the approach.
        started: bool,
    },
    /// In range; a new attack cycle began this tick.
    AttackStarted {
        /// Target being attacked.
        target: EntityId,
        /// Cue for the animation layer.
        cue: AnimationCue,
    },
    /// In range with a cycle already running.
    Swinging,
}

/// Advance one attacker.
///
/// `target_position` is the target's current position, or `None` when the
/// target no longer exists.
pub fn step_attacker(
    position: Vec2Fixed,
    facing: &mut Facing,
    mover: &mut Mover,
    attacker: &mut Attacker,
    target_position: Option<Vec2Fixed>,
) -> AttackStep {
    let Some(target) = attacker.target else {
        return AttackStep::Idle;
    };

    let Some(target_pos) = target_position else {
        attacker.cancel_attack();
        return AttackStep::TargetLost(target);
    };

    let range_sq = attacker.range.saturating_mul(attacker.range);
    if position.distance_squared(target_pos) > range_sq {
        mover.move_to(target_pos);
        let started = !attacker.approaching;
        attacker.approaching = true;
        return AttackStep::Approaching { started };
    }

    attacker.approaching = false;
    mover.stop(position);
    facing.look_along(target_pos - position);

    if attacker.attacking {
        return AttackStep::Swinging;
    }

    attacker.attacking = true;
    AttackStep::AttackStarted {
        target,
        cue: AnimationCue::Attack {
            speed: attacker.attack_speed,
        },
    }
}

/// Damage one hit deals. Targets without stats (buildings) take the full amount.
#[must_use]
pub fn hit_damage(attacker: &UnitStats, target: Option<&UnitStats>) -> u32 {
    target.map_or(attacker.damage, |stats| stats.mitigate(attacker.damage, false))
}

/// Events generated by combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An attack cycle began.
    AttackStarted {
        /// Attacking unit.
        attacker: EntityId,
        /// Its target.
        target: EntityId,
    },
    /// A cycle ended and damage was applied.
    Damaged {
        /// Attacking unit.
        attacker: EntityId,
        /// Damaged entity.
        target: EntityId,
        /// Health removed.
        amount: u32,
    },
    /// The target disappeared before the attacker reached it.
    TargetLost {
        /// Attacking unit.
        attacker: EntityId,
        /// Vanished target.
        target: EntityId,
    },
}
