//! Component definitions.
//!
//! Components are plain data attached to [`Entity`](crate::simulation::Entity)
//! slots. Behavior that belongs to a single component lives on the component;
//! anything that needs to look at other entities lives in the role modules.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Position component in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// World position on the ground plane.
    pub value: Vec2Fixed,
}

impl Position {
    /// Create a new position at the given coordinates.
    #[must_use]
    pub const fn new(value: Vec2Fixed) -> Self {
        Self { value }
    }
}

/// Direction an entity is facing, as a unit vector on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Facing {
    /// Normalized heading. Zero means "never turned".
    pub direction: Vec2Fixed,
}

impl Facing {
    /// Turn to face along `delta`. A zero delta leaves the heading alone.
    pub fn look_along(&mut self, delta: Vec2Fixed) {
        let direction = delta.normalize();
        if direction != Vec2Fixed::ZERO {
            self.direction = direction;
        }
    }
}

/// Collision/pick volume used for arrival checks and pointer hit-tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Radius on the ground plane.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

impl Footprint {
    /// Create a footprint with the given radius.
    #[must_use]
    pub const fn new(radius: Fixed) -> Self {
        Self { radius }
    }
}

impl Default for Footprint {
    fn default() -> Self {
        Self::new(Fixed::from_bits(1 << 31)) // 0.5
    }
}

/// Marker for entities the player can select with the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selectable;

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Heal the entity, returning actual amount healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.max.saturating_sub(self.current));
        self.current += actual;
        actual
    }
}

/// Per-unit combat and locomotion statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    /// Damage dealt per completed attack cycle.
    pub damage: u32,
    /// Flat reduction applied to non-magical damage.
    pub armor: u32,
    /// Movement speed in world units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            damage: 20,
            armor: 10,
            speed: Fixed::from_num(5),
        }
    }
}

impl UnitStats {
    /// Damage that gets through after armor. Magical damage ignores armor.
    #[must_use]
    pub const fn mitigate(&self, amount: u32, magical: bool) -> u32 {
        if magical {
            amount
        } else {
            amount.saturating_sub(self.armor)
        }
    }
}

/// Animation cues for the external animation system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationCue {
    /// Locomotion started.
    WalkStarted,
    /// Locomotion stopped.
    WalkStopped,
    /// An attack cycle began; the animation system reports its end via
    /// [`Simulation::end_attack`](crate::simulation::Simulation::end_attack).
    Attack {
        /// Playback rate multiplier for the attack clip.
        #[serde(with = "fixed_serde")]
        speed: Fixed,
    },
}

/// Visual effects the render layer should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Construction dust/sound stop and the finished model is shown.
    ConstructionFinished,
}

/// Requests from the core to the render/engine boundary.
///
/// The core never renders; it only emits these and lets the engine act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationEvent {
    /// Play an animation cue on an entity.
    Animation {
        /// Animated entity.
        entity: EntityId,
        /// Cue to play.
        cue: AnimationCue,
    },
    /// Tint an under-construction building by its progress (0 = scaffold, 1 = finished).
    ConstructionTint {
        /// Building being tinted.
        building: EntityId,
        /// Progress in `[0, 1]`.
        #[serde(with = "fixed_serde")]
        progress: Fixed,
    },
    /// Restore the building's original material.
    RestoreMaterial(EntityId),
    /// Play a one-shot effect on an entity.
    Effect {
        /// Entity the effect is attached to.
        entity: EntityId,
        /// Which effect.
        effect: EffectKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_and_heal_clamp() {
        let mut health = Health::new(100);
        assert_eq!(health.apply_damage(30), 30);
        assert_eq!(health.heal(50), 30);
        assert_eq!(health.current, 100);
        assert_eq!(health.apply_damage(500), 100);
        assert!(health.is_dead());
    }

    #[test]
    fn test_armor_mitigation() {
        let stats = UnitStats::default();
        assert_eq!(stats.mitigate(25, false), 15);
        assert_eq!(stats.mitigate(5, false), 0);
        assert_eq!(stats.mitigate(25, true), 25);
    }

    #[test]
    fn test_facing_ignores_zero_delta() {
        let mut facing = Facing::default();
        facing.look_along(Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(3)));
        assert_eq!(facing.direction, Vec2Fixed::new(Fixed::ZERO, Fixed::ONE));
        facing.look_along(Vec2Fixed::ZERO);
        assert_eq!(facing.direction, Vec2Fixed::new(Fixed::ZERO, Fixed::ONE));
    }
}
