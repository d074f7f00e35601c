//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::components::UnitStats;
use crate::math::{fixed_serde, Fixed};

/// Gathering and building capability.
///
/// Units with this block act as collectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectorData {
    /// Resources harvested per second.
    #[serde(default = "one", with = "fixed_serde")]
    pub gather_rate: Fixed,

    /// Maximum cargo carried at once.
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Multiplier applied to a construction site's rate on arrival.
    #[serde(default = "one", with = "fixed_serde")]
    pub build_speed: Fixed,
}

impl Default for CollectorData {
    fn default() -> Self {
        Self {
            gather_rate: one(),
            capacity: default_capacity(),
            build_speed: one(),
        }
    }
}

/// Melee/ranged attack capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttackData {
    /// Distance at which the unit stops and attacks.
    #[serde(default = "default_range", with = "fixed_serde")]
    pub range: Fixed,

    /// Playback rate of the attack animation.
    #[serde(default = "one", with = "fixed_serde")]
    pub attack_speed: Fixed,
}

impl Default for AttackData {
    fn default() -> Self {
        Self {
            range: default_range(),
            attack_speed: one(),
        }
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     name: "Peasant",
///     cost: 50,
///     train_time: "5",
///     health: 60,
///     stats: (damage: 5, armor: 0, speed: "4.5"),
///     collector: Some((gather_rate: "1", capacity: 10, build_speed: "2")),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitData {
    /// Unique name, referenced by building rosters.
    pub name: String,

    /// Gold cost to train.
    #[serde(default)]
    pub cost: i64,

    /// Seconds to train.
    #[serde(default = "one", with = "fixed_serde")]
    pub train_time: Fixed,

    /// Maximum health points.
    #[serde(default = "default_health")]
    pub health: u32,

    /// Combat and locomotion stats.
    #[serde(default)]
    pub stats: UnitStats,

    /// Pick/arrival radius.
    #[serde(default = "default_radius", with = "fixed_serde")]
    pub radius: Fixed,

    /// Gathering capability (None for non-collectors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector: Option<CollectorData>,

    /// Attack capability (None for non-combatants).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackData>,
}

impl UnitData {
    /// Check if this unit can gather and build.
    #[must_use]
    pub const fn is_collector(&self) -> bool {
        self.collector.is_some()
    }
}

fn one() -> Fixed {
    Fixed::ONE
}

const fn default_capacity() -> u32 {
    10
}

const fn default_health() -> u32 {
    100
}

fn default_range() -> Fixed {
    Fixed::from_num(2)
}

fn default_radius() -> Fixed {
    Fixed::from_num(0.5)
}
