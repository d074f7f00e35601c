//! Building data structures for data-driven building definitions.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     name: "Barracks",
///     cost: 150,
///     construction_time: "12",
///     type_tag: "Military",
///     health: 800,
///     radius: "2",
///     trains: ["Soldier", "Archer"],
///     spawn_offset: (x: "0", y: "-3"),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildingData {
    /// Unique name.
    pub name: String,

    /// Gold cost to place.
    #[serde(default = "default_cost")]
    pub cost: i64,

    /// Seconds of work at rate 1.
    #[serde(default = "default_construction_time", with = "fixed_serde")]
    pub construction_time: Fixed,

    /// Declared type; decides the production role on completion.
    #[serde(default = "default_type_tag")]
    pub type_tag: String,

    /// Maximum health points.
    #[serde(default = "default_health")]
    pub health: u32,

    /// Pick/arrival radius.
    #[serde(default = "default_radius", with = "fixed_serde")]
    pub radius: Fixed,

    /// Whether collectors deliver cargo here.
    #[serde(default)]
    pub depot: bool,

    /// Unit names this building trains once it has the military role.
    #[serde(default)]
    pub trains: Vec<String>,

    /// Where trained units appear, relative to the building.
    #[serde(default)]
    pub spawn_offset: Vec2Fixed,
}

const fn default_cost() -> i64 {
    100
}

fn default_construction_time() -> Fixed {
    Fixed::from_num(10)
}

fn default_type_tag() -> String {
    "Basic".to_string()
}

const fn default_health() -> u32 {
    500
}

fn default_radius() -> Fixed {
    Fixed::ONE
}
