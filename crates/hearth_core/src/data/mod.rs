//! Data structures for the unit and building catalog.
//!
//! This module contains pure data structures that describe every unit and
//! building the game knows about. All structs are designed to be
//! deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `hearth_headless`.

mod building_data;
mod unit_data;

use serde::{Deserialize, Serialize};

pub use building_data::BuildingData;
pub use unit_data::{AttackData, CollectorData, UnitData};

use crate::error::GameError;
use crate::math::Fixed;
use crate::production::TrainingOption;

/// Every unit and building definition available to a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    /// Trainable/spawnable units.
    #[serde(default)]
    pub units: Vec<UnitData>,
    /// Placeable buildings, in construction-menu order.
    #[serde(default)]
    pub buildings: Vec<BuildingData>,
}

impl Catalog {
    /// Look up a unit by name.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&UnitData> {
        self.units.iter().find(|unit| unit.name == name)
    }

    /// Look up a building by name.
    #[must_use]
    pub fn building(&self, name: &str) -> Option<&BuildingData> {
        self.buildings.iter().find(|building| building.name == name)
    }

    /// Build the training roster for a building.
    ///
    /// Roster entries that name unknown units are skipped.
    #[must_use]
    pub fn roster_for(&self, building: &BuildingData) -> Vec<TrainingOption> {
        building
            .trains
            .iter()
            .filter_map(|name| self.unit(name))
            .map(|unit| TrainingOption {
                unit: unit.name.clone(),
                cost: unit.cost,
                time: unit.train_time,
            })
            .collect()
    }

    /// Check the catalog for inconsistencies.
    ///
    /// Returns one [`GameError::InvalidCatalog`] per problem found. Times
    /// and rates must be positive: a zero or negative value would stall a
    /// timer or run it backwards.
    #[must_use]
    pub fn validate(&self) -> Vec<GameError> {
        let mut problems = Vec::new();

        for (i, unit) in self.units.iter().enumerate() {
            if self.units[..i].iter().any(|other| other.name == unit.name) {
                problems.push(invalid(&unit.name, "duplicate unit name"));
            }
            if unit.cost < 0 {
                problems.push(invalid(&unit.name, "negative cost"));
            }
            check_positive(&mut problems, &unit.name, "train_time", unit.train_time);
            if let Some(collector) = &unit.collector {
                check_positive(&mut problems, &unit.name, "gather_rate", collector.gather_rate);
                check_positive(&mut problems, &unit.name, "build_speed", collector.build_speed);
            }
        }

        for (i, building) in self.buildings.iter().enumerate() {
            if self.buildings[..i]
                .iter()
                .any(|other| other.name == building.name)
            {
                problems.push(invalid(&building.name, "duplicate building name"));
            }
            if building.cost < 0 {
                problems.push(invalid(&building.name, "negative cost"));
            }
            check_positive(
                &mut problems,
                &building.name,
                "construction_time",
                building.construction_time,
            );
            for unit in &building.trains {
                if self.unit(unit).is_none() {
                    problems.push(invalid(&building.name, format!("trains unknown unit '{unit}'")));
                }
            }
        }

        problems
    }
}

fn invalid(entry: &str, problem: impl Into<String>) -> GameError {
    GameError::InvalidCatalog {
        entry: entry.to_string(),
        problem: problem.into(),
    }
}

fn check_positive(problems: &mut Vec<GameError>, entry: &str, field: &str, value: Fixed) {
    if value <= Fixed::ZERO {
        problems.push(invalid(entry, format!("{field} must be positive, got {value}")));
    }
}
