//! Scenario loading and validation.
//!
//! A scenario is a RON file that sets up a match for headless runs: the
//! unit and building catalog, the player's starting stockpile, the
//! entities on the field and a timeline of orders. Entities and sites can
//! carry labels so orders can refer to them before they have IDs.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use hearth_core::data::Catalog;
use hearth_core::economy::{ResourceType, DEFAULT_NODE_QUANTITY};
use hearth_core::factions::HarvestRights;
use hearth_core::math::Vec2Fixed;
use hearth_core::simulation::TICK_RATE;
use hearth_core::viewport::TopDownViewport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The catalog failed validation.
    #[error("Catalog has {} problem(s): {}", .0.len(), .0.join("; "))]
    InvalidCatalog(Vec<String>),
    /// A placement names a template the catalog lacks.
    #[error("Unknown {kind} '{name}'")]
    UnknownTemplate {
        /// "unit" or "building".
        kind: &'static str,
        /// The missing template name.
        name: String,
    },
    /// Two entities share a label.
    #[error("Duplicate entity label '{0}'")]
    DuplicateLabel(String),
    /// An order refers to a label nothing defines.
    #[error("Order at tick {tick} references unknown label '{label}'")]
    UnknownLabel {
        /// Tick the order is scheduled for.
        tick: u64,
        /// The unresolved label.
        label: String,
    },
    /// The tick rate is zero.
    #[error("Tick rate must be positive")]
    ZeroTickRate,
}

/// What to put on the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spawn {
    /// A unit from the catalog.
    Unit {
        /// Unit template name.
        kind: String,
        /// Owner; the scenario player when absent.
        #[serde(default)]
        faction: Option<String>,
    },
    /// A building from the catalog.
    Building {
        /// Building template name.
        kind: String,
        /// Owner; the scenario player when absent.
        #[serde(default)]
        faction: Option<String>,
        /// Start finished rather than as a site.
        #[serde(default = "default_completed")]
        completed: bool,
    },
    /// A resource node.
    Node {
        /// What it yields.
        resource: ResourceType,
        /// Starting quantity.
        #[serde(default = "default_node_amount")]
        amount: u32,
        /// Who may harvest it.
        #[serde(default)]
        rights: HarvestRights,
    },
}

fn default_completed() -> bool {
    true
}

fn default_node_amount() -> u32 {
    DEFAULT_NODE_QUANTITY
}

/// A labelled entity placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Name orders use to refer to this entity.
    #[serde(default)]
    pub label: Option<String>,
    /// World position.
    pub at: Vec2Fixed,
    /// What to spawn.
    pub spawn: Spawn,
}

/// An order, with entities referred to by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Send a collector to a node.
    Gather {
        /// The collector.
        unit: String,
        /// The node.
        node: String,
    },
    /// Send a collector to help on a site.
    Build {
        /// The collector.
        unit: String,
        /// The construction site.
        site: String,
    },
    /// Attack a target.
    Attack {
        /// The attacker.
        unit: String,
        /// The target.
        target: String,
    },
    /// Walk to a point.
    Move {
        /// The unit.
        unit: String,
        /// Destination.
        to: Vec2Fixed,
    },
    /// Drop every order.
    Stop {
        /// The unit.
        unit: String,
    },
    /// Queue roster entry `index` at a building.
    Train {
        /// The production building.
        building: String,
        /// Roster index.
        index: usize,
    },
    /// Place construction site `index` from the catalog.
    Place {
        /// Building index in the catalog.
        index: usize,
        /// Site position.
        at: Vec2Fixed,
        /// Collector sent to build it.
        #[serde(default)]
        worker: Option<String>,
        /// Label for the new site.
        #[serde(default)]
        label: Option<String>,
    },
}

impl Order {
    /// Labels this order reads.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Gather { unit, node } => vec![unit.as_str(), node.as_str()],
            Self::Build { unit, site } => vec![unit.as_str(), site.as_str()],
            Self::Attack { unit, target } => vec![unit.as_str(), target.as_str()],
            Self::Move { unit, .. } | Self::Stop { unit } => vec![unit.as_str()],
            Self::Train { building, .. } => vec![building.as_str()],
            Self::Place { worker, .. } => worker.iter().map(String::as_str).collect(),
        }
    }

    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gather { .. } => "gather",
            Self::Build { .. } => "build",
            Self::Attack { .. } => "attack",
            Self::Move { .. } => "move",
            Self::Stop { .. } => "stop",
            Self::Train { .. } => "train",
            Self::Place { .. } => "place",
        }
    }
}

/// An order issued once the simulation has run `tick` ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOrder {
    /// Ticks completed before the order is issued.
    pub tick: u64,
    /// The order.
    pub order: Order,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// The local player's faction.
    #[serde(default = "default_player")]
    pub player: String,
    /// Inline catalog, used when `catalog_file` is absent.
    #[serde(default)]
    pub catalog: Catalog,
    /// Catalog RON file, relative to the scenario file.
    #[serde(default)]
    pub catalog_file: Option<String>,
    /// Starting stockpile.
    #[serde(default)]
    pub stockpile: BTreeMap<ResourceType, i64>,
    /// Initial entities, spawned in order.
    #[serde(default)]
    pub entities: Vec<Placement>,
    /// Order timeline.
    #[serde(default)]
    pub orders: Vec<TimedOrder>,
    /// Ticks to simulate.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Ticks per simulated second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Camera used to map pointer input onto the field.
    #[serde(default)]
    pub viewport: TopDownViewport,
}

fn default_player() -> String {
    "player".to_string()
}

fn default_ticks() -> u64 {
    u64::from(TICK_RATE) * 60
}

fn default_tick_rate() -> u32 {
    TICK_RATE
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// A `catalog_file` is resolved against the scenario's directory and
    /// replaces the inline catalog.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;

        if let Some(file) = &scenario.catalog_file {
            let base = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
            scenario.catalog = load_catalog(base.join(file))?;
        }
        tracing::debug!(
            name = %scenario.name,
            entities = scenario.entities.len(),
            orders = scenario.orders.len(),
            "Scenario loaded"
        );
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Check the catalog, every template name and every label.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let problems = self.catalog.validate();
        if !problems.is_empty() {
            return Err(ScenarioError::InvalidCatalog(
                problems.iter().map(ToString::to_string).collect(),
            ));
        }
        if self.tick_rate == 0 {
            return Err(ScenarioError::ZeroTickRate);
        }

        let mut labels = BTreeSet::new();
        for placement in &self.entities {
            match &placement.spawn {
                Spawn::Unit { kind, .. } if self.catalog.unit(kind).is_none() => {
                    return Err(ScenarioError::UnknownTemplate {
                        kind: "unit",
                        name: kind.clone(),
                    });
                }
                Spawn::Building { kind, .. } if self.catalog.building(kind).is_none() => {
                    return Err(ScenarioError::UnknownTemplate {
                        kind: "building",
                        name: kind.clone(),
                    });
                }
                _ => {}
            }
            if let Some(label) = &placement.label {
                if !labels.insert(label.as_str()) {
                    return Err(ScenarioError::DuplicateLabel(label.clone()));
                }
            }
        }

        for timed in self.timeline() {
            for label in timed.order.references() {
                if !labels.contains(label) {
                    return Err(ScenarioError::UnknownLabel {
                        tick: timed.tick,
                        label: label.to_string(),
                    });
                }
            }
            if let Order::Place {
                label: Some(label), ..
            } = &timed.order
            {
                if !labels.insert(label.as_str()) {
                    return Err(ScenarioError::DuplicateLabel(label.clone()));
                }
            }
        }
        Ok(())
    }

    /// Orders sorted by tick; orders on the same tick keep file order.
    pub fn timeline(&self) -> Vec<&TimedOrder> {
        let mut timeline: Vec<_> = self.orders.iter().collect();
        timeline.sort_by_key(|timed| timed.tick);
        timeline
    }
}

/// Load a unit and building catalog from a RON file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, ScenarioError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)?;
    let catalog: Catalog = ron::from_str(&contents)?;
    tracing::debug!(
        path = %path.display(),
        units = catalog.units.len(),
        buildings = catalog.buildings.len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"(
        name: "Two peasants",
        catalog: (
            units: [(name: "Peasant", cost: 50, collector: Some(()))],
            buildings: [(name: "Hall", depot: true)],
        ),
        stockpile: {Gold: 100},
        entities: [
            (label: Some("hall"), at: (x: "0", y: "0"), spawn: Building(kind: "Hall")),
            (label: Some("p1"), at: (x: "2", y: "0"), spawn: Unit(kind: "Peasant")),
            (label: Some("gold"), at: (x: "8", y: "0"), spawn: Node(resource: Gold, amount: 50)),
        ],
        orders: [
            (tick: 20, order: Move(unit: "p1", to: (x: "1", y: "1"))),
            (tick: 0, order: Gather(unit: "p1", node: "gold")),
        ],
        ticks: 100,
    )"#;

    #[test]
    fn test_parse_scenario_with_defaults() {
        let scenario = Scenario::from_ron_str(SCENARIO).expect("valid scenario");
        assert_eq!(scenario.player, "player");
        assert_eq!(scenario.tick_rate, TICK_RATE);
        assert_eq!(scenario.viewport, TopDownViewport::default());
        assert_eq!(scenario.stockpile.get(&ResourceType::Gold), Some(&100));
        assert!(matches!(
            scenario.entities[0].spawn,
            Spawn::Building {
                completed: true,
                ..
            }
        ));
        scenario.validate().expect("consistent scenario");
    }

    #[test]
    fn test_node_amount_defaults() {
        let placement: Placement =
            ron::from_str(r#"(at: (x: "3", y: "4"), spawn: Node(resource: Wood))"#).expect("valid placement");
        assert!(matches!(
            placement.spawn,
            Spawn::Node {
                resource: ResourceType::Wood,
                amount: DEFAULT_NODE_QUANTITY,
                ..
            }
        ));
    }

    #[test]
    fn test_timeline_is_sorted_by_tick() {
        let scenario = Scenario::from_ron_str(SCENARIO).expect("valid scenario");
        let ticks: Vec<u64> = scenario.timeline().iter().map(|t| t.tick).collect();
        assert_eq!(ticks, vec![0, 20]);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let mut scenario = Scenario::from_ron_str(SCENARIO).expect("valid scenario");
        scenario.orders.push(TimedOrder {
            tick: 5,
            order: Order::Stop {
                unit: "ghost".to_string(),
            },
        });
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::UnknownLabel { tick: 5, label }) if label == "ghost"
        ));
    }

    #[test]
    fn test_unknown_template_is_rejected() {
        let mut scenario = Scenario::from_ron_str(SCENARIO).expect("valid scenario");
        scenario.entities.push(Placement {
            label: None,
            at: Vec2Fixed::ZERO,
            spawn: Spawn::Unit {
                kind: "Dragon".to_string(),
                faction: None,
            },
        });
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::UnknownTemplate { kind: "unit", .. })
        ));
    }

    #[test]
    fn test_placed_site_label_is_usable_later() {
        let mut scenario = Scenario::from_ron_str(SCENARIO).expect("valid scenario");
        scenario.orders.push(TimedOrder {
            tick: 1,
            order: Order::Place {
                index: 0,
                at: Vec2Fixed::ZERO,
                worker: Some("p1".to_string()),
                label: Some("site".to_string()),
            },
        });
        scenario.orders.push(TimedOrder {
            tick: 2,
            order: Order::Build {
                unit: "p1".to_string(),
                site: "site".to_string(),
            },
        });
        scenario.validate().expect("site label resolves");
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("does/not/exist.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
