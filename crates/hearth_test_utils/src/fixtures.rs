//! Test fixtures and helpers.
//!
//! Pre-built catalogs and a small world builder for consistent testing.

use fixed::types::I32F32;
use hearth_core::data::{AttackData, BuildingData, Catalog, CollectorData, UnitData};
use hearth_core::economy::{ResourceNode, ResourceType};
use hearth_core::factions::FactionId;
use hearth_core::math::Vec2Fixed;
use hearth_core::components::{EntityId, UnitStats};
use hearth_core::selection::{SelectionController, SelectionSettings};
use hearth_core::simulation::{Simulation, TickEvents};
use hearth_core::viewport::TopDownViewport;

/// Faction the fixtures' player controls.
pub const PLAYER: &str = "player";

/// Faction used for hostile fixtures.
pub const ENEMY: &str = "enemy";

/// Pixels per world unit of the fixture viewport.
pub const PIXELS_PER_UNIT: i32 = 10;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a vector from float coordinates (for tests only).
#[must_use]
pub fn vec2(x: f64, y: f64) -> Vec2Fixed {
    Vec2Fixed::new(fixed_f(x), fixed_f(y))
}

/// A frame delta that is exact in binary: 0.25 s.
#[must_use]
pub fn quarter_second() -> I32F32 {
    I32F32::from_bits(1 << 30)
}

/// Screen position of a world point under the fixture viewport.
#[must_use]
pub fn screen_of(world: Vec2Fixed) -> Vec2Fixed {
    world.scale(fixed(PIXELS_PER_UNIT))
}

/// Catalog with a collector, a soldier, a depot hall and a barracks.
///
/// Building indices: `0` = Hall, `1` = Barracks, `2` = Farm.
#[must_use]
pub fn sample_catalog() -> Catalog {
    Catalog {
        units: vec![
            UnitData {
                name: "Peasant".to_string(),
                cost: 50,
                train_time: fixed(2),
                health: 60,
                stats: UnitStats {
                    damage: 5,
                    armor: 0,
                    speed: fixed(4),
                },
                radius: fixed_f(0.5),
                collector: Some(CollectorData::default()),
                attack: None,
            },
            UnitData {
                name: "Soldier".to_string(),
                cost: 80,
                train_time: fixed(4),
                health: 100,
                stats: UnitStats {
                    damage: 25,
                    armor: 5,
                    speed: fixed(4),
                },
                radius: fixed_f(0.5),
                collector: None,
                attack: Some(AttackData::default()),
            },
        ],
        buildings: vec![
            BuildingData {
                name: "Hall".to_string(),
                cost: 200,
                construction_time: fixed(20),
                type_tag: "Basic".to_string(),
                health: 1000,
                radius: fixed(2),
                depot: true,
                trains: vec!["Peasant".to_string()],
                spawn_offset: vec2(0.0, -3.0),
            },
            BuildingData {
                name: "Barracks".to_string(),
                cost: 150,
                construction_time: fixed(4),
                type_tag: "Military".to_string(),
                health: 800,
                radius: fixed(2),
                depot: false,
                trains: vec!["Soldier".to_string(), "Peasant".to_string()],
                spawn_offset: vec2(0.0, -3.0),
            },
            BuildingData {
                name: "Farm".to_string(),
                cost: 60,
                construction_time: fixed(8),
                type_tag: "Resource".to_string(),
                health: 300,
                radius: fixed(1),
                depot: false,
                trains: Vec::new(),
                spawn_offset: Vec2Fixed::ZERO,
            },
        ],
    }
}

/// A simulation plus the handful of helpers most tests need.
#[derive(Debug)]
pub struct TestWorld {
    /// The simulation under test.
    pub sim: Simulation,
    /// The local player's faction.
    pub player: FactionId,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Empty world using [`sample_catalog`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            sim: Simulation::with_catalog(sample_catalog()),
            player: FactionId::new(PLAYER),
        }
    }

    /// Set the player's Gold.
    #[must_use]
    pub fn with_gold(mut self, amount: i64) -> Self {
        let current = self.sim.ledger().get_resource("Gold");
        self.sim.ledger_mut().add_resource("Gold", amount - current);
        self
    }

    /// Spawn a player collector.
    pub fn peasant(&mut self, at: Vec2Fixed) -> EntityId {
        let player = self.player.clone();
        self.unit("Peasant", at, &player)
    }

    /// Spawn a player soldier.
    pub fn soldier(&mut self, at: Vec2Fixed) -> EntityId {
        let player = self.player.clone();
        self.unit("Soldier", at, &player)
    }

    /// Spawn a hostile soldier.
    pub fn enemy_soldier(&mut self, at: Vec2Fixed) -> EntityId {
        self.unit("Soldier", at, &FactionId::new(ENEMY))
    }

    /// Spawn a catalog unit for `faction`.
    ///
    /// # Panics
    ///
    /// Panics if the fixture catalog has no such unit.
    pub fn unit(&mut self, name: &str, at: Vec2Fixed, faction: &FactionId) -> EntityId {
        let data = self
            .sim
            .catalog()
            .unit(name)
            .cloned()
            .unwrap_or_else(|| panic!("fixture catalog has no unit '{name}'"));
        self.sim.spawn_unit(&data, at, faction)
    }

    /// Spawn a catalog building for the player.
    ///
    /// # Panics
    ///
    /// Panics if the fixture catalog has no such building.
    pub fn building(&mut self, name: &str, at: Vec2Fixed, completed: bool) -> EntityId {
        let data = self
            .sim
            .catalog()
            .building(name)
            .cloned()
            .unwrap_or_else(|| panic!("fixture catalog has no building '{name}'"));
        let player = self.player.clone();
        self.sim.spawn_building(&data, at, &player, completed)
    }

    /// Spawn a finished delivery hall.
    pub fn hall(&mut self, at: Vec2Fixed) -> EntityId {
        self.building("Hall", at, true)
    }

    /// Spawn a finished barracks.
    pub fn barracks(&mut self, at: Vec2Fixed) -> EntityId {
        self.building("Barracks", at, true)
    }

    /// Spawn a resource node open to everyone.
    pub fn node(&mut self, kind: ResourceType, amount: u32, at: Vec2Fixed) -> EntityId {
        self.sim.spawn_resource_node(ResourceNode::new(kind, amount), at)
    }

    /// Run `ticks` ticks of `dt`, returning every tick's events.
    pub fn run_for(&mut self, ticks: usize, dt: I32F32) -> Vec<TickEvents> {
        (0..ticks).map(|_| self.sim.tick(dt)).collect()
    }

    /// Selection controller over the fixture viewport.
    #[must_use]
    pub fn controller(&self) -> SelectionController {
        let settings = SelectionSettings {
            player_faction: self.player.clone(),
            ..SelectionSettings::default()
        };
        SelectionController::new(
            settings,
            Some(Box::new(TopDownViewport::new(Vec2Fixed::ZERO, fixed(PIXELS_PER_UNIT)))),
        )
    }
}
