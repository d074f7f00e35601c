//! Core simulation loop.
//!
//! The simulation owns every entity, the player's resource ledger and the
//! catalog, and advances them with a frame delta. It is the single writer of
//! world state: controllers issue orders through its methods and observe
//! the results through [`TickEvents`].
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - Consistent iteration order (sorted entity IDs)
//! - Movement reads a neighbor snapshot taken at the start of the phase
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use hearth_core::simulation::{EntitySpawnParams, Simulation};
//! use hearth_core::math::{Fixed, Vec2Fixed};
//!
//! let mut sim = Simulation::new();
//!
//! let unit = sim.spawn_entity(EntitySpawnParams {
//!     position: Some(Vec2Fixed::ZERO),
//!     speed: Some(Fixed::from_num(2)),
//!     ..Default::default()
//! });
//!
//! sim.order_move(unit, Vec2Fixed::new(Fixed::from_num(10), Fixed::from_num(10)))
//!     .unwrap();
//! sim.tick(Fixed::from_num(0.25));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::buildings::{Construction, ConstructionEvent, ConstructionTick, ProductionRole};
use crate::collector::{Collector, CollectorContext};
use crate::combat::{hit_damage, step_attacker, AttackStep, Attacker, CombatEvent};
use crate::components::{
    AnimationCue, EffectKind, EntityId, Facing, Footprint, Health, Position, PresentationEvent,
    Selectable, UnitStats,
};
use crate::data::{AttackData, BuildingData, Catalog, CollectorData, UnitData};
use crate::economy::{Depot, EconomyEvent, ResourceLedger, ResourceNode, ResourceType};
use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::math::{Fixed, Vec2Fixed};
use crate::movement::{step_mover, ActiveSet, Mover, DEFAULT_SPEED};
use crate::production::{ProductionEvent, TrainingQueue};

/// Ticks per second for the fixed-step driver.
pub const TICK_RATE: u32 = 20;

/// Frame delta for one fixed step.
#[must_use]
pub fn tick_delta() -> Fixed {
    Fixed::ONE / Fixed::from_num(TICK_RATE)
}

/// An entity with optional components.
///
/// Entities are composed of optional components. Only components that are
/// `Some` are active for this entity. This allows flexible entity composition
/// without a full ECS framework.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Template name ("" for ad-hoc entities).
    pub name: String,
    /// World position (required for most entities).
    pub position: Option<Position>,
    /// Heading.
    pub facing: Facing,
    /// Pick/arrival radius.
    pub footprint: Option<Footprint>,
    /// Present if the player can select this entity.
    pub selectable: Option<Selectable>,
    /// Owning faction.
    pub faction: Option<FactionId>,
    /// Health for damageable entities.
    pub health: Option<Health>,
    /// Combat and locomotion stats.
    pub stats: Option<UnitStats>,
    /// Movement state.
    pub mover: Option<Mover>,
    /// Gather/build role.
    pub collector: Option<Collector>,
    /// Attack role.
    pub attacker: Option<Attacker>,
    /// Harvestable resource.
    pub resource_node: Option<ResourceNode>,
    /// Accepts cargo deliveries.
    pub depot: Option<Depot>,
    /// Construction progress for buildings.
    pub construction: Option<Construction>,
    /// Role gained on construction completion.
    pub role: Option<ProductionRole>,
    /// Training queue for production buildings.
    pub training: Option<TrainingQueue>,
}

impl Entity {
    /// Create a new entity with the given ID and no components.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Parameters for spawning a new entity.
///
/// Use this struct to specify which components the new entity should have.
/// All fields are optional - only provide the components you need. Giving a
/// speed, collector block or attack block makes the entity mobile and
/// registers it for movement and separation.
#[derive(Debug, Clone, Default)]
pub struct EntitySpawnParams {
    /// Template name.
    pub name: Option<String>,
    /// Initial position in world space.
    pub position: Option<Vec2Fixed>,
    /// Pick/arrival radius.
    pub radius: Option<Fixed>,
    /// Owning faction.
    pub faction: Option<FactionId>,
    /// Maximum health (entity starts at full health).
    pub health: Option<u32>,
    /// Combat and locomotion stats.
    pub stats: Option<UnitStats>,
    /// Movement speed in world units per second.
    pub speed: Option<Fixed>,
    /// Gather/build capability.
    pub collector: Option<CollectorData>,
    /// Attack capability.
    pub attack: Option<AttackData>,
    /// Harvestable resource.
    pub resource_node: Option<ResourceNode>,
    /// Whether collectors deliver here.
    pub depot: bool,
    /// Construction progress.
    pub construction: Option<Construction>,
    /// Training queue.
    pub training: Option<TrainingQueue>,
    /// Whether the player can select the entity.
    pub selectable: bool,
}

/// Storage for all entities in the simulation.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys when processing systems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStorage {
    /// Map of entity ID to entity data.
    entities: HashMap<EntityId, Entity>,
    /// Next entity ID to assign.
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }
}

/// Events generated during a simulation tick.
///
/// These events can be used by the game layer to trigger effects,
/// sounds, animations, etc. Events caused by orders issued between ticks
/// are delivered with the next tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Harvests, deliveries and depletions.
    pub economy: Vec<EconomyEvent>,
    /// Placement, acceleration and completion of buildings.
    pub construction: Vec<ConstructionEvent>,
    /// Training starts and finished units.
    pub production: Vec<ProductionEvent>,
    /// Attack cycles and damage.
    pub combat: Vec<CombatEvent>,
    /// Requests for the render layer.
    pub presentation: Vec<PresentationEvent>,
    /// Entities that died this tick.
    pub deaths: Vec<EntityId>,
    /// Entities spawned this tick.
    pub spawned: Vec<EntityId>,
}

/// The gameplay simulation.
///
/// # System Execution Order
///
/// Each tick, systems run in this order:
/// 1. **Attack** - Pursue targets, start attack cycles
/// 2. **Collectors** - Arrival checks, gather and build loops
/// 3. **Movement** - Separation then seek, for every active unit
/// 4. **Construction** - Advance sites, resolve completion
/// 5. **Training** - Advance jobs, spawn finished units
/// 6. **Health** - Remove dead entities
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    /// All entities in the simulation.
    entities: EntityStorage,
    /// Units taking part in movement and separation.
    active: ActiveSet,
    /// The player's stockpile.
    ledger: ResourceLedger,
    /// Unit and building templates.
    catalog: Catalog,
    /// Events from orders issued since the last tick.
    pending: TickEvents,
}

impl Simulation {
    /// Create a new empty simulation with an empty catalog.
    ///
    /// # Example
    ///
    /// ```
    /// use hearth_core::simulation::Simulation;
    ///
    /// let sim = Simulation::new();
    /// assert_eq!(sim.get_tick(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(Catalog::default())
    }

    /// Create a new empty simulation using `catalog` for training and placement.
    #[must_use]
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            tick: 0,
            entities: EntityStorage::new(),
            active: ActiveSet::new(),
            ledger: ResourceLedger::new(),
            catalog,
            pending: TickEvents::default(),
        }
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Get a reference to the entity storage.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Units registered for movement and separation.
    #[must_use]
    pub const fn active_units(&self) -> &ActiveSet {
        &self.active
    }

    /// The player's stockpile.
    #[must_use]
    pub const fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Mutable access to the stockpile.
    pub fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }

    /// Unit and building templates.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Runs all systems in deterministic order and increments the tick counter.
    /// Returns events generated during this tick for use by the game layer.
    ///
    /// # Example
    ///
    /// ```
    /// use hearth_core::simulation::{tick_delta, Simulation};
    ///
    /// let mut sim = Simulation::new();
    /// let events = sim.tick(tick_delta());
    /// assert_eq!(sim.get_tick(), 1);
    /// assert!(events.deaths.is_empty());
    /// ```
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        let mut events = std::mem::take(&mut self.pending);
        let entity_ids = self.entities.sorted_ids();

        self.run_attack_system(&entity_ids, &mut events);
        self.run_collector_system(&entity_ids, dt, &mut events);
        self.run_movement_system(dt, &mut events);
        self.run_construction_system(&entity_ids, dt, &mut events);
        self.run_training_system(&entity_ids, dt, &mut events);
        self.run_health_system(&mut events);

        self.tick += 1;
        events
    }

    // ========================================================================
    // Systems
    // ========================================================================

    fn run_attack_system(&mut self, entity_ids: &[EntityId], events: &mut TickEvents) {
        for &id in entity_ids {
            let Some(entity) = self.entities.get(id) else {
                continue;
            };
            let Some(attacker) = entity.attacker else {
                continue;
            };
            let Some(position) = entity.position.map(|p| p.value) else {
                continue;
            };
            let target_position = attacker
                .target()
                .and_then(|target| self.entities.get(target))
                .and_then(|target| target.position)
                .map(|p| p.value);

            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Entity {
                facing,
                mover,
                attacker,
                ..
            } = entity;
            let (Some(mover), Some(attacker)) = (mover.as_mut(), attacker.as_mut()) else {
                tracing::warn!(entity = id, "Attacker has no mover; skipped");
                continue;
            };

            let was_moving = mover.is_moving();
            let step = step_attacker(position, facing, mover, attacker, target_position);
            let stopped = was_moving && !mover.is_moving();

            match step {
                AttackStep::Idle | AttackStep::Swinging => {}
                AttackStep::Approaching { started } => {
                    if started {
                        tracing::debug!(entity = id, target = ?attacker.target(), "Approaching target");
                    }
                }
                AttackStep::TargetLost(target) => {
                    tracing::debug!(entity = id, target, "Attack target lost");
                    events.combat.push(CombatEvent::TargetLost {
                        attacker: id,
                        target,
                    });
                }
                AttackStep::AttackStarted { target, cue } => {
                    events.combat.push(CombatEvent::AttackStarted {
                        attacker: id,
                        target,
                    });
                    events
                        .presentation
                        .push(PresentationEvent::Animation { entity: id, cue });
                }
            }

            if stopped {
                events.presentation.push(PresentationEvent::Animation {
                    entity: id,
                    cue: AnimationCue::WalkStopped,
                });
            }
        }
    }

    fn run_collector_system(&mut self, entity_ids: &[EntityId], dt: Fixed, events: &mut TickEvents) {
        for &id in entity_ids {
            // Take the unit's own components out so the state machine can
            // look at the rest of the world.
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(position) = entity.position.map(|p| p.value) else {
                continue;
            };
            let Some(mut collector) = entity.collector.take() else {
                continue;
            };
            let Some(mut mover) = entity.mover.take() else {
                entity.collector = Some(collector);
                tracing::warn!(entity = id, "Collector has no mover; skipped");
                continue;
            };

            let mut ctx = CollectorContext {
                unit: id,
                position,
                mover: &mut mover,
                entities: &mut self.entities,
                ledger: &mut self.ledger,
                events: &mut *events,
            };
            collector.step(&mut ctx, dt);

            if let Some(entity) = self.entities.get_mut(id) {
                entity.collector = Some(collector);
                entity.mover = Some(mover);
            }
        }
    }

    fn run_movement_system(&mut self, dt: Fixed, events: &mut TickEvents) {
        let snapshot: Vec<(EntityId, Vec2Fixed)> = self
            .active
            .iter()
            .filter_map(|id| {
                let pos = self.entities.get(id)?.position?;
                Some((id, pos.value))
            })
            .collect();

        for &(id, _) in &snapshot {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Entity {
                position,
                facing,
                mover,
                ..
            } = entity;
            let (Some(position), Some(mover)) = (position.as_mut(), mover.as_mut()) else {
                continue;
            };

            if let Some(cue) = step_mover(id, position, facing, mover, &snapshot, dt) {
                events
                    .presentation
                    .push(PresentationEvent::Animation { entity: id, cue });
            }
        }
    }

    fn run_construction_system(&mut self, entity_ids: &[EntityId], dt: Fixed, events: &mut TickEvents) {
        for &id in entity_ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(site) = entity.construction.as_mut() else {
                continue;
            };

            match site.advance(dt) {
                ConstructionTick::AlreadyComplete => {}
                ConstructionTick::Progressed(progress) => {
                    events.presentation.push(PresentationEvent::ConstructionTint {
                        building: id,
                        progress,
                    });
                }
                ConstructionTick::Completed => {
                    let role = ProductionRole::from_type_tag(site.type_tag());
                    entity.role = Some(role);
                    if role.trains_units() && entity.training.is_none() {
                        let (roster, offset) = self
                            .catalog
                            .building(&entity.name)
                            .map(|data| (self.catalog.roster_for(data), data.spawn_offset))
                            .unwrap_or_default();
                        entity.training = Some(TrainingQueue::new(roster, offset));
                    }

                    events.presentation.push(PresentationEvent::RestoreMaterial(id));
                    events.presentation.push(PresentationEvent::Effect {
                        entity: id,
                        effect: EffectKind::ConstructionFinished,
                    });
                    events
                        .construction
                        .push(ConstructionEvent::Completed { building: id, role });
                    tracing::info!(building = id, name = %entity.name, ?role, "Construction complete");
                }
            }
        }
    }

    fn run_training_system(&mut self, entity_ids: &[EntityId], dt: Fixed, events: &mut TickEvents) {
        let mut finished = Vec::new();

        for &id in entity_ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(queue) = entity.training.as_mut() else {
                continue;
            };
            let Some(index) = queue.advance(dt) else {
                continue;
            };
            let Some(option) = queue.roster().get(index) else {
                continue;
            };
            let origin = entity.position.map_or(Vec2Fixed::ZERO, |p| p.value);
            finished.push((
                id,
                option.unit.clone(),
                origin + queue.spawn_offset(),
                entity.faction.clone(),
            ));
        }

        for (building, unit, spawn_at, faction) in finished {
            let Some(data) = self.catalog.unit(&unit).cloned() else {
                tracing::warn!(building, unit = %unit, "Trained unit missing from catalog");
                continue;
            };
            let faction = faction.unwrap_or_else(|| FactionId::new("neutral"));
            let entity = self.spawn_unit(&data, spawn_at, &faction);
            events.spawned.push(entity);
            events.production.push(ProductionEvent::UnitTrained {
                building,
                unit: unit.clone(),
                entity,
            });
            tracing::info!(building, unit = %unit, entity, "Unit trained");
        }
    }

    fn run_health_system(&mut self, events: &mut TickEvents) {
        let dead: Vec<EntityId> = self
            .entities
            .sorted_ids()
            .into_iter()
            .filter(|&id| {
                self.entities
                    .get(id)
                    .and_then(|entity| entity.health)
                    .is_some_and(|health| health.is_dead())
            })
            .collect();

        for id in dead {
            self.remove_entity(id);
            events.deaths.push(id);
            tracing::debug!(entity = id, "Entity died");
        }
    }

    // ========================================================================
    // Spawning and removal
    // ========================================================================

    /// Spawn a new entity with the given components.
    ///
    /// # Example
    ///
    /// ```
    /// use hearth_core::simulation::{EntitySpawnParams, Simulation};
    /// use hearth_core::math::{Fixed, Vec2Fixed};
    ///
    /// let mut sim = Simulation::new();
    /// let unit = sim.spawn_entity(EntitySpawnParams {
    ///     position: Some(Vec2Fixed::new(Fixed::from_num(100), Fixed::from_num(50))),
    ///     health: Some(100),
    ///     speed: Some(Fixed::from_num(2)),
    ///     ..Default::default()
    /// });
    /// assert!(sim.active_units().contains(unit));
    /// ```
    pub fn spawn_entity(&mut self, params: EntitySpawnParams) -> EntityId {
        let mut entity = Entity::new(0); // ID will be assigned by storage
        let position = params.position.unwrap_or(Vec2Fixed::ZERO);

        entity.name = params.name.unwrap_or_default();
        if let Some(pos) = params.position {
            entity.position = Some(Position::new(pos));
        }
        if let Some(radius) = params.radius {
            entity.footprint = Some(Footprint::new(radius));
        }
        if params.selectable {
            entity.selectable = Some(Selectable);
        }
        if let Some(max_health) = params.health {
            entity.health = Some(Health::new(max_health));
        }
        entity.stats = params.stats;

        let mobile = params.speed.is_some() || params.collector.is_some() || params.attack.is_some();
        if mobile {
            let speed = params
                .speed
                .or_else(|| params.stats.map(|stats| stats.speed))
                .unwrap_or(DEFAULT_SPEED);
            entity.mover = Some(Mover::new(position, speed));
        }

        if let Some(data) = params.collector {
            let faction = params
                .faction
                .clone()
                .unwrap_or_else(|| FactionId::new("neutral"));
            entity.collector = Some(Collector::new(faction, data));
        }
        entity.faction = params.faction;
        entity.attacker = params.attack.map(Attacker::new);
        entity.resource_node = params.resource_node;
        if params.depot {
            entity.depot = Some(Depot);
        }
        if let Some(site) = params.construction {
            if site.is_complete() {
                entity.role = Some(ProductionRole::from_type_tag(site.type_tag()));
            }
            entity.construction = Some(site);
        }
        entity.training = params.training;

        let id = self.entities.insert(entity);
        if mobile {
            self.active.register(id);
        }
        id
    }

    /// Spawn a unit from its template.
    pub fn spawn_unit(&mut self, data: &UnitData, position: Vec2Fixed, faction: &FactionId) -> EntityId {
        self.spawn_entity(EntitySpawnParams {
            name: Some(data.name.clone()),
            position: Some(position),
            radius: Some(data.radius),
            faction: Some(faction.clone()),
            health: Some(data.health),
            stats: Some(data.stats),
            speed: Some(data.stats.speed),
            collector: data.collector,
            attack: data.attack,
            selectable: true,
            ..Default::default()
        })
    }

    /// Spawn a building from its template.
    ///
    /// A `completed` building gets its production role (and training queue)
    /// immediately; otherwise it starts as a fresh construction site.
    pub fn spawn_building(
        &mut self,
        data: &BuildingData,
        position: Vec2Fixed,
        faction: &FactionId,
        completed: bool,
    ) -> EntityId {
        let construction = if completed {
            Construction::completed(data.type_tag.clone())
        } else {
            Construction::new(data.construction_time, data.type_tag.clone())
        };
        let training = (completed && ProductionRole::from_type_tag(&data.type_tag).trains_units())
            .then(|| TrainingQueue::new(self.catalog.roster_for(data), data.spawn_offset));

        self.spawn_entity(EntitySpawnParams {
            name: Some(data.name.clone()),
            position: Some(position),
            radius: Some(data.radius),
            faction: Some(faction.clone()),
            health: Some(data.health),
            depot: data.depot,
            construction: Some(construction),
            training,
            selectable: true,
            ..Default::default()
        })
    }

    /// Spawn a resource node with a unit pick radius.
    pub fn spawn_resource_node(&mut self, node: ResourceNode, position: Vec2Fixed) -> EntityId {
        self.spawn_entity(EntitySpawnParams {
            name: Some(node.kind.name().to_string()),
            position: Some(position),
            radius: Some(Fixed::ONE),
            resource_node: Some(node),
            ..Default::default()
        })
    }

    /// Remove an entity from the simulation.
    ///
    /// Other entities still referring to it notice on their next tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if the entity doesn't exist.
    pub fn despawn_entity(&mut self, id: EntityId) -> Result<()> {
        if self.remove_entity(id) {
            Ok(())
        } else {
            Err(GameError::EntityNotFound(id))
        }
    }

    fn remove_entity(&mut self, id: EntityId) -> bool {
        self.active.deregister(id);
        self.entities.remove(id).is_some()
    }

    /// Join or leave the movement/separation registry.
    ///
    /// # Errors
    ///
    /// [`GameError::EntityNotFound`] or [`GameError::MissingComponent`] when
    /// the entity has no mover.
    pub fn set_active(&mut self, id: EntityId, active: bool) -> Result<()> {
        let entity = self.entities.get(id).ok_or(GameError::EntityNotFound(id))?;
        if entity.mover.is_none() {
            return Err(GameError::MissingComponent {
                entity: id,
                component: "Mover",
            });
        }
        if active {
            self.active.register(id);
        } else {
            self.active.deregister(id);
        }
        Ok(())
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Send a collector to gather from `node`.
    ///
    /// Harvest permission is checked on arrival, not here.
    ///
    /// # Errors
    ///
    /// Fails if either entity is missing or lacks the needed components.
    pub fn order_gather(&mut self, unit: EntityId, node: EntityId) -> Result<()> {
        let target = self.entities.get(node).ok_or(GameError::EntityNotFound(node))?;
        if target.resource_node.is_none() {
            return Err(GameError::MissingComponent {
                entity: node,
                component: "ResourceNode",
            });
        }
        let node_pos = position_of(target, node)?;

        let (collector, mover, attacker) = self.collector_parts(unit)?;
        if let Some(attacker) = attacker {
            attacker.cancel_attack();
        }
        collector.go_to_resource(node, node_pos, mover);
        tracing::debug!(unit, node, "Gather order");
        Ok(())
    }

    /// Send a collector to help construct `building`.
    ///
    /// # Errors
    ///
    /// Fails if either entity is missing or lacks the needed components.
    pub fn order_build(&mut self, unit: EntityId, building: EntityId) -> Result<()> {
        let target = self
            .entities
            .get(building)
            .ok_or(GameError::EntityNotFound(building))?;
        if target.construction.is_none() {
            return Err(GameError::MissingComponent {
                entity: building,
                component: "Construction",
            });
        }
        let building_pos = position_of(target, building)?;

        let (collector, mover, attacker) = self.collector_parts(unit)?;
        if let Some(attacker) = attacker {
            attacker.cancel_attack();
        }
        collector.go_to_build(building, building_pos, mover);
        tracing::debug!(unit, building, "Build order");
        Ok(())
    }

    fn collector_parts(
        &mut self,
        unit: EntityId,
    ) -> Result<(&mut Collector, &mut Mover, Option<&mut Attacker>)> {
        let entity = self
            .entities
            .get_mut(unit)
            .ok_or(GameError::EntityNotFound(unit))?;
        let Entity {
            collector,
            mover,
            attacker,
            ..
        } = entity;
        let collector = collector.as_mut().ok_or(GameError::MissingComponent {
            entity: unit,
            component: "Collector",
        })?;
        let mover = mover.as_mut().ok_or(GameError::MissingComponent {
            entity: unit,
            component: "Mover",
        })?;
        Ok((collector, mover, attacker.as_mut()))
    }

    /// Order `unit` to attack `target`. Collector orders are dropped.
    ///
    /// # Errors
    ///
    /// Fails if either entity is missing or `unit` cannot attack.
    pub fn order_attack(&mut self, unit: EntityId, target: EntityId) -> Result<()> {
        if !self.entities.contains(target) {
            return Err(GameError::EntityNotFound(target));
        }
        let entity = self
            .entities
            .get_mut(unit)
            .ok_or(GameError::EntityNotFound(unit))?;
        let attacker = entity.attacker.as_mut().ok_or(GameError::MissingComponent {
            entity: unit,
            component: "Attacker",
        })?;
        attacker.attack_target(target);
        if let Some(collector) = entity.collector.as_mut() {
            collector.clear_orders();
        }
        tracing::debug!(unit, target, "Attack order");
        Ok(())
    }

    /// Move `unit` to `destination`, cancelling any attack or collector order.
    ///
    /// # Errors
    ///
    /// Fails if the unit is missing or cannot move.
    pub fn order_move(&mut self, unit: EntityId, destination: Vec2Fixed) -> Result<()> {
        let entity = self
            .entities
            .get_mut(unit)
            .ok_or(GameError::EntityNotFound(unit))?;
        let mover = entity.mover.as_mut().ok_or(GameError::MissingComponent {
            entity: unit,
            component: "Mover",
        })?;
        mover.move_to(destination);
        if let Some(attacker) = entity.attacker.as_mut() {
            attacker.cancel_attack();
        }
        if let Some(collector) = entity.collector.as_mut() {
            collector.clear_orders();
        }
        Ok(())
    }

    /// Halt `unit` where it stands and drop all its orders.
    ///
    /// # Errors
    ///
    /// Fails if the unit is missing or cannot move.
    pub fn stop(&mut self, unit: EntityId) -> Result<()> {
        let entity = self
            .entities
            .get_mut(unit)
            .ok_or(GameError::EntityNotFound(unit))?;
        let position = position_of(entity, unit)?;
        let mover = entity.mover.as_mut().ok_or(GameError::MissingComponent {
            entity: unit,
            component: "Mover",
        })?;
        let was_moving = mover.is_moving();
        mover.stop(position);
        if was_moving {
            self.pending.presentation.push(PresentationEvent::Animation {
                entity: unit,
                cue: AnimationCue::WalkStopped,
            });
        }
        if let Some(attacker) = entity.attacker.as_mut() {
            attacker.cancel_attack();
        }
        if let Some(collector) = entity.collector.as_mut() {
            collector.clear_orders();
        }
        Ok(())
    }

    /// Drop `unit`'s attack target.
    ///
    /// # Errors
    ///
    /// Fails if the unit is missing or cannot attack.
    pub fn cancel_attack(&mut self, unit: EntityId) -> Result<()> {
        let entity = self
            .entities
            .get_mut(unit)
            .ok_or(GameError::EntityNotFound(unit))?;
        entity
            .attacker
            .as_mut()
            .ok_or(GameError::MissingComponent {
                entity: unit,
                component: "Attacker",
            })?
            .cancel_attack();
        Ok(())
    }

    /// Close `unit`'s running attack cycle and apply the hit.
    ///
    /// Called by the animation layer when the attack clip finishes. Does
    /// nothing if no cycle is running or the target is already gone.
    ///
    /// # Errors
    ///
    /// Fails if the unit is missing or cannot attack.
    pub fn end_attack(&mut self, unit: EntityId) -> Result<()> {
        let entity = self
            .entities
            .get_mut(unit)
            .ok_or(GameError::EntityNotFound(unit))?;
        let stats = entity.stats.unwrap_or_default();
        let attacker = entity.attacker.as_mut().ok_or(GameError::MissingComponent {
            entity: unit,
            component: "Attacker",
        })?;
        let Some(target) = attacker.end_attack() else {
            return Ok(());
        };

        let Some(victim) = self.entities.get_mut(target) else {
            tracing::debug!(unit, target, "Attack ended after target vanished");
            return Ok(());
        };
        let amount = hit_damage(&stats, victim.stats.as_ref());
        let Some(health) = victim.health.as_mut() else {
            let err = GameError::MissingComponent {
                entity: target,
                component: "Health",
            };
            tracing::warn!(unit, %err, "Hit ignored");
            return Ok(());
        };

        let dealt = health.apply_damage(amount);
        self.pending.combat.push(CombatEvent::Damaged {
            attacker: unit,
            target,
            amount: dealt,
        });
        tracing::debug!(unit, target, dealt, remaining = health.current, "Hit landed");
        Ok(())
    }

    /// Start training roster entry `index` at `building`, paying from the ledger.
    ///
    /// # Errors
    ///
    /// [`GameError::NotProductionBuilding`], [`GameError::TrainingInProgress`],
    /// [`GameError::InvalidIndex`] or [`GameError::InsufficientResources`];
    /// nothing changes on error.
    pub fn train_unit(&mut self, building: EntityId, index: usize) -> Result<()> {
        let entity = self
            .entities
            .get_mut(building)
            .ok_or(GameError::EntityNotFound(building))?;
        let queue = entity
            .training
            .as_mut()
            .ok_or(GameError::NotProductionBuilding(building))?;
        let option = queue.train(building, index, &mut self.ledger)?;

        tracing::info!(building, unit = %option.unit, cost = option.cost, "Training started");
        self.pending.production.push(ProductionEvent::TrainingStarted {
            building,
            unit: option.unit.clone(),
            cost: option.cost,
        });
        Ok(())
    }

    /// Place catalog building `index` at `position` as a construction site,
    /// paying its Gold cost, and send `worker` to build it.
    ///
    /// A worker that cannot take the order is logged; the site stays.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidIndex`] or [`GameError::InsufficientResources`];
    /// nothing changes on error.
    pub fn place_building(
        &mut self,
        index: usize,
        position: Vec2Fixed,
        faction: &FactionId,
        worker: Option<EntityId>,
    ) -> Result<EntityId> {
        let data = self
            .catalog
            .buildings
            .get(index)
            .cloned()
            .ok_or(GameError::InvalidIndex {
                what: "building",
                index,
                len: self.catalog.buildings.len(),
            })?;
        self.ledger.try_spend(ResourceType::Gold.name(), data.cost)?;

        let building = self.spawn_building(&data, position, faction, false);
        self.pending.construction.push(ConstructionEvent::Placed {
            building,
            cost: data.cost,
        });
        tracing::info!(building, name = %data.name, cost = data.cost, "Construction site placed");

        if let Some(worker) = worker {
            if let Err(err) = self.order_build(worker, building) {
                tracing::warn!(worker, building, %err, "Worker could not take build order");
            }
        }
        Ok(building)
    }

    /// Credit resources delivered to a depot.
    ///
    /// # Errors
    ///
    /// Fails if `depot` is missing or does not accept deliveries.
    pub fn receive_resources(&mut self, depot: EntityId, resource: ResourceType, amount: u32) -> Result<()> {
        let entity = self.entities.get(depot).ok_or(GameError::EntityNotFound(depot))?;
        if entity.depot.is_none() {
            return Err(GameError::MissingComponent {
                entity: depot,
                component: "Depot",
            });
        }
        self.ledger.add_resource(resource.name(), i64::from(amount));
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Construction progress in `[0, 1]`.
    #[must_use]
    pub fn construction_progress(&self, building: EntityId) -> Option<Fixed> {
        Some(self.entities.get(building)?.construction.as_ref()?.progress())
    }

    /// Seconds until construction completes at the current rate.
    #[must_use]
    pub fn construction_remaining(&self, building: EntityId) -> Option<Fixed> {
        Some(self.entities.get(building)?.construction.as_ref()?.remaining_time())
    }

    /// Training progress in `[0, 1]`; zero when idle.
    #[must_use]
    pub fn training_progress(&self, building: EntityId) -> Option<Fixed> {
        Some(self.entities.get(building)?.training.as_ref()?.progress())
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);

        for (resource, amount) in self.ledger.all_resources() {
            resource.hash(&mut hasher);
            amount.hash(&mut hasher);
        }

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            let Some(entity) = self.entities.get(id) else {
                continue;
            };
            id.hash(&mut hasher);
            if let Some(pos) = entity.position {
                pos.value.hash(&mut hasher);
            }
            if let Some(health) = entity.health {
                health.current.hash(&mut hasher);
            }
            if let Some(collector) = &entity.collector {
                collector.cargo().amount().hash(&mut hasher);
                collector.generation().hash(&mut hasher);
            }
            if let Some(node) = &entity.resource_node {
                node.remaining.hash(&mut hasher);
            }
            if let Some(site) = &entity.construction {
                site.progress().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

fn position_of(entity: &Entity, id: EntityId) -> Result<Vec2Fixed> {
    entity
        .position
        .map(|p| p.value)
        .ok_or(GameError::MissingComponent {
            entity: id,
            component: "Position",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    fn quarter() -> Fixed {
        Fixed::from_num(0.25)
    }

    #[test]
    fn test_simulation_new() {
        let sim = Simulation::new();
        assert_eq!(sim.get_tick(), 0);
        assert!(sim.entities.is_empty());
    }

    #[test]
    fn test_spawn_entity() {
        let mut sim = Simulation::new();
        let id = sim.spawn_entity(EntitySpawnParams {
            position: Some(at(10.0, 20.0)),
            health: Some(100),
            ..Default::default()
        });

        assert_eq!(id, 1);
        let entity = sim.get_entity(id).unwrap();
        assert_eq!(entity.position.unwrap().value.x, Fixed::from_num(10));
        assert_eq!(entity.health.unwrap().current, 100);
        assert!(!sim.active_units().contains(id));
    }

    #[test]
    fn test_despawn_deregisters() {
        let mut sim = Simulation::new();
        let id = sim.spawn_entity(EntitySpawnParams {
            position: Some(Vec2Fixed::ZERO),
            speed: Some(Fixed::ONE),
            ..Default::default()
        });
        assert!(sim.active_units().contains(id));

        assert!(sim.despawn_entity(id).is_ok());
        assert!(sim.get_entity(id).is_none());
        assert!(!sim.active_units().contains(id));
        assert_eq!(sim.despawn_entity(id), Err(GameError::EntityNotFound(id)));
    }

    #[test]
    fn test_tick_increments() {
        let mut sim = Simulation::new();
        sim.tick(quarter());
        sim.tick(quarter());
        assert_eq!(sim.get_tick(), 2);
    }

    #[test]
    fn test_move_order_emits_walk_cues() {
        let mut sim = Simulation::new();
        let id = sim.spawn_entity(EntitySpawnParams {
            position: Some(Vec2Fixed::ZERO),
            speed: Some(Fixed::from_num(4)),
            ..Default::default()
        });
        sim.order_move(id, at(3.0, 0.0)).unwrap();

        let first = sim.tick(quarter());
        assert_eq!(
            first.presentation,
            vec![PresentationEvent::Animation {
                entity: id,
                cue: AnimationCue::WalkStarted
            }]
        );
        assert_eq!(sim.get_entity(id).unwrap().position.unwrap().value, at(1.0, 0.0));

        sim.tick(quarter());
        let third = sim.tick(quarter());
        assert!(third.presentation.contains(&PresentationEvent::Animation {
            entity: id,
            cue: AnimationCue::WalkStopped
        }));
    }

    #[test]
    fn test_set_active_requires_mover() {
        let mut sim = Simulation::new();
        let rock = sim.spawn_entity(EntitySpawnParams::default());
        assert!(matches!(
            sim.set_active(rock, true),
            Err(GameError::MissingComponent { component: "Mover", .. })
        ));
    }

    #[test]
    fn test_receive_resources_needs_depot() {
        let mut sim = Simulation::new();
        let hall = sim.spawn_entity(EntitySpawnParams {
            depot: true,
            ..Default::default()
        });
        let hut = sim.spawn_entity(EntitySpawnParams::default());

        sim.receive_resources(hall, ResourceType::Wood, 7).unwrap();
        assert!(sim.receive_resources(hut, ResourceType::Wood, 7).is_err());
        assert_eq!(sim.ledger().get_resource("Wood"), 7);
    }

    #[test]
    fn test_end_attack_without_cycle_is_noop() {
        let mut sim = Simulation::new();
        let knight = sim.spawn_entity(EntitySpawnParams {
            position: Some(Vec2Fixed::ZERO),
            attack: Some(AttackData::default()),
            ..Default::default()
        });
        assert!(sim.end_attack(knight).is_ok());
        assert!(sim.tick(quarter()).combat.is_empty());
    }

    #[test]
    fn test_construction_queries() {
        let mut sim = Simulation::new();
        let site = sim.spawn_entity(EntitySpawnParams {
            position: Some(Vec2Fixed::ZERO),
            construction: Some(Construction::new(Fixed::from_num(8), "Resource")),
            ..Default::default()
        });
        let rock = sim.spawn_entity(EntitySpawnParams::default());

        for _ in 0..4 {
            sim.tick(quarter());
        }

        assert_eq!(sim.construction_progress(site), Some(Fixed::from_num(0.125)));
        assert_eq!(sim.construction_remaining(site), Some(Fixed::from_num(7)));
        assert_eq!(sim.construction_progress(rock), None);
        assert_eq!(sim.training_progress(site), None);
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = Simulation::new();
        let mut b = Simulation::new();
        assert_eq!(a.state_hash(), b.state_hash());

        a.ledger_mut().add_resource("Gold", 5);
        assert_ne!(a.state_hash(), b.state_hash());
        b.ledger_mut().add_resource("Gold", 5);
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
