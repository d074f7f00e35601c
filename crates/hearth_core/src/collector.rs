//! Collector state machine: gathering, delivery and construction work.
//!
//! ```text
//!            go_to_resource / go_to_build
//!   Idle ───────────────────────────────────▶ Moving
//!    ▲                                          │ arrival
//!    │        ┌─────────────────────────────────┼──────────────────┐
//!    │        ▼                                 ▼                  ▼
//!    │   Gathering ── full / node empty ──▶ Moving (depot)    Building
//!    │        │                                 │ arrival          │ complete
//!    │        └── cargo empty ──▶ Idle          ▼                  ▼
//!    └──────────────────────────────────── deliver ──▶ Moving (node) / Idle
//! ```
//!
//! Timed work (the gather loop, the build poll) is an explicit [`Activity`]
//! advanced by the simulation tick. Each activity records the command
//! generation it was started under; issuing any new command bumps the
//! generation, so a superseded activity notices on its next step and is
//! dropped.
//!
//! Arrival is a distance check against the target's footprint, not a
//! physics trigger.

use serde::{Deserialize, Serialize};

use crate::buildings::ConstructionEvent;
use crate::components::EntityId;
use crate::data::CollectorData;
use crate::economy::{find_nearest_depot, Cargo, EconomyEvent, ResourceLedger};
use crate::error::GameError;
use crate::factions::FactionId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::movement::{Mover, ARRIVAL_THRESHOLD};
use crate::simulation::{EntityStorage, TickEvents};

/// Seconds between completion checks while building.
pub const BUILD_POLL_INTERVAL: Fixed = Fixed::from_bits(429_496_730); // ~0.1

/// Amount taken from a node per gather cycle.
const HARVEST_PER_CYCLE: u32 = 1;

/// Collector command state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectorState {
    /// Waiting for orders.
    #[default]
    Idle,
    /// Walking to a node, a depot or a construction site.
    Moving,
    /// Harvesting a node.
    Gathering,
    /// Helping construct a building.
    Building,
}

/// Timed work in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    /// Gather loop; `timer` counts down to the next harvest.
    Gather {
        /// Seconds until the next cycle.
        #[serde(with = "fixed_serde")]
        timer: Fixed,
    },
    /// Build loop; `timer` counts down to the next completion check.
    Build {
        /// Seconds until the next poll.
        #[serde(with = "fixed_serde")]
        timer: Fixed,
    },
}

/// An activity tagged with the command generation that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Generation at start.
    pub generation: u64,
    /// What is being done.
    pub kind: ActivityKind,
}

/// Collector role component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collector {
    state: CollectorState,
    faction: FactionId,
    #[serde(with = "fixed_serde")]
    gather_rate: Fixed,
    #[serde(with = "fixed_serde")]
    build_speed: Fixed,
    cargo: Cargo,
    resource_target: Option<EntityId>,
    building_target: Option<EntityId>,
    generation: u64,
    activity: Option<Activity>,
}

/// World access handed to [`Collector::step`].
///
/// The stepping unit's own collector and mover are held outside `entities`
/// for the duration of the call.
pub struct CollectorContext<'a> {
    /// The stepping unit.
    pub unit: EntityId,
    /// Its position at the start of the tick.
    pub position: Vec2Fixed,
    /// Its mover.
    pub mover: &'a mut Mover,
    /// Every other entity.
    pub entities: &'a mut EntityStorage,
    /// The player's stockpile.
    pub ledger: &'a mut ResourceLedger,
    /// Event sink for this tick.
    pub events: &'a mut TickEvents,
}

impl Collector {
    /// Create an idle collector.
    #[must_use]
    pub fn new(faction: FactionId, stats: CollectorData) -> Self {
        Self {
            state: CollectorState::Idle,
            faction,
            gather_rate: stats.gather_rate,
            build_speed: stats.build_speed,
            cargo: Cargo::new(stats.capacity),
            resource_target: None,
            building_target: None,
            generation: 0,
            activity: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CollectorState {
        self.state
    }

    /// Faction used for harvest permission checks.
    #[must_use]
    pub const fn faction(&self) -> &FactionId {
        &self.faction
    }

    /// Cargo hold.
    #[must_use]
    pub const fn cargo(&self) -> &Cargo {
        &self.cargo
    }

    /// Node being worked, if any.
    #[must_use]
    pub const fn resource_target(&self) -> Option<EntityId> {
        self.resource_target
    }

    /// Depot or construction site being walked to or worked, if any.
    #[must_use]
    pub const fn building_target(&self) -> Option<EntityId> {
        self.building_target
    }

    /// Command generation; bumped by every new order.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Running activity, if any.
    #[must_use]
    pub const fn activity(&self) -> Option<&Activity> {
        self.activity.as_ref()
    }

    /// Order: walk to `node` and gather from it.
    pub fn go_to_resource(&mut self, node: EntityId, node_pos: Vec2Fixed, mover: &mut Mover) {
        self.generation += 1;
        self.resource_target = Some(node);
        self.building_target = None;
        self.state = CollectorState::Moving;
        mover.move_to(node_pos);
    }

    /// Order: walk to `building` and help build it.
    pub fn go_to_build(&mut self, building: EntityId, building_pos: Vec2Fixed, mover: &mut Mover) {
        self.generation += 1;
        self.building_target = Some(building);
        self.resource_target = None;
        self.state = CollectorState::Moving;
        mover.move_to(building_pos);
    }

    /// Drop every order and go idle. Cargo is kept.
    pub fn clear_orders(&mut self) {
        self.generation += 1;
        self.resource_target = None;
        self.building_target = None;
        self.state = CollectorState::Idle;
    }

    /// Advance the state machine by `dt`.
    pub fn step(&mut self, ctx: &mut CollectorContext<'_>, dt: Fixed) {
        self.drop_stale_activity(ctx.unit);

        match self.state {
            CollectorState::Idle => {}
            CollectorState::Moving => self.check_arrival(ctx),
            CollectorState::Gathering | CollectorState::Building => self.run_activity(ctx, dt),
        }
    }

    fn drop_stale_activity(&mut self, unit: EntityId) {
        if let Some(activity) = self.activity {
            if activity.generation != self.generation {
                tracing::debug!(
                    unit,
                    started = activity.generation,
                    current = self.generation,
                    "Superseded activity dropped"
                );
                self.activity = None;
            }
        }
    }

    fn go_idle(&mut self) {
        self.state = CollectorState::Idle;
        self.activity = None;
    }

    // ------------------------------------------------------------------------
    // Arrival
    // ------------------------------------------------------------------------

    fn check_arrival(&mut self, ctx: &mut CollectorContext<'_>) {
        if self.building_target.is_none() && self.resource_target.is_none() {
            self.go_idle();
            return;
        }

        if let Some(building) = self.building_target {
            match reach(ctx.entities, building) {
                None => {
                    tracing::warn!(unit = ctx.unit, building, "Building target vanished");
                    self.building_target = None;
                    if self.cargo.is_empty() {
                        ctx.mover.stop(ctx.position);
                        self.go_idle();
                    } else {
                        self.head_to_depot(ctx);
                    }
                    return;
                }
                Some((pos, radius)) if has_arrived(ctx.position, pos, radius) => {
                    let is_depot = ctx
                        .entities
                        .get(building)
                        .is_some_and(|entity| entity.depot.is_some());
                    if is_depot && !self.cargo.is_empty() {
                        self.deliver(ctx, building);
                    } else {
                        self.begin_building(ctx, building);
                    }
                    return;
                }
                Some(_) => return,
            }
        }

        if let Some(node) = self.resource_target {
            match reach(ctx.entities, node) {
                None => {
                    tracing::warn!(unit = ctx.unit, node, "Resource target vanished");
                    self.resource_target = None;
                    self.go_idle();
                }
                Some((pos, radius)) if has_arrived(ctx.position, pos, radius) => {
                    self.begin_gathering(ctx, node);
                }
                Some(_) => {}
            }
        }
    }

    fn deliver(&mut self, ctx: &mut CollectorContext<'_>, depot: EntityId) {
        self.building_target = None;

        if let Some((resource, amount)) = self.cargo.unload() {
            ctx.ledger.add_resource(resource.name(), i64::from(amount));
            ctx.events.economy.push(EconomyEvent::Delivered {
                collector: ctx.unit,
                depot,
                resource,
                amount,
            });
            tracing::info!(unit = ctx.unit, depot, %resource, amount, "Cargo delivered");
        }

        let node = self.resource_target.and_then(|node| {
            let entity = ctx.entities.get(node)?;
            let remaining = entity.resource_node.as_ref()?.remaining;
            let pos = entity.position?.value;
            (remaining > 0).then_some((node, pos))
        });

        match node {
            Some((node, pos)) => self.go_to_resource(node, pos, ctx.mover),
            None => {
                self.resource_target = None;
                self.go_idle();
            }
        }
    }

    fn begin_gathering(&mut self, ctx: &mut CollectorContext<'_>, node_id: EntityId) {
        let Some(node) = ctx
            .entities
            .get(node_id)
            .and_then(|entity| entity.resource_node.as_ref())
        else {
            tracing::warn!(unit = ctx.unit, node = node_id, "Target has no resource node component");
            self.go_idle();
            return;
        };

        if !node.can_harvest(&self.faction) {
            let err = GameError::HarvestDenied {
                node: node_id,
                faction: self.faction.clone(),
            };
            tracing::info!(unit = ctx.unit, %err, "Gather order dropped");
            self.go_idle();
            return;
        }

        self.state = CollectorState::Gathering;
        self.activity = Some(Activity {
            generation: self.generation,
            kind: ActivityKind::Gather { timer: Fixed::ZERO },
        });
        // First harvest happens on arrival.
        self.run_activity(ctx, Fixed::ZERO);
    }

    fn begin_building(&mut self, ctx: &mut CollectorContext<'_>, building: EntityId) {
        let Some(site) = ctx
            .entities
            .get_mut(building)
            .and_then(|entity| entity.construction.as_mut())
        else {
            tracing::warn!(unit = ctx.unit, building, "Target has no construction component");
            self.building_target = None;
            self.go_idle();
            return;
        };

        site.accelerate(self.build_speed);
        if let Some(rate) = site.rate() {
            ctx.events.construction.push(ConstructionEvent::Accelerated {
                building,
                worker: ctx.unit,
                rate,
            });
        }

        self.state = CollectorState::Building;
        self.activity = Some(Activity {
            generation: self.generation,
            kind: ActivityKind::Build { timer: Fixed::ZERO },
        });
        self.run_activity(ctx, Fixed::ZERO);
    }

    // ------------------------------------------------------------------------
    // Timed work
    // ------------------------------------------------------------------------

    fn run_activity(&mut self, ctx: &mut CollectorContext<'_>, dt: Fixed) {
        let Some(mut activity) = self.activity else {
            tracing::debug!(unit = ctx.unit, state = ?self.state, "No activity; going idle");
            self.go_idle();
            return;
        };

        let finished = match &mut activity.kind {
            ActivityKind::Gather { timer } => self.gather_cycles(ctx, timer, dt),
            ActivityKind::Build { timer } => self.build_polls(ctx, timer, dt),
        };

        if !finished {
            self.activity = Some(activity);
        }
    }

    /// Returns `true` once the gather loop has ended.
    fn gather_cycles(&mut self, ctx: &mut CollectorContext<'_>, timer: &mut Fixed, dt: Fixed) -> bool {
        let interval = Fixed::ONE.checked_div(self.gather_rate).unwrap_or(Fixed::MAX);
        *timer = timer.saturating_sub(dt);

        while *timer <= Fixed::ZERO {
            let Some(node_id) = self.resource_target else {
                self.finish_gathering(ctx);
                return true;
            };
            let Some(node) = ctx
                .entities
                .get_mut(node_id)
                .and_then(|entity| entity.resource_node.as_mut())
            else {
                tracing::warn!(unit = ctx.unit, node = node_id, "Resource node vanished mid-gather");
                self.finish_gathering(ctx);
                return true;
            };

            if self.cargo.is_full() || node.is_depleted() {
                self.finish_gathering(ctx);
                return true;
            }

            let taken = node.harvest(HARVEST_PER_CYCLE);
            let kind = node.kind;
            let depleted = node.is_depleted();
            if taken == 0 {
                self.finish_gathering(ctx);
                return true;
            }

            self.cargo.load(kind, taken);
            ctx.events.economy.push(EconomyEvent::Harvested {
                collector: ctx.unit,
                node: node_id,
                amount: taken,
            });
            if depleted {
                ctx.events.economy.push(EconomyEvent::NodeDepleted { node: node_id });
            }
            tracing::trace!(unit = ctx.unit, node = node_id, cargo = self.cargo.amount(), "Harvested");

            *timer = timer.saturating_add(interval);
        }

        false
    }

    fn finish_gathering(&mut self, ctx: &mut CollectorContext<'_>) {
        self.activity = None;

        if self.cargo.is_empty() {
            self.go_idle();
            return;
        }

        self.head_to_depot(ctx);
    }

    /// Walk to the nearest depot with the current cargo, or stop and idle
    /// when none is left.
    fn head_to_depot(&mut self, ctx: &mut CollectorContext<'_>) {
        let depots = ctx.entities.sorted_ids().into_iter().filter_map(|id| {
            let entity = ctx.entities.get(id)?;
            entity.depot?;
            Some((id, entity.position?.value))
        });
        let depots: Vec<_> = depots.collect();

        let Some(depot) = find_nearest_depot(ctx.position, depots.iter().copied()) else {
            tracing::debug!(unit = ctx.unit, "No depot to deliver to");
            ctx.mover.stop(ctx.position);
            self.go_idle();
            return;
        };

        let depot_pos = depots
            .iter()
            .find(|(id, _)| *id == depot)
            .map_or(ctx.position, |(_, pos)| *pos);

        self.building_target = Some(depot);
        self.state = CollectorState::Moving;
        ctx.mover.move_to(depot_pos);
        tracing::debug!(unit = ctx.unit, depot, cargo = self.cargo.amount(), "Heading to depot");
    }

    /// Returns `true` once the build loop has ended.
    fn build_polls(&mut self, ctx: &mut CollectorContext<'_>, timer: &mut Fixed, dt: Fixed) -> bool {
        *timer = timer.saturating_sub(dt);

        while *timer <= Fixed::ZERO {
            let site = self.building_target.and_then(|building| {
                ctx.entities
                    .get(building)
                    .and_then(|entity| entity.construction.as_ref())
            });

            match site {
                None => {
                    tracing::warn!(unit = ctx.unit, "Construction site vanished");
                    self.building_target = None;
                    self.go_idle();
                    return true;
                }
                Some(site) if site.is_complete() => {
                    tracing::info!(unit = ctx.unit, building = ?self.building_target, "Construction work finished");
                    self.building_target = None;
                    self.go_idle();
                    return true;
                }
                Some(_) => *timer = timer.saturating_add(BUILD_POLL_INTERVAL),
            }
        }

        false
    }
}

/// Position and footprint radius of an entity that can be walked to.
fn reach(entities: &EntityStorage, id: EntityId) -> Option<(Vec2Fixed, Fixed)> {
    let entity = entities.get(id)?;
    let pos = entity.position?.value;
    let radius = entity.footprint.map_or(Fixed::ZERO, |footprint| footprint.radius);
    Some((pos, radius))
}

fn has_arrived(unit: Vec2Fixed, target: Vec2Fixed, radius: Fixed) -> bool {
    let reach = radius.saturating_add(ARRIVAL_THRESHOLD);
    unit.distance_squared(target) <= reach.saturating_mul(reach)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::{ResourceNode, ResourceType};
    use crate::factions::HarvestRights;
    use crate::simulation::{EntitySpawnParams, Simulation};

    fn at(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    fn collector_params(pos: Vec2Fixed, faction: &str) -> EntitySpawnParams {
        EntitySpawnParams {
            position: Some(pos),
            faction: Some(faction.into()),
            speed: Some(Fixed::from_num(4)),
            collector: Some(CollectorData::default()),
            selectable: true,
            ..Default::default()
        }
    }

    fn node_params(pos: Vec2Fixed, node: ResourceNode) -> EntitySpawnParams {
        EntitySpawnParams {
            position: Some(pos),
            radius: Some(Fixed::ONE),
            resource_node: Some(node),
            ..Default::default()
        }
    }

    #[test]
    fn test_faction_denied_reverts_to_idle() {
        let mut sim = Simulation::new();
        let unit = sim.spawn_entity(collector_params(at(0, 0), "humans"));
        let node = sim.spawn_entity(node_params(
            at(0, 0),
            ResourceNode::new(ResourceType::Mana, 10).with_rights(HarvestRights::only(["elves"])),
        ));

        sim.order_gather(unit, node).expect("order accepted");
        sim.tick(Fixed::from_num(0.25));

        let collector = sim.get_entity(unit).and_then(|e| e.collector.as_ref()).expect("collector");
        assert_eq!(collector.state(), CollectorState::Idle);
        assert!(collector.cargo().is_empty());
    }

    #[test]
    fn test_new_order_bumps_generation_and_drops_activity() {
        let mut sim = Simulation::new();
        let unit = sim.spawn_entity(collector_params(at(0, 0), "humans"));
        let node = sim.spawn_entity(node_params(at(0, 0), ResourceNode::new(ResourceType::Wood, 50)));
        let other = sim.spawn_entity(node_params(at(30, 0), ResourceNode::new(ResourceType::Wood, 50)));

        sim.order_gather(unit, node).expect("order accepted");
        sim.tick(Fixed::from_num(0.25));
        let before = sim.get_entity(unit).and_then(|e| e.collector.clone()).expect("collector");
        assert_eq!(before.state(), CollectorState::Gathering);
        assert!(before.activity().is_some());

        sim.order_gather(unit, other).expect("order accepted");
        sim.tick(Fixed::from_num(0.25));
        let after = sim.get_entity(unit).and_then(|e| e.collector.clone()).expect("collector");
        assert_eq!(after.state(), CollectorState::Moving);
        assert_eq!(after.generation(), before.generation() + 1);
        assert!(after.activity().is_none());
        assert_eq!(after.resource_target(), Some(other));
    }

    #[test]
    fn test_empty_handed_stop_goes_idle() {
        let mut sim = Simulation::new();
        let unit = sim.spawn_entity(collector_params(at(0, 0), "humans"));
        let node = sim.spawn_entity(node_params(at(0, 0), ResourceNode::new(ResourceType::Stone, 0)));

        sim.order_gather(unit, node).expect("order accepted");
        sim.tick(Fixed::from_num(0.25));

        let collector = sim.get_entity(unit).and_then(|e| e.collector.as_ref()).expect("collector");
        assert_eq!(collector.state(), CollectorState::Idle);
    }

    #[test]
    fn test_has_arrived_includes_footprint() {
        assert!(has_arrived(at(0, 0), at(3, 0), Fixed::from_num(2)));
        assert!(!has_arrived(at(0, 0), at(4, 0), Fixed::from_num(2)));
    }
}
