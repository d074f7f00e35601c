//! Headless runner implementation.
//!
//! [`HeadlessRunner`] owns a [`Simulation`] and feeds it either a
//! scenario's order timeline or JSON commands read line by line. Pointer
//! commands go through a [`SelectionController`] looking down a
//! [`TopDownViewport`], the same path a player's mouse takes.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use hearth_core::buildings::ConstructionEvent;
use hearth_core::combat::CombatEvent;
use hearth_core::components::EntityId;
use hearth_core::data::Catalog;
use hearth_core::economy::{EconomyEvent, ResourceNode};
use hearth_core::error::GameError;
use hearth_core::factions::FactionId;
use hearth_core::math::{Fixed, Vec2Fixed};
use hearth_core::production::ProductionEvent;
use hearth_core::selection::{PointerFrame, SelectionController, SelectionSettings};
use hearth_core::simulation::{Entity, Simulation, TickEvents, TICK_RATE};
use hearth_core::viewport::TopDownViewport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{Command, EntityState, HealthState, PointerAction, Response};
use crate::scenario::{Order, Scenario, ScenarioError, Spawn};

/// Error type for runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Scenario loading or validation failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The simulation rejected an order.
    #[error(transparent)]
    Game(#[from] GameError),
    /// A template name is not in the catalog.
    #[error("Unknown {kind} '{name}'")]
    UnknownTemplate {
        /// "unit" or "building".
        kind: &'static str,
        /// The missing template name.
        name: String,
    },
    /// An order used a label that resolves to nothing.
    #[error("Unknown entity label '{0}'")]
    UnknownLabel(String),
    /// A coordinate does not fit the fixed-point range.
    #[error("Coordinate ({x}, {y}) is out of range")]
    InvalidCoordinate {
        /// Requested x.
        x: f64,
        /// Requested y.
        y: f64,
    },
}

/// Headless runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Output state after every tick (vs only on query).
    pub auto_state: bool,
    /// Ticks per simulated second.
    pub tick_rate: u32,
    /// Finish every attack cycle right after it starts, standing in for
    /// the animation layer.
    pub auto_end_attacks: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            auto_state: false,
            tick_rate: TICK_RATE,
            auto_end_attacks: false,
        }
    }
}

/// Totals gathered over a scenario run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// Final stockpile.
    pub stockpile: BTreeMap<String, i64>,
    /// Resources taken from nodes.
    pub harvested: u64,
    /// Resources credited at depots.
    pub delivered: u64,
    /// Nodes that ran dry.
    pub depleted_nodes: u32,
    /// Construction sites placed.
    pub sites_placed: u32,
    /// Buildings that finished construction.
    pub buildings_completed: u32,
    /// Units that finished training.
    pub units_trained: u32,
    /// Health removed by attacks.
    pub damage_dealt: u64,
    /// Entities killed.
    pub deaths: u32,
    /// Orders the simulation refused, with the reason.
    pub failed_orders: Vec<String>,
    /// Final state hash.
    pub hash: u64,
}

impl ScenarioReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, events: &TickEvents) {
        for event in &events.economy {
            match event {
                EconomyEvent::Harvested { amount, .. } => self.harvested += u64::from(*amount),
                EconomyEvent::Delivered { amount, .. } => self.delivered += u64::from(*amount),
                EconomyEvent::NodeDepleted { .. } => self.depleted_nodes += 1,
            }
        }
        for event in &events.construction {
            match event {
                ConstructionEvent::Placed { .. } => self.sites_placed += 1,
                ConstructionEvent::Completed { .. } => self.buildings_completed += 1,
                ConstructionEvent::Accelerated { .. } => {}
            }
        }
        self.units_trained += events
            .production
            .iter()
            .filter(|event| matches!(event, ProductionEvent::UnitTrained { .. }))
            .count() as u32;
        for event in &events.combat {
            if let CombatEvent::Damaged { amount, .. } = event {
                self.damage_dealt += u64::from(*amount);
            }
        }
        self.deaths += events.deaths.len() as u32;
    }
}

/// Headless runner for scripted and JSON-driven play.
pub struct HeadlessRunner {
    sim: Simulation,
    controller: SelectionController,
    player: FactionId,
    labels: BTreeMap<String, EntityId>,
    dt: Fixed,
    config: HeadlessConfig,
    finished: bool,
}

impl HeadlessRunner {
    /// Create a runner over an empty world with the default camera.
    pub fn new(catalog: Catalog, player: FactionId, config: HeadlessConfig) -> Self {
        Self::with_viewport(catalog, player, config, TopDownViewport::default())
    }

    /// Create a runner over an empty world seen through `viewport`.
    pub fn with_viewport(
        catalog: Catalog,
        player: FactionId,
        config: HeadlessConfig,
        viewport: TopDownViewport,
    ) -> Self {
        let settings = SelectionSettings {
            player_faction: player.clone(),
            ..SelectionSettings::default()
        };
        Self {
            sim: Simulation::with_catalog(catalog),
            controller: SelectionController::new(settings, Some(Box::new(viewport))),
            player,
            labels: BTreeMap::new(),
            dt: tick_delta_for(config.tick_rate),
            config,
            finished: false,
        }
    }

    /// Build the world a scenario describes.
    pub fn from_scenario(scenario: &Scenario, config: HeadlessConfig) -> Result<Self, RunnerError> {
        scenario.validate()?;

        let config = HeadlessConfig {
            tick_rate: scenario.tick_rate,
            ..config
        };
        let mut runner = Self::with_viewport(
            scenario.catalog.clone(),
            FactionId::new(scenario.player.clone()),
            config,
            scenario.viewport.clone(),
        );

        for (resource, amount) in &scenario.stockpile {
            runner.sim.ledger_mut().add_resource(resource.name(), *amount);
        }

        for placement in &scenario.entities {
            let id = match &placement.spawn {
                Spawn::Unit { kind, faction } => {
                    runner.spawn_unit(kind, placement.at, faction.as_deref())?
                }
                Spawn::Building {
                    kind,
                    faction,
                    completed,
                } => runner.spawn_building(kind, placement.at, faction.as_deref(), *completed)?,
                Spawn::Node {
                    resource,
                    amount,
                    rights,
                } => runner.sim.spawn_resource_node(
                    ResourceNode::new(*resource, *amount).with_rights(rights.clone()),
                    placement.at,
                ),
            };
            if let Some(label) = &placement.label {
                runner.labels.insert(label.clone(), id);
            }
        }

        tracing::info!(
            name = %scenario.name,
            entities = runner.sim.entities().len(),
            "Scenario world built"
        );
        Ok(runner)
    }

    /// Run a scenario start to finish.
    ///
    /// Refused orders are logged and listed in the report; they never stop
    /// the run.
    pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport, RunnerError> {
        let config = HeadlessConfig {
            auto_end_attacks: true,
            ..HeadlessConfig::default()
        };
        let mut runner = Self::from_scenario(scenario, config)?;
        let timeline = scenario.timeline();
        let mut report = ScenarioReport::new(&scenario.name);
        let mut next = 0;

        for tick in 0..scenario.ticks {
            while let Some(timed) = timeline.get(next).filter(|timed| timed.tick <= tick) {
                if let Err(err) = runner.issue(&timed.order) {
                    tracing::warn!(tick, order = timed.order.name(), %err, "Order refused");
                    report
                        .failed_orders
                        .push(format!("tick {}: {} refused: {err}", timed.tick, timed.order.name()));
                }
                next += 1;
            }
            let events = runner.step();
            report.record(&events);
        }

        report.ticks = runner.sim.get_tick();
        report.stockpile = runner.sim.ledger().all_resources();
        report.hash = runner.sim.state_hash();
        tracing::info!(
            name = %report.name,
            ticks = report.ticks,
            delivered = report.delivered,
            failed = report.failed_orders.len(),
            "Scenario finished"
        );
        Ok(report)
    }

    /// The simulation being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// The selection controller pointer commands feed.
    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    /// Entity a label was bound to.
    pub fn label(&self, label: &str) -> Option<EntityId> {
        self.labels.get(label).copied()
    }

    /// Whether a `quit` command has been handled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance one tick.
    ///
    /// With `auto_end_attacks`, hits from attacks started this tick are
    /// reported with the next one.
    pub fn step(&mut self) -> TickEvents {
        let events = self.sim.tick(self.dt);
        if self.config.auto_end_attacks {
            for event in &events.combat {
                if let CombatEvent::AttackStarted { attacker, .. } = event {
                    if let Err(err) = self.sim.end_attack(*attacker) {
                        tracing::debug!(attacker, %err, "Attack not resolved");
                    }
                }
            }
        }
        events
    }

    /// Issue a scenario order.
    pub fn issue(&mut self, order: &Order) -> Result<(), RunnerError> {
        match order {
            Order::Gather { unit, node } => {
                let (unit, node) = (self.resolve(unit)?, self.resolve(node)?);
                self.sim.order_gather(unit, node)?;
            }
            Order::Build { unit, site } => {
                let (unit, site) = (self.resolve(unit)?, self.resolve(site)?);
                self.sim.order_build(unit, site)?;
            }
            Order::Attack { unit, target } => {
                let (unit, target) = (self.resolve(unit)?, self.resolve(target)?);
                self.sim.order_attack(unit, target)?;
            }
            Order::Move { unit, to } => {
                let unit = self.resolve(unit)?;
                self.sim.order_move(unit, *to)?;
            }
            Order::Stop { unit } => {
                let unit = self.resolve(unit)?;
                self.sim.stop(unit)?;
            }
            Order::Train { building, index } => {
                let building = self.resolve(building)?;
                self.sim.train_unit(building, *index)?;
            }
            Order::Place {
                index,
                at,
                worker,
                label,
            } => {
                let worker = worker.as_deref().map(|w| self.resolve(w)).transpose()?;
                let player = self.player.clone();
                let site = self.sim.place_building(*index, *at, &player, worker)?;
                if let Some(label) = label {
                    self.labels.insert(label.clone(), site);
                }
            }
        }
        Ok(())
    }

    /// Handle one protocol command.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let name = cmd.name();
        tracing::debug!(cmd = name, "Handling command");

        match self.execute(cmd) {
            Ok(responses) => responses,
            Err(err) => {
                tracing::warn!(cmd = name, %err, "Command failed");
                vec![Response::error(err.to_string(), Some(name))]
            }
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Vec<Response>, RunnerError> {
        let name = cmd.name();
        let responses = match cmd {
            Command::Tick { count } => {
                if count == 0 {
                    return Ok(vec![Response::ack(name)]);
                }
                let mut responses = Vec::new();
                for _ in 0..count {
                    let events = self.step();
                    responses.push(Response::Events {
                        tick: self.sim.get_tick(),
                        events,
                    });
                    if self.config.auto_state {
                        responses.push(self.state());
                    }
                }
                responses
            }
            Command::Query => vec![self.state()],
            Command::Hash => vec![Response::StateHash {
                tick: self.sim.get_tick(),
                hash: self.sim.state_hash(),
            }],
            Command::SpawnUnit { kind, x, y, faction } => {
                let id = self.spawn_unit(&kind, point(x, y)?, faction.as_deref())?;
                vec![Response::Spawned { entity_id: id, kind }]
            }
            Command::SpawnBuilding {
                kind,
                x,
                y,
                faction,
                completed,
            } => {
                let id = self.spawn_building(&kind, point(x, y)?, faction.as_deref(), completed)?;
                vec![Response::Spawned { entity_id: id, kind }]
            }
            Command::SpawnNode {
                resource,
                amount,
                x,
                y,
            } => {
                let id = self
                    .sim
                    .spawn_resource_node(ResourceNode::new(resource, amount), point(x, y)?);
                vec![Response::Spawned {
                    entity_id: id,
                    kind: resource.name().to_string(),
                }]
            }
            Command::Gather { unit, node } => {
                self.sim.order_gather(unit, node)?;
                vec![Response::ack(name)]
            }
            Command::Build { unit, site } => {
                self.sim.order_build(unit, site)?;
                vec![Response::ack(name)]
            }
            Command::Attack { unit, target } => {
                self.sim.order_attack(unit, target)?;
                vec![Response::ack(name)]
            }
            Command::Move { unit, x, y } => {
                self.sim.order_move(unit, point(x, y)?)?;
                vec![Response::ack(name)]
            }
            Command::Stop { unit } => {
                self.sim.stop(unit)?;
                vec![Response::ack(name)]
            }
            Command::EndAttack { unit } => {
                self.sim.end_attack(unit)?;
                vec![Response::ack(name)]
            }
            Command::Train { building, index } => {
                self.sim.train_unit(building, index)?;
                vec![Response::ack(name)]
            }
            Command::Place {
                index,
                x,
                y,
                worker,
            } => {
                let player = self.player.clone();
                let site = self.sim.place_building(index, point(x, y)?, &player, worker)?;
                let kind = self
                    .sim
                    .catalog()
                    .buildings
                    .get(index)
                    .map(|building| building.name.clone())
                    .unwrap_or_default();
                vec![Response::Spawned {
                    entity_id: site,
                    kind,
                }]
            }
            Command::AddResource { resource, amount } => {
                self.sim.ledger_mut().add_resource(&resource, amount);
                vec![Response::ack(name)]
            }
            Command::Kill { entity_id } => {
                self.sim.despawn_entity(entity_id)?;
                vec![Response::ack(name)]
            }
            Command::Pointer {
                x,
                y,
                action,
                extend,
            } => {
                let cursor = point(x, y)?;
                let frame = match action {
                    PointerAction::Hover => PointerFrame::hover(cursor),
                    PointerAction::Press => PointerFrame::press(cursor),
                    PointerAction::Hold => PointerFrame::hold(cursor),
                    PointerAction::Release => PointerFrame::release(cursor),
                    PointerAction::Secondary => PointerFrame::secondary(cursor),
                };
                let frame = if extend { frame.extended() } else { frame };
                self.controller.handle_pointer(&frame, &mut self.sim);
                vec![self.ui_events()]
            }
            Command::Selection => vec![Response::Selection {
                units: self.controller.selected_units(),
                focused: self.controller.focused_building(),
            }],
            Command::TrainFocused { index } => {
                if !self.controller.train_unit(index, &mut self.sim) {
                    return Ok(vec![Response::error("Training request refused", Some(name))]);
                }
                vec![Response::ack(name)]
            }
            Command::BeginPlacement { index } => {
                self.controller.begin_placement(index, &self.sim)?;
                vec![self.ui_events()]
            }
            Command::CancelPlacement => {
                self.controller.cancel_placement();
                vec![self.ui_events()]
            }
            Command::LoadScenario { path } => {
                let scenario = Scenario::load(&path)?;
                *self = Self::from_scenario(&scenario, self.config)?;
                vec![Response::ack(name)]
            }
            Command::Quit => {
                self.finished = true;
                vec![Response::Bye]
            }
        };
        Ok(responses)
    }

    fn ui_events(&mut self) -> Response {
        Response::Ui {
            events: self.controller.take_events(),
        }
    }

    /// Snapshot every entity, the stockpile and the hash.
    pub fn state(&self) -> Response {
        let entities = self
            .sim
            .entities()
            .sorted_ids()
            .into_iter()
            .filter_map(|id| self.sim.get_entity(id))
            .map(entity_state)
            .collect();

        Response::State {
            tick: self.sim.get_tick(),
            entities,
            stockpile: self.sim.ledger().all_resources(),
            hash: self.sim.state_hash(),
        }
    }

    /// Serve JSON commands from `input` until `quit` or end of input.
    ///
    /// Lines that fail to parse produce an error response; the session
    /// continues.
    pub fn run_session<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        output.write_all(Response::ready(self.sim.get_tick()).to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(cmd) => self.handle(cmd),
                Err(e) => vec![Response::error(format!("Parse error: {e}"), None)],
            };
            for response in responses {
                output.write_all(response.to_json_line().as_bytes())?;
            }
            output.flush()?;

            if self.finished {
                break;
            }
        }
        tracing::info!(tick = self.sim.get_tick(), "Session ended");
        Ok(())
    }

    fn resolve(&self, label: &str) -> Result<EntityId, RunnerError> {
        self.label(label)
            .ok_or_else(|| RunnerError::UnknownLabel(label.to_string()))
    }

    fn faction(&self, faction: Option<&str>) -> FactionId {
        faction.map_or_else(|| self.player.clone(), FactionId::new)
    }

    fn spawn_unit(
        &mut self,
        kind: &str,
        at: Vec2Fixed,
        faction: Option<&str>,
    ) -> Result<EntityId, RunnerError> {
        let data = self
            .sim
            .catalog()
            .unit(kind)
            .cloned()
            .ok_or_else(|| RunnerError::UnknownTemplate {
                kind: "unit",
                name: kind.to_string(),
            })?;
        let faction = self.faction(faction);
        Ok(self.sim.spawn_unit(&data, at, &faction))
    }

    fn spawn_building(
        &mut self,
        kind: &str,
        at: Vec2Fixed,
        faction: Option<&str>,
        completed: bool,
    ) -> Result<EntityId, RunnerError> {
        let data = self
            .sim
            .catalog()
            .building(kind)
            .cloned()
            .ok_or_else(|| RunnerError::UnknownTemplate {
                kind: "building",
                name: kind.to_string(),
            })?;
        let faction = self.faction(faction);
        Ok(self.sim.spawn_building(&data, at, &faction, completed))
    }
}

fn tick_delta_for(tick_rate: u32) -> Fixed {
    Fixed::ONE / Fixed::from_num(tick_rate.max(1))
}

fn point(x: f64, y: f64) -> Result<Vec2Fixed, RunnerError> {
    match (Fixed::checked_from_num(x), Fixed::checked_from_num(y)) {
        (Some(fx), Some(fy)) => Ok(Vec2Fixed::new(fx, fy)),
        _ => Err(RunnerError::InvalidCoordinate { x, y }),
    }
}

fn entity_state(entity: &Entity) -> EntityState {
    let position = entity.position.map(|p| p.value).unwrap_or_default();
    EntityState {
        id: entity.id,
        name: entity.name.clone(),
        x: position.x.to_num(),
        y: position.y.to_num(),
        faction: entity.faction.as_ref().map(ToString::to_string),
        health: entity.health.map(|h| HealthState {
            current: h.current,
            max: h.max,
        }),
        state: entity
            .collector
            .as_ref()
            .map(|c| format!("{:?}", c.state())),
        cargo: entity.collector.as_ref().map(|c| c.cargo().amount()),
        target: entity.attacker.as_ref().and_then(|a| a.target()),
        remaining: entity.resource_node.as_ref().map(|n| n.remaining),
        progress: entity
            .construction
            .as_ref()
            .map(|c| c.progress().to_num()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::economy::ResourceType;
    use hearth_test_utils::fixtures::{sample_catalog, PLAYER};

    fn runner() -> HeadlessRunner {
        HeadlessRunner::new(sample_catalog(), FactionId::new(PLAYER), HeadlessConfig::default())
    }

    fn spawned_id(responses: &[Response]) -> u64 {
        match responses {
            [Response::Spawned { entity_id, .. }] => *entity_id,
            other => panic!("expected a spawn, got {other:?}"),
        }
    }

    #[test]
    fn test_tick_emits_one_events_line_per_tick() {
        let mut runner = runner();
        let responses = runner.handle(Command::Tick { count: 3 });
        let ticks: Vec<u64> = responses
            .iter()
            .map(|r| match r {
                Response::Events { tick, .. } => *tick,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(ticks, vec![1, 2, 3]);
    }

    #[test]
    fn test_auto_state_follows_each_tick() {
        let config = HeadlessConfig {
            auto_state: true,
            ..HeadlessConfig::default()
        };
        let mut runner = HeadlessRunner::new(sample_catalog(), FactionId::new(PLAYER), config);
        let responses = runner.handle(Command::Tick { count: 2 });
        assert_eq!(responses.len(), 4);
        assert!(matches!(responses[1], Response::State { tick: 1, .. }));
    }

    #[test]
    fn test_spawn_and_gather() {
        let mut runner = runner();
        let peasant = spawned_id(&runner.handle(Command::SpawnUnit {
            kind: "Peasant".to_string(),
            x: 0.0,
            y: 0.0,
            faction: None,
        }));
        let node = spawned_id(&runner.handle(Command::SpawnNode {
            resource: ResourceType::Gold,
            amount: 20,
            x: 0.5,
            y: 0.0,
        }));

        assert_eq!(
            runner.handle(Command::Gather { unit: peasant, node }),
            vec![Response::ack("gather")]
        );
        runner.handle(Command::Tick { count: 1 });

        let node_state = runner.simulation().get_entity(node).and_then(|e| e.resource_node.clone());
        assert_eq!(node_state.map(|n| n.remaining), Some(19));
    }

    #[test]
    fn test_unknown_unit_is_an_error_response() {
        let mut runner = runner();
        let responses = runner.handle(Command::SpawnUnit {
            kind: "Dragon".to_string(),
            x: 0.0,
            y: 0.0,
            faction: None,
        });
        assert!(matches!(
            &responses[..],
            [Response::Error { message, cmd: Some(cmd) }] if message.contains("Dragon") && cmd == "spawn_unit"
        ));
    }

    #[test]
    fn test_non_finite_coordinate_is_rejected() {
        let mut runner = runner();
        let responses = runner.handle(Command::SpawnNode {
            resource: ResourceType::Wood,
            amount: 5,
            x: f64::NAN,
            y: 0.0,
        });
        assert!(matches!(&responses[..], [Response::Error { .. }]));
        assert!(runner.simulation().entities().is_empty());
    }

    #[test]
    fn test_place_reports_site_and_charges_gold() {
        let mut runner = runner();
        runner.handle(Command::AddResource {
            resource: "Gold".to_string(),
            amount: 200,
        });
        let responses = runner.handle(Command::Place {
            index: 1,
            x: 10.0,
            y: 10.0,
            worker: None,
        });
        assert!(matches!(
            &responses[..],
            [Response::Spawned { kind, .. }] if kind == "Barracks"
        ));
        assert_eq!(runner.simulation().ledger().get_resource("Gold"), 50);
    }

    #[test]
    fn test_state_lists_entities_in_id_order() {
        let mut runner = runner();
        for x in [3.0, 1.0, 2.0] {
            runner.handle(Command::SpawnUnit {
                kind: "Soldier".to_string(),
                x,
                y: 0.0,
                faction: Some("enemy".to_string()),
            });
        }
        let Response::State { entities, .. } = runner.state() else {
            panic!("state response");
        };
        let ids: Vec<u64> = entities.iter().map(|e| e.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(entities[0].x, 3.0);
        assert_eq!(entities[0].faction.as_deref(), Some("enemy"));
    }

    #[test]
    fn test_session_survives_bad_lines_and_stops_on_quit() {
        let mut runner = runner();
        let input = "{\"cmd\":\"tick\"}\nnot json\n\n{\"cmd\":\"quit\"}\n{\"cmd\":\"tick\"}\n";
        let mut output = Vec::new();
        runner.run_session(input.as_bytes(), &mut output).unwrap();

        let lines: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], Response::ready(0));
        assert!(matches!(lines[1], Response::Events { tick: 1, .. }));
        assert!(matches!(&lines[2], Response::Error { cmd: None, .. }));
        assert_eq!(lines[3], Response::Bye);
        assert!(runner.is_finished());
        assert_eq!(runner.simulation().get_tick(), 1);
    }

    #[test]
    fn test_pointer_click_selects_and_right_click_moves() {
        let mut runner = runner();
        let soldier = spawned_id(&runner.handle(Command::SpawnUnit {
            kind: "Soldier".to_string(),
            x: 5.0,
            y: 5.0,
            faction: None,
        }));

        let pointer = |action| Command::Pointer {
            x: 50.0,
            y: 50.0,
            action,
            extend: false,
        };
        runner.handle(pointer(PointerAction::Press));
        let released = runner.handle(pointer(PointerAction::Release));
        assert!(matches!(&released[..], [Response::Ui { events }] if !events.is_empty()));

        assert_eq!(
            runner.handle(Command::Selection),
            vec![Response::Selection {
                units: vec![soldier],
                focused: None,
            }]
        );

        runner.handle(Command::Pointer {
            x: 100.0,
            y: 100.0,
            action: PointerAction::Secondary,
            extend: false,
        });
        runner.handle(Command::Tick { count: 4 });

        let position = runner
            .simulation()
            .get_entity(soldier)
            .and_then(|e| e.position)
            .map(|p| p.value);
        assert!(position.is_some_and(|p| p.x > Fixed::from_num(5)));
    }

    #[test]
    fn test_train_focused_without_a_building_is_refused() {
        let mut runner = runner();
        assert!(matches!(
            &runner.handle(Command::TrainFocused { index: 0 })[..],
            [Response::Error { cmd: Some(cmd), .. }] if cmd == "train_focused"
        ));
    }
}
