//! Pointer-driven selection and command dispatch.
//!
//! The [`SelectionController`] turns per-frame pointer input into selection
//! changes and unit orders. It owns the [`SelectionSet`], the focused
//! production building and the construction surface, and talks to the world
//! only through a [`Simulation`] borrowed per call.
//!
//! # Pointer state machine
//!
//! ```text
//!   Idle ── press ──▶ PendingClick ── moved > threshold ──▶ Dragging
//!    ▲                    │ release                            │ release
//!    │                    ▼                                    ▼
//!    └─────────────── click pick                          box select
//! ```
//!
//! Frames whose cursor is over a UI control never reach the world.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::simulation::{Entity, Simulation};
use crate::viewport::{ScreenRect, Viewport};

/// Pixels the pointer must travel before a press becomes a drag.
pub const DEFAULT_DRAG_THRESHOLD: Fixed = Fixed::from_bits(5 << 32);

/// World units between formation slots.
pub const DEFAULT_FORMATION_SPACING: Fixed = Fixed::from_bits(3 << 31); // 1.5

/// Tuning for the selection controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Drag threshold in pixels.
    #[serde(with = "fixed_serde")]
    pub drag_threshold: Fixed,
    /// Formation grid spacing in world units.
    #[serde(with = "fixed_serde")]
    pub formation_spacing: Fixed,
    /// Faction the local player controls. Anything else is hostile.
    pub player_faction: FactionId,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            formation_spacing: DEFAULT_FORMATION_SPACING,
            player_faction: FactionId::new("player"),
        }
    }
}

/// Pointer input sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointerFrame {
    /// Cursor position in screen pixels.
    pub cursor: Vec2Fixed,
    /// Primary button went down this frame.
    pub primary_pressed: bool,
    /// Primary button is down.
    pub primary_held: bool,
    /// Primary button went up this frame.
    pub primary_released: bool,
    /// Secondary button went down this frame.
    pub secondary_pressed: bool,
    /// Extend-selection modifier is held.
    pub extend: bool,
}

impl PointerFrame {
    /// Cursor movement with no buttons.
    #[must_use]
    pub fn hover(cursor: Vec2Fixed) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }

    /// Primary button pressed.
    #[must_use]
    pub fn press(cursor: Vec2Fixed) -> Self {
        Self {
            cursor,
            primary_pressed: true,
            primary_held: true,
            ..Self::default()
        }
    }

    /// Primary button held while moving.
    #[must_use]
    pub fn hold(cursor: Vec2Fixed) -> Self {
        Self {
            cursor,
            primary_held: true,
            ..Self::default()
        }
    }

    /// Primary button released.
    #[must_use]
    pub fn release(cursor: Vec2Fixed) -> Self {
        Self {
            cursor,
            primary_released: true,
            ..Self::default()
        }
    }

    /// Secondary button pressed.
    #[must_use]
    pub fn secondary(cursor: Vec2Fixed) -> Self {
        Self {
            cursor,
            secondary_pressed: true,
            ..Self::default()
        }
    }

    /// Same frame with the extend modifier held.
    #[must_use]
    pub const fn extended(mut self) -> Self {
        self.extend = true;
        self
    }
}

/// Where the pointer state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointerState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Pressed, not yet moved past the drag threshold.
    PendingClick {
        /// Press position.
        anchor: Vec2Fixed,
    },
    /// Box-selecting.
    Dragging {
        /// Press position.
        anchor: Vec2Fixed,
        /// Latest cursor position.
        current: Vec2Fixed,
    },
}

/// Construction command surface bound to one collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstructionSurface {
    /// Not shown.
    #[default]
    Closed,
    /// Showing the building menu for `unit`.
    Open {
        /// Collector that will build.
        unit: EntityId,
    },
    /// Menu hidden; the next primary click places catalog building `index`.
    Placing {
        /// Collector that will build.
        unit: EntityId,
        /// Catalog building index.
        index: usize,
    },
}

impl ConstructionSurface {
    /// Collector the surface is bound to.
    #[must_use]
    pub const fn unit(&self) -> Option<EntityId> {
        match *self {
            Self::Closed => None,
            Self::Open { unit } | Self::Placing { unit, .. } => Some(unit),
        }
    }
}

/// Notifications for the UI and render layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    /// Show or hide an entity's selection indicator.
    SelectionChanged {
        /// Affected entity.
        entity: EntityId,
        /// New state.
        selected: bool,
    },
    /// The drag rectangle appeared.
    SelectionBoxShown(ScreenRect),
    /// The drag rectangle changed.
    SelectionBoxResized(ScreenRect),
    /// The drag rectangle disappeared.
    SelectionBoxHidden,
    /// A production building's training panel opened.
    PanelOpened(EntityId),
    /// A production building's training panel closed.
    PanelClosed(EntityId),
    /// The construction surface opened for a collector.
    ConstructionSurfaceOpened(EntityId),
    /// The construction surface closed.
    ConstructionSurfaceClosed,
    /// Placement preview started.
    PlacementStarted {
        /// Collector that will build.
        unit: EntityId,
        /// Catalog building index.
        index: usize,
    },
    /// Placement preview dismissed without placing.
    PlacementCancelled,
    /// A building site was placed.
    BuildingPlaced {
        /// The new site.
        building: EntityId,
        /// Collector sent to build it.
        worker: EntityId,
    },
}

/// Selected entities in selection order, plus the focused production building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    units: Vec<EntityId>,
    focused: Option<EntityId>,
}

impl SelectionSet {
    /// Selected entities, oldest first.
    #[must_use]
    pub fn units(&self) -> &[EntityId] {
        &self.units
    }

    /// Number of selected entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.units.contains(&entity)
    }

    /// Building whose panel is shown.
    #[must_use]
    pub const fn focused(&self) -> Option<EntityId> {
        self.focused
    }

    /// Add an entity. Returns `false` if it was already selected.
    pub fn insert(&mut self, entity: EntityId) -> bool {
        if self.contains(entity) {
            return false;
        }
        self.units.push(entity);
        true
    }

    /// Remove an entity. Returns `false` if it was not selected.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let before = self.units.len();
        self.units.retain(|&id| id != entity);
        self.units.len() != before
    }

    /// Remove everything, returning what was selected.
    pub fn clear(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.units)
    }
}

/// What a primary click landed on, in precedence order.
enum ClickTarget {
    ProductionBuilding(EntityId),
    Collector(EntityId),
    Plain(EntityId),
}

/// Turns pointer frames into selection changes and orders.
pub struct SelectionController {
    settings: SelectionSettings,
    viewport: Option<Box<dyn Viewport>>,
    pointer: PointerState,
    selection: SelectionSet,
    surface: ConstructionSurface,
    outbox: Vec<UiEvent>,
}

impl std::fmt::Debug for SelectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionController")
            .field("settings", &self.settings)
            .field("enabled", &self.viewport.is_some())
            .field("pointer", &self.pointer)
            .field("selection", &self.selection)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

impl SelectionController {
    /// Create a controller.
    ///
    /// Without a viewport the controller logs a configuration error and
    /// disables itself; every call becomes a no-op.
    #[must_use]
    pub fn new(settings: SelectionSettings, viewport: Option<Box<dyn Viewport>>) -> Self {
        if viewport.is_none() {
            let err = GameError::Configuration("selection controller has no viewport".to_string());
            tracing::error!(%err, "Selection controller disabled");
        }
        Self {
            settings,
            viewport,
            pointer: PointerState::Idle,
            selection: SelectionSet::default(),
            surface: ConstructionSurface::Closed,
            outbox: Vec::new(),
        }
    }

    /// Whether the controller has what it needs to run.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.viewport.is_some()
    }

    /// Controller settings.
    #[must_use]
    pub const fn settings(&self) -> &SelectionSettings {
        &self.settings
    }

    /// Pointer state.
    #[must_use]
    pub const fn pointer_state(&self) -> PointerState {
        self.pointer
    }

    /// Selection set.
    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Snapshot of selected entities in selection order.
    #[must_use]
    pub fn selected_units(&self) -> Vec<EntityId> {
        self.selection.units.clone()
    }

    /// Number of selected entities.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    /// Whether `entity` is selected.
    #[must_use]
    pub fn is_selected(&self, entity: EntityId) -> bool {
        self.selection.contains(entity)
    }

    /// Production building whose panel is shown.
    #[must_use]
    pub const fn focused_building(&self) -> Option<EntityId> {
        self.selection.focused
    }

    /// Construction surface state.
    #[must_use]
    pub const fn construction_surface(&self) -> ConstructionSurface {
        self.surface
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------------
    // Frame processing
    // ------------------------------------------------------------------------

    /// Process one frame of pointer input.
    pub fn handle_pointer(&mut self, frame: &PointerFrame, sim: &mut Simulation) {
        let Some(viewport) = self.viewport.take() else {
            return;
        };
        self.prune_missing(sim);
        self.process_frame(frame, viewport.as_ref(), sim);
        self.viewport = Some(viewport);
    }

    fn process_frame(&mut self, frame: &PointerFrame, viewport: &dyn Viewport, sim: &mut Simulation) {
        if viewport.is_over_ui_control(frame.cursor) {
            if frame.primary_pressed {
                self.reset_pointer();
            }
            return;
        }

        if let ConstructionSurface::Placing { unit, index } = self.surface {
            self.process_placement(frame, viewport, sim, unit, index);
            return;
        }

        if frame.primary_pressed {
            self.pointer = PointerState::PendingClick {
                anchor: frame.cursor,
            };
        }

        if frame.primary_held {
            if let PointerState::PendingClick { anchor } = self.pointer {
                let threshold = self.settings.drag_threshold;
                if anchor.distance_squared(frame.cursor) > threshold.saturating_mul(threshold) {
                    self.pointer = PointerState::Dragging {
                        anchor,
                        current: frame.cursor,
                    };
                    self.outbox
                        .push(UiEvent::SelectionBoxShown(ScreenRect::from_corners(anchor, frame.cursor)));
                }
            }
        }

        if let PointerState::Dragging { anchor, .. } = self.pointer {
            self.pointer = PointerState::Dragging {
                anchor,
                current: frame.cursor,
            };
            self.outbox
                .push(UiEvent::SelectionBoxResized(ScreenRect::from_corners(anchor, frame.cursor)));
        }

        if frame.primary_released {
            match self.pointer {
                PointerState::Dragging { anchor, .. } => {
                    self.outbox.push(UiEvent::SelectionBoxHidden);
                    let rect = ScreenRect::from_corners(anchor, frame.cursor);
                    self.select_in_box(rect, frame.extend, viewport, sim);
                }
                PointerState::PendingClick { .. } => {
                    self.select_by_click(frame.cursor, frame.extend, viewport, sim);
                }
                PointerState::Idle => {}
            }
            self.pointer = PointerState::Idle;
        }

        if frame.secondary_pressed {
            self.command_at(frame.cursor, viewport, sim);
        }
    }

    fn reset_pointer(&mut self) {
        if matches!(self.pointer, PointerState::Dragging { .. }) {
            self.outbox.push(UiEvent::SelectionBoxHidden);
        }
        self.pointer = PointerState::Idle;
    }

    fn process_placement(
        &mut self,
        frame: &PointerFrame,
        viewport: &dyn Viewport,
        sim: &mut Simulation,
        unit: EntityId,
        index: usize,
    ) {
        if frame.primary_pressed {
            let Some(ground) = viewport.screen_to_ground(frame.cursor) else {
                tracing::warn!(cursor = ?frame.cursor, "Placement click missed the ground");
                return;
            };
            let faction = self.settings.player_faction.clone();
            match sim.place_building(index, ground, &faction, Some(unit)) {
                Ok(building) => {
                    self.surface = ConstructionSurface::Closed;
                    self.outbox.push(UiEvent::BuildingPlaced {
                        building,
                        worker: unit,
                    });
                }
                Err(err) => tracing::warn!(%err, index, "Building placement rejected"),
            }
        } else if frame.secondary_pressed {
            self.cancel_placement();
        }
    }

    // ------------------------------------------------------------------------
    // Primary click and box resolution
    // ------------------------------------------------------------------------

    fn select_by_click(
        &mut self,
        cursor: Vec2Fixed,
        extend: bool,
        viewport: &dyn Viewport,
        sim: &Simulation,
    ) {
        let hit = viewport
            .screen_to_ground(cursor)
            .and_then(|ground| pick_entity(sim, ground, |entity| entity.selectable.is_some()));

        let Some(entity) = hit else {
            tracing::debug!(?cursor, extend, "Click on empty ground");
            if extend {
                self.close_panel();
            } else {
                self.deselect_all();
                self.close_panel();
                self.close_construction_surface();
            }
            return;
        };

        match classify_click(sim, entity) {
            ClickTarget::ProductionBuilding(building) => {
                let reopen = self.selection.focused != Some(building);
                self.close_panel();
                self.toggle_or_replace(building, extend);
                if reopen && self.selection.contains(building) {
                    self.selection.focused = Some(building);
                    self.outbox.push(UiEvent::PanelOpened(building));
                    tracing::debug!(building, "Training panel opened");
                }
                self.refresh_surface(sim);
            }
            ClickTarget::Collector(unit) => {
                self.close_panel();
                self.toggle_or_replace(unit, extend);
                if self.selection.contains(unit) {
                    self.bind_surface(unit);
                } else {
                    self.refresh_surface(sim);
                }
            }
            ClickTarget::Plain(unit) => {
                self.close_panel();
                self.toggle_or_replace(unit, extend);
                self.refresh_surface(sim);
            }
        }
    }

    fn select_in_box(
        &mut self,
        rect: ScreenRect,
        extend: bool,
        viewport: &dyn Viewport,
        sim: &Simulation,
    ) {
        if !extend {
            self.deselect_all();
            self.close_panel();
            self.close_construction_surface();
        }

        let mut last_collector = None;
        for id in box_candidates(sim, &self.settings.player_faction, rect, viewport) {
            self.select(id);
            if sim.get_entity(id).is_some_and(|entity| entity.collector.is_some()) {
                last_collector = Some(id);
            }
        }

        tracing::debug!(?rect, selected = self.selection.len(), "Box selection resolved");

        if let Some(unit) = last_collector {
            self.bind_surface(unit);
        }
    }

    fn toggle_or_replace(&mut self, entity: EntityId, extend: bool) {
        if extend {
            if self.selection.contains(entity) {
                self.deselect(entity);
            } else {
                self.select(entity);
            }
        } else {
            self.deselect_all();
            self.select(entity);
        }
    }

    fn select(&mut self, entity: EntityId) {
        if self.selection.insert(entity) {
            self.outbox.push(UiEvent::SelectionChanged {
                entity,
                selected: true,
            });
        }
    }

    fn deselect(&mut self, entity: EntityId) {
        if self.selection.remove(entity) {
            self.outbox.push(UiEvent::SelectionChanged {
                entity,
                selected: false,
            });
        }
    }

    fn deselect_all(&mut self) {
        for entity in self.selection.clear() {
            self.outbox.push(UiEvent::SelectionChanged {
                entity,
                selected: false,
            });
        }
    }

    fn close_panel(&mut self) {
        if let Some(building) = self.selection.focused.take() {
            self.outbox.push(UiEvent::PanelClosed(building));
        }
    }

    fn bind_surface(&mut self, unit: EntityId) {
        if self.surface != (ConstructionSurface::Open { unit }) {
            self.surface = ConstructionSurface::Open { unit };
            self.outbox.push(UiEvent::ConstructionSurfaceOpened(unit));
        }
    }

    /// Keep the surface bound to a selected collector, or close it.
    fn refresh_surface(&mut self, sim: &Simulation) {
        if self
            .surface
            .unit()
            .is_some_and(|unit| self.selection.contains(unit))
        {
            return;
        }
        let collector = self
            .selection
            .units
            .iter()
            .copied()
            .find(|&id| sim.get_entity(id).is_some_and(|entity| entity.collector.is_some()));
        match collector {
            Some(unit) => self.bind_surface(unit),
            None => self.close_construction_surface(),
        }
    }

    /// Drop selection entries and bindings for entities that left the world.
    fn prune_missing(&mut self, sim: &Simulation) {
        let gone: Vec<EntityId> = self
            .selection
            .units
            .iter()
            .copied()
            .filter(|&id| sim.get_entity(id).is_none())
            .collect();
        for id in gone {
            tracing::debug!(entity = id, "Removed entity dropped from selection");
            self.deselect(id);
        }
        if self.selection.focused.is_some_and(|id| sim.get_entity(id).is_none()) {
            self.close_panel();
        }
        if self.surface.unit().is_some_and(|id| sim.get_entity(id).is_none()) {
            self.surface = ConstructionSurface::Closed;
            self.outbox.push(UiEvent::ConstructionSurfaceClosed);
        }
    }

    // ------------------------------------------------------------------------
    // Secondary click
    // ------------------------------------------------------------------------

    fn command_at(&mut self, cursor: Vec2Fixed, viewport: &dyn Viewport, sim: &mut Simulation) {
        let Some(ground) = viewport.screen_to_ground(cursor) else {
            tracing::debug!(?cursor, "Command click missed the ground");
            return;
        };

        let units = self.selection.units.clone();
        if units.is_empty() {
            return;
        }

        let Some(target) = pick_entity(sim, ground, |_| true) else {
            self.formation_move(&units, ground, sim);
            return;
        };

        let Some(entity) = sim.get_entity(target) else {
            return;
        };
        let is_node = entity.resource_node.is_some();
        let is_hostile = entity
            .faction
            .as_ref()
            .is_some_and(|faction| *faction != self.settings.player_faction);

        if is_node {
            for unit in units {
                if sim.get_entity(unit).is_some_and(|e| e.collector.is_some()) {
                    if let Err(err) = sim.order_gather(unit, target) {
                        tracing::warn!(unit, node = target, %err, "Gather order rejected");
                    }
                }
            }
        } else if is_hostile {
            for unit in units {
                if sim.get_entity(unit).is_some_and(|e| e.attacker.is_some()) {
                    if let Err(err) = sim.order_attack(unit, target) {
                        tracing::warn!(unit, target, %err, "Attack order rejected");
                    }
                }
            }
        } else {
            tracing::debug!(target, "Command click on friendly entity ignored");
        }
    }

    fn formation_move(&mut self, units: &[EntityId], center: Vec2Fixed, sim: &mut Simulation) {
        let movers: Vec<EntityId> = units
            .iter()
            .copied()
            .filter(|&id| sim.get_entity(id).is_some_and(|entity| entity.mover.is_some()))
            .collect();

        for (unit, slot) in movers.iter().zip(formation_slots(center, movers.len(), self.settings.formation_spacing)) {
            if let Err(err) = sim.order_move(*unit, slot) {
                tracing::warn!(unit, %err, "Move order rejected");
            }
        }
        tracing::debug!(count = movers.len(), ?center, "Formation move issued");
    }

    // ------------------------------------------------------------------------
    // UI entry points
    // ------------------------------------------------------------------------

    /// Train roster entry `index` at the focused building.
    ///
    /// Returns `false` (after logging) when nothing is focused or the
    /// building rejects the request.
    pub fn train_unit(&mut self, index: usize, sim: &mut Simulation) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(building) = self.selection.focused else {
            tracing::warn!(index, "No production building focused");
            return false;
        };
        match sim.train_unit(building, index) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(building, index, %err, "Training rejected");
                false
            }
        }
    }

    /// Open the construction surface for a collector.
    pub fn open_construction_surface(&mut self, unit: EntityId, sim: &Simulation) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if !sim.get_entity(unit).is_some_and(|entity| entity.collector.is_some()) {
            let err = GameError::MissingComponent {
                entity: unit,
                component: "Collector",
            };
            tracing::warn!(%err, "Cannot open construction surface");
            return false;
        }
        self.bind_surface(unit);
        true
    }

    /// Close the construction surface, abandoning any placement.
    pub fn close_construction_surface(&mut self) {
        match self.surface {
            ConstructionSurface::Closed => {}
            ConstructionSurface::Open { .. } => {
                self.outbox.push(UiEvent::ConstructionSurfaceClosed);
            }
            ConstructionSurface::Placing { .. } => {
                self.outbox.push(UiEvent::PlacementCancelled);
            }
        }
        self.surface = ConstructionSurface::Closed;
    }

    /// Pick catalog building `index` for placement.
    ///
    /// The surface must be open; the menu hides while placing.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidIndex`] for an index outside the catalog,
    /// [`GameError::Configuration`] when the surface is not open.
    pub fn begin_placement(&mut self, index: usize, sim: &Simulation) -> Result<()> {
        let ConstructionSurface::Open { unit } = self.surface else {
            return Err(GameError::Configuration(
                "construction surface is not open".to_string(),
            ));
        };
        let len = sim.catalog().buildings.len();
        if index >= len {
            let err = GameError::InvalidIndex {
                what: "building",
                index,
                len,
            };
            tracing::warn!(%err, "Placement aborted");
            return Err(err);
        }
        self.surface = ConstructionSurface::Placing { unit, index };
        self.outbox.push(UiEvent::ConstructionSurfaceClosed);
        self.outbox.push(UiEvent::PlacementStarted { unit, index });
        Ok(())
    }

    /// Abandon placement and show the menu again.
    pub fn cancel_placement(&mut self) {
        if let ConstructionSurface::Placing { unit, .. } = self.surface {
            self.surface = ConstructionSurface::Open { unit };
            self.outbox.push(UiEvent::PlacementCancelled);
            self.outbox.push(UiEvent::ConstructionSurfaceOpened(unit));
        }
    }
}

fn classify_click(sim: &Simulation, id: EntityId) -> ClickTarget {
    match sim.get_entity(id) {
        Some(entity) if entity.training.is_some() => ClickTarget::ProductionBuilding(id),
        Some(entity) if entity.collector.is_some() => ClickTarget::Collector(id),
        _ => ClickTarget::Plain(id),
    }
}

/// Closest entity whose footprint contains `ground`, lowest id on ties.
fn pick_entity<F>(sim: &Simulation, ground: Vec2Fixed, filter: F) -> Option<EntityId>
where
    F: Fn(&Entity) -> bool,
{
    let entities = sim.entities();
    entities
        .sorted_ids()
        .into_iter()
        .filter_map(|id| {
            let entity = entities.get(id)?;
            if !filter(entity) {
                return None;
            }
            let pos = entity.position?.value;
            let radius = entity.footprint.unwrap_or_default().radius;
            let dist_sq = ground.distance_squared(pos);
            (dist_sq <= radius.saturating_mul(radius)).then_some((id, dist_sq))
        })
        .min_by_key(|&(id, dist_sq)| (dist_sq, id))
        .map(|(id, _)| id)
}

/// Friendly selectable units whose projected position lies inside `rect`.
fn box_candidates(
    sim: &Simulation,
    player: &FactionId,
    rect: ScreenRect,
    viewport: &dyn Viewport,
) -> Vec<EntityId> {
    let entities = sim.entities();
    entities
        .sorted_ids()
        .into_iter()
        .filter(|&id| {
            entities.get(id).is_some_and(|entity| {
                entity.selectable.is_some()
                    && entity.mover.is_some()
                    && entity.faction.as_ref().map_or(true, |faction| faction == player)
                    && entity
                        .position
                        .is_some_and(|pos| rect.contains(viewport.world_to_screen(pos.value)))
            })
        })
        .collect()
}

/// Square-grid slots centered on `center`, row-major.
///
/// The grid is `ceil(sqrt(count))` wide.
#[must_use]
pub fn formation_slots(center: Vec2Fixed, count: usize, spacing: Fixed) -> Vec<Vec2Fixed> {
    let mut width = 1_usize;
    while width * width < count {
        width += 1;
    }
    let middle = Fixed::from_num(width - 1) / Fixed::from_num(2);

    (0..count)
        .map(|i| {
            let col = Fixed::from_num(i % width);
            let row = Fixed::from_num(i / width);
            center
                + Vec2Fixed::new(
                    (col - middle).saturating_mul(spacing),
                    (row - middle).saturating_mul(spacing),
                )
        })
        .collect()
}
