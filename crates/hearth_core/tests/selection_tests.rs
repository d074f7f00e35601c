//! Pointer-driven selection and command tests.
//!
//! The fixture viewport maps world `(x, y)` to screen `(10x, 10y)`.

use hearth_core::buildings::ConstructionEvent;
use hearth_core::components::EntityId;
use hearth_core::economy::ResourceType;
use hearth_core::error::GameError;
use hearth_core::math::Vec2Fixed;
use hearth_core::production::ProductionEvent;
use hearth_core::selection::{
    ConstructionSurface, PointerFrame, PointerState, SelectionController, SelectionSettings, UiEvent,
};
use hearth_core::simulation::Simulation;
use hearth_core::viewport::{ScreenRect, TopDownViewport};
use hearth_test_utils::fixtures::{fixed, quarter_second, screen_of, vec2, TestWorld};

fn click(controller: &mut SelectionController, sim: &mut Simulation, world_at: Vec2Fixed) {
    let screen = screen_of(world_at);
    controller.handle_pointer(&PointerFrame::press(screen), sim);
    controller.handle_pointer(&PointerFrame::release(screen), sim);
}

fn shift_click(controller: &mut SelectionController, sim: &mut Simulation, world_at: Vec2Fixed) {
    let screen = screen_of(world_at);
    controller.handle_pointer(&PointerFrame::press(screen).extended(), sim);
    controller.handle_pointer(&PointerFrame::release(screen).extended(), sim);
}

fn drag(controller: &mut SelectionController, sim: &mut Simulation, from: Vec2Fixed, to: Vec2Fixed) {
    controller.handle_pointer(&PointerFrame::press(from), sim);
    controller.handle_pointer(&PointerFrame::hold(to), sim);
    controller.handle_pointer(&PointerFrame::release(to), sim);
}

fn right_click(controller: &mut SelectionController, sim: &mut Simulation, world_at: Vec2Fixed) {
    controller.handle_pointer(&PointerFrame::secondary(screen_of(world_at)), sim);
}

fn mover_target(sim: &Simulation, unit: EntityId) -> Vec2Fixed {
    sim.get_entity(unit)
        .and_then(|entity| entity.mover)
        .map(|mover| mover.target())
        .expect("mover")
}

// =============================================================================
// Click selection
// =============================================================================

#[test]
fn test_click_selects_and_empty_click_clears() {
    let mut world = TestWorld::new();
    let peasant = world.peasant(vec2(5.0, 5.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(5.0, 5.0));
    assert_eq!(controller.selected_units(), vec![peasant]);
    assert_eq!(
        controller.construction_surface(),
        ConstructionSurface::Open { unit: peasant }
    );

    click(&mut controller, &mut world.sim, vec2(40.0, 40.0));
    assert_eq!(controller.selected_count(), 0);
    assert_eq!(controller.construction_surface(), ConstructionSurface::Closed);

    let events = controller.take_events();
    assert_eq!(
        events,
        vec![
            UiEvent::SelectionChanged {
                entity: peasant,
                selected: true
            },
            UiEvent::ConstructionSurfaceOpened(peasant),
            UiEvent::SelectionChanged {
                entity: peasant,
                selected: false
            },
            UiEvent::ConstructionSurfaceClosed,
        ]
    );
}

#[test]
fn test_production_building_click_then_empty_click_closes_panel() {
    let mut world = TestWorld::new();
    let barracks = world.barracks(vec2(20.0, 20.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(20.0, 20.0));
    assert_eq!(controller.focused_building(), Some(barracks));
    assert!(controller.is_selected(barracks));

    click(&mut controller, &mut world.sim, vec2(50.0, 50.0));
    assert_eq!(controller.focused_building(), None);
    assert_eq!(controller.selected_count(), 0);

    let events = controller.take_events();
    assert!(events.contains(&UiEvent::PanelOpened(barracks)));
    assert_eq!(events.last(), Some(&UiEvent::PanelClosed(barracks)));
}

#[test]
fn test_second_click_on_focused_building_hides_panel() {
    let mut world = TestWorld::new();
    let barracks = world.barracks(vec2(20.0, 20.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(20.0, 20.0));
    click(&mut controller, &mut world.sim, vec2(20.0, 20.0));

    assert_eq!(controller.focused_building(), None);
    assert!(controller.is_selected(barracks));

    click(&mut controller, &mut world.sim, vec2(20.0, 20.0));
    assert_eq!(controller.focused_building(), Some(barracks));
}

#[test]
fn test_unfinished_building_has_no_panel() {
    let mut world = TestWorld::new();
    let site = world.building("Barracks", vec2(20.0, 20.0), false);
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(20.0, 20.0));

    assert!(controller.is_selected(site));
    assert_eq!(controller.focused_building(), None);
}

#[test]
fn test_modifier_click_toggles_membership() {
    let mut world = TestWorld::new();
    let a = world.soldier(vec2(2.0, 2.0));
    let b = world.soldier(vec2(8.0, 2.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(2.0, 2.0));
    shift_click(&mut controller, &mut world.sim, vec2(8.0, 2.0));
    assert_eq!(controller.selected_units(), vec![a, b]);

    shift_click(&mut controller, &mut world.sim, vec2(2.0, 2.0));
    assert_eq!(controller.selected_units(), vec![b]);

    // An extended click on empty ground keeps the selection.
    shift_click(&mut controller, &mut world.sim, vec2(50.0, 50.0));
    assert_eq!(controller.selected_units(), vec![b]);
}

#[test]
fn test_small_movement_stays_a_click() {
    let mut world = TestWorld::new();
    let mut controller = world.controller();

    controller.handle_pointer(&PointerFrame::press(vec2(100.0, 100.0)), &mut world.sim);
    controller.handle_pointer(&PointerFrame::hold(vec2(103.0, 104.0)), &mut world.sim);

    assert_eq!(
        controller.pointer_state(),
        PointerState::PendingClick {
            anchor: vec2(100.0, 100.0)
        }
    );
    assert!(controller.take_events().is_empty());
}

// =============================================================================
// Box selection
// =============================================================================

#[test]
fn test_box_selects_friendly_units_only() {
    let mut world = TestWorld::new();
    let a = world.peasant(vec2(1.0, 1.0));
    let b = world.peasant(vec2(2.0, 3.0));
    world.enemy_soldier(vec2(3.0, 2.0));
    world.hall(vec2(2.0, 2.0));
    let outside = world.soldier(vec2(30.0, 30.0));
    let mut controller = world.controller();

    drag(&mut controller, &mut world.sim, vec2(0.0, 0.0), vec2(40.0, 40.0));

    assert_eq!(controller.selected_units(), vec![a, b]);
    assert!(!controller.is_selected(outside));
    assert_eq!(controller.construction_surface(), ConstructionSurface::Open { unit: b });

    let events = controller.take_events();
    let rect = ScreenRect::from_corners(vec2(0.0, 0.0), vec2(40.0, 40.0));
    assert_eq!(events[0], UiEvent::SelectionBoxShown(rect));
    assert!(events.contains(&UiEvent::SelectionBoxHidden));
}

#[test]
fn test_box_replaces_selection_unless_extended() {
    let mut world = TestWorld::new();
    let a = world.soldier(vec2(1.0, 1.0));
    let b = world.soldier(vec2(20.0, 20.0));
    let mut controller = world.controller();

    drag(&mut controller, &mut world.sim, vec2(0.0, 0.0), vec2(30.0, 30.0));
    assert_eq!(controller.selected_units(), vec![a]);

    drag(&mut controller, &mut world.sim, vec2(190.0, 190.0), vec2(210.0, 210.0));
    assert_eq!(controller.selected_units(), vec![b]);

    let from = vec2(0.0, 0.0);
    let to = vec2(30.0, 30.0);
    controller.handle_pointer(&PointerFrame::press(from).extended(), &mut world.sim);
    controller.handle_pointer(&PointerFrame::hold(to).extended(), &mut world.sim);
    controller.handle_pointer(&PointerFrame::release(to).extended(), &mut world.sim);
    assert_eq!(controller.selected_units(), vec![b, a]);
}

#[test]
fn test_ui_control_swallows_press() {
    let mut world = TestWorld::new();
    world.peasant(vec2(5.0, 5.0));
    let viewport = TopDownViewport::new(Vec2Fixed::ZERO, fixed(10))
        .with_ui_rect(ScreenRect::from_corners(vec2(0.0, 0.0), vec2(100.0, 100.0)));
    let mut controller = SelectionController::new(SelectionSettings::default(), Some(Box::new(viewport)));

    click(&mut controller, &mut world.sim, vec2(5.0, 5.0));

    assert_eq!(controller.selected_count(), 0);
    assert_eq!(controller.pointer_state(), PointerState::Idle);
}

#[test]
fn test_despawned_unit_drops_out_of_selection() {
    let mut world = TestWorld::new();
    let peasant = world.peasant(vec2(5.0, 5.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(5.0, 5.0));
    controller.take_events();

    world.sim.despawn_entity(peasant).expect("peasant exists");
    controller.handle_pointer(&PointerFrame::hover(vec2(0.0, 0.0)), &mut world.sim);

    assert_eq!(controller.selected_count(), 0);
    assert_eq!(controller.construction_surface(), ConstructionSurface::Closed);
    assert_eq!(
        controller.take_events(),
        vec![
            UiEvent::SelectionChanged {
                entity: peasant,
                selected: false
            },
            UiEvent::ConstructionSurfaceClosed,
        ]
    );
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn test_right_click_ground_moves_in_formation() {
    let mut world = TestWorld::new();
    let a = world.soldier(vec2(1.0, 1.0));
    let b = world.soldier(vec2(2.0, 2.0));
    let mut controller = world.controller();

    drag(&mut controller, &mut world.sim, vec2(0.0, 0.0), vec2(30.0, 30.0));
    right_click(&mut controller, &mut world.sim, vec2(50.0, 50.0));

    assert_eq!(mover_target(&world.sim, a), vec2(49.25, 49.25));
    assert_eq!(mover_target(&world.sim, b), vec2(50.75, 49.25));
}

#[test]
fn test_right_click_node_sends_collectors_only() {
    let mut world = TestWorld::new();
    let peasant = world.peasant(vec2(1.0, 1.0));
    let soldier = world.soldier(vec2(2.0, 2.0));
    let node = world.node(ResourceType::Wood, 100, vec2(20.0, 20.0));
    let mut controller = world.controller();

    drag(&mut controller, &mut world.sim, vec2(0.0, 0.0), vec2(30.0, 30.0));
    right_click(&mut controller, &mut world.sim, vec2(20.0, 20.0));

    let collector = world
        .sim
        .get_entity(peasant)
        .and_then(|entity| entity.collector.as_ref())
        .expect("collector");
    assert_eq!(collector.resource_target(), Some(node));
    assert_eq!(mover_target(&world.sim, soldier), vec2(2.0, 2.0));
}

#[test]
fn test_right_click_enemy_attacks_and_friend_is_ignored() {
    let mut world = TestWorld::new();
    let soldier = world.soldier(vec2(1.0, 1.0));
    let friend = world.peasant(vec2(10.0, 10.0));
    let enemy = world.enemy_soldier(vec2(20.0, 20.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(1.0, 1.0));

    right_click(&mut controller, &mut world.sim, vec2(10.0, 10.0));
    let attacker = world.sim.get_entity(soldier).and_then(|e| e.attacker).expect("attacker");
    assert_eq!(attacker.target(), None);
    assert_eq!(mover_target(&world.sim, soldier), vec2(1.0, 1.0));
    assert!(world.sim.get_entity(friend).is_some());

    right_click(&mut controller, &mut world.sim, vec2(20.0, 20.0));
    let attacker = world.sim.get_entity(soldier).and_then(|e| e.attacker).expect("attacker");
    assert_eq!(attacker.target(), Some(enemy));
}

#[test]
fn test_right_click_without_selection_does_nothing() {
    let mut world = TestWorld::new();
    let soldier = world.soldier(vec2(1.0, 1.0));
    let mut controller = world.controller();

    right_click(&mut controller, &mut world.sim, vec2(30.0, 30.0));

    assert_eq!(mover_target(&world.sim, soldier), vec2(1.0, 1.0));
}

// =============================================================================
// Training and placement
// =============================================================================

#[test]
fn test_train_from_focused_panel() {
    let mut world = TestWorld::new().with_gold(100);
    let barracks = world.barracks(vec2(20.0, 20.0));
    let mut controller = world.controller();

    assert!(!controller.train_unit(0, &mut world.sim));

    click(&mut controller, &mut world.sim, vec2(20.0, 20.0));
    assert!(controller.train_unit(0, &mut world.sim));
    assert_eq!(world.sim.ledger().get_resource("Gold"), 20);

    // Second job while one is in flight, and an out-of-range index.
    assert!(!controller.train_unit(1, &mut world.sim));
    assert!(!controller.train_unit(7, &mut world.sim));
    assert_eq!(world.sim.ledger().get_resource("Gold"), 20);

    let events = world.run_for(16, quarter_second());
    assert_eq!(
        events[0].production[0],
        ProductionEvent::TrainingStarted {
            building: barracks,
            unit: "Soldier".to_string(),
            cost: 80,
        }
    );
    let trained: Vec<EntityId> = events.iter().flat_map(|tick| tick.spawned.iter().copied()).collect();
    assert_eq!(trained.len(), 1);

    let soldier = world.sim.get_entity(trained[0]).expect("trained soldier");
    assert_eq!(soldier.name, "Soldier");
    assert_eq!(soldier.position.map(|p| p.value), Some(vec2(20.0, 17.0)));
    assert_eq!(world.sim.training_progress(barracks), Some(fixed(0)));
}

#[test]
fn test_place_building_through_surface() {
    let mut world = TestWorld::new().with_gold(500);
    let peasant = world.peasant(vec2(5.0, 5.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(5.0, 5.0));
    controller.take_events();

    controller.begin_placement(1, &world.sim).expect("placement starts");
    assert_eq!(
        controller.construction_surface(),
        ConstructionSurface::Placing {
            unit: peasant,
            index: 1
        }
    );

    controller.handle_pointer(&PointerFrame::press(screen_of(vec2(10.0, 0.0))), &mut world.sim);
    assert_eq!(controller.construction_surface(), ConstructionSurface::Closed);
    assert_eq!(world.sim.ledger().get_resource("Gold"), 350);

    let events = controller.take_events();
    let Some(UiEvent::BuildingPlaced { building, worker }) = events.last().copied() else {
        panic!("expected a placement event, got {events:?}");
    };
    assert_eq!(worker, peasant);

    let site = world.sim.get_entity(building).expect("site");
    assert_eq!(site.name, "Barracks");
    assert!(site.construction.as_ref().is_some_and(|c| !c.is_complete()));

    let collector = world
        .sim
        .get_entity(peasant)
        .and_then(|entity| entity.collector.as_ref())
        .expect("collector");
    assert_eq!(collector.building_target(), Some(building));

    let tick = world.sim.tick(quarter_second());
    assert!(tick
        .construction
        .contains(&ConstructionEvent::Placed { building, cost: 150 }));
}

#[test]
fn test_unaffordable_placement_stays_in_placing_mode() {
    let mut world = TestWorld::new();
    let peasant = world.peasant(vec2(5.0, 5.0));
    let mut controller = world.controller();

    click(&mut controller, &mut world.sim, vec2(5.0, 5.0));
    controller.begin_placement(0, &world.sim).expect("placement starts");
    controller.take_events();

    let before = world.sim.entities().len();
    controller.handle_pointer(&PointerFrame::press(screen_of(vec2(10.0, 0.0))), &mut world.sim);
    assert_eq!(world.sim.entities().len(), before);
    assert!(matches!(
        controller.construction_surface(),
        ConstructionSurface::Placing { .. }
    ));

    controller.handle_pointer(&PointerFrame::secondary(screen_of(vec2(10.0, 0.0))), &mut world.sim);
    assert_eq!(
        controller.construction_surface(),
        ConstructionSurface::Open { unit: peasant }
    );
    assert_eq!(
        controller.take_events(),
        vec![UiEvent::PlacementCancelled, UiEvent::ConstructionSurfaceOpened(peasant)]
    );
}

#[test]
fn test_begin_placement_rejects_bad_index() {
    let mut world = TestWorld::new();
    let peasant = world.peasant(vec2(5.0, 5.0));
    let mut controller = world.controller();

    assert!(matches!(
        controller.begin_placement(0, &world.sim),
        Err(GameError::Configuration(_))
    ));

    assert!(controller.open_construction_surface(peasant, &world.sim));
    assert_eq!(
        controller.begin_placement(9, &world.sim),
        Err(GameError::InvalidIndex {
            what: "building",
            index: 9,
            len: 3
        })
    );
    assert_eq!(
        controller.construction_surface(),
        ConstructionSurface::Open { unit: peasant }
    );
}
