//! Property tests for the ledger, nodes, cargo, construction and box selection.

use std::collections::BTreeMap;

use hearth_core::buildings::Construction;
use hearth_core::economy::{Cargo, ResourceLedger, ResourceNode};
use hearth_core::math::{Fixed, Vec2Fixed};
use hearth_core::selection::{formation_slots, PointerFrame};
use hearth_test_utils::fixtures::{fixed, TestWorld};
use hearth_test_utils::strategies::{
    arb_frame_delta, arb_ledger_updates, arb_resource_type, arb_screen_point, arb_signed_multiplier,
    arb_unit_positions, arb_world_point,
};
use proptest::prelude::*;

fn box_select(positions: &[Vec2Fixed], from: Vec2Fixed, to: Vec2Fixed) -> Vec<u64> {
    let mut world = TestWorld::new();
    for &pos in positions {
        world.soldier(pos);
    }
    let mut controller = world.controller();
    controller.handle_pointer(&PointerFrame::press(from), &mut world.sim);
    controller.handle_pointer(&PointerFrame::hold(to), &mut world.sim);
    controller.handle_pointer(&PointerFrame::release(to), &mut world.sim);

    let mut selected = controller.selected_units();
    selected.sort_unstable();
    selected
}

proptest! {
    #[test]
    fn prop_ledger_balance_is_running_sum(updates in arb_ledger_updates(64)) {
        let mut ledger = ResourceLedger::new();
        let mut expected: BTreeMap<String, i64> = BTreeMap::new();

        for (resource, delta) in &updates {
            ledger.add_resource(resource.name(), *delta);
            *expected.entry(resource.name().to_string()).or_insert(0) += delta;
        }

        prop_assert_eq!(ledger.all_resources(), expected);
    }

    #[test]
    fn prop_failed_spend_leaves_balance(balance in 0_i64..1000, cost in 0_i64..2000) {
        let mut ledger = ResourceLedger::new();
        ledger.add_resource("Gold", balance);

        let result = ledger.try_spend("Gold", cost);

        if cost <= balance {
            prop_assert!(result.is_ok());
            prop_assert_eq!(ledger.get_resource("Gold"), balance - cost);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(ledger.get_resource("Gold"), balance);
        }
    }

    #[test]
    fn prop_harvest_never_exceeds_remaining(
        kind in arb_resource_type(),
        remaining in 0_u32..500,
        requests in prop::collection::vec(0_u32..50, 0..40),
    ) {
        let mut node = ResourceNode::new(kind, remaining);
        let mut taken_total = 0;

        for requested in requests {
            let before = node.remaining;
            let taken = node.harvest(requested);
            prop_assert_eq!(taken, requested.min(before));
            prop_assert_eq!(node.remaining, before - taken);
            taken_total += taken;
        }

        prop_assert_eq!(taken_total + node.remaining, remaining);
        if node.is_depleted() {
            prop_assert_eq!(node.harvest(10), 0);
        }
    }

    #[test]
    fn prop_cargo_stays_within_capacity(
        capacity in 1_u32..50,
        loads in prop::collection::vec((arb_resource_type(), 0_u32..20), 0..30),
    ) {
        let mut cargo = Cargo::new(capacity);

        for (kind, amount) in loads {
            let before = cargo.amount();
            let loaded = cargo.load(kind, amount);
            prop_assert!(cargo.amount() <= capacity);
            prop_assert_eq!(cargo.amount(), before + loaded);
            if loaded > 0 {
                prop_assert_eq!(cargo.kind(), Some(kind));
            }
        }
    }

    #[test]
    fn prop_construction_progress_is_monotonic(
        total in 1_i32..60,
        steps in prop::collection::vec((arb_frame_delta(), prop::option::of(arb_signed_multiplier())), 1..100),
    ) {
        let mut site = Construction::new(fixed(total), "Military");
        let mut last = site.progress();

        for (dt, boost) in steps {
            if let Some(multiplier) = boost {
                site.accelerate(multiplier);
            }
            site.advance(dt);
            let progress = site.progress();
            prop_assert!(progress >= last);
            prop_assert!(progress <= Fixed::ONE);
            last = progress;
        }
    }

    #[test]
    fn prop_box_select_ignores_corner_order(
        positions in arb_unit_positions(12),
        a in arb_screen_point(),
        b in arb_screen_point(),
    ) {
        let threshold = fixed(5);
        prop_assume!(a.distance_squared(b) > threshold * threshold);

        let forward = box_select(&positions, a, b);
        let backward = box_select(&positions, b, a);
        let crossed = box_select(
            &positions,
            Vec2Fixed::new(a.x, b.y),
            Vec2Fixed::new(b.x, a.y),
        );

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(&forward, &crossed);
    }

    #[test]
    fn prop_formation_has_one_slot_per_unit(center in arb_world_point(), count in 0_usize..40) {
        let spacing = fixed(3) / fixed(2);
        let slots = formation_slots(center, count, spacing);

        prop_assert_eq!(slots.len(), count);
        for (i, slot) in slots.iter().enumerate() {
            prop_assert!(!slots[..i].contains(slot));
        }
    }
}
