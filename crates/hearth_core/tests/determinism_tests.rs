//! Repeated runs of a busy world must end in the same state.

use hearth_core::economy::ResourceType;
use hearth_core::simulation::Simulation;
use hearth_test_utils::determinism::{
    find_first_divergence, run_parallel_simulations, verify_simulation_determinism,
};
use hearth_test_utils::fixtures::{quarter_second, vec2, TestWorld};

fn busy_world() -> Simulation {
    let mut world = TestWorld::new().with_gold(500);
    world.hall(vec2(0.0, 0.0));
    let gold = world.node(ResourceType::Gold, 40, vec2(6.0, 0.0));
    let wood = world.node(ResourceType::Wood, 40, vec2(0.0, 6.0));

    for i in 0..6 {
        let offset = f64::from(i) * 0.25;
        let peasant = world.peasant(vec2(2.0 + offset, 1.0));
        let node = if i % 2 == 0 { gold } else { wood };
        world.sim.order_gather(peasant, node).expect("gather order");
    }

    let soldier = world.soldier(vec2(-4.0, -4.0));
    let enemy = world.enemy_soldier(vec2(-9.0, -4.0));
    world.sim.order_attack(soldier, enemy).expect("attack order");

    world.sim
}

#[test]
fn test_busy_world_is_deterministic() {
    verify_simulation_determinism(busy_world, 200, quarter_second()).assert_deterministic();
}

#[test]
fn test_busy_world_matches_across_threads() {
    let report = run_parallel_simulations(busy_world, 4, 120, quarter_second());
    assert_eq!(report.distinct_hashes().len(), 1);
}

#[test]
fn test_busy_world_never_diverges() {
    assert_eq!(find_first_divergence(busy_world, 120, quarter_second()), None);
}
