//! Proptest strategies for gameplay inputs.
//!
//! Fixed-point values are built from exact binary fractions so tests can
//! compare results without tolerances.

use hearth_core::economy::ResourceType;
use hearth_core::math::{Fixed, Vec2Fixed};
use proptest::prelude::*;

/// Any resource type.
pub fn arb_resource_type() -> impl Strategy<Value = ResourceType> {
    prop::sample::select(ResourceType::ALL.to_vec())
}

/// A sequence of `(resource, delta)` ledger updates.
pub fn arb_ledger_updates(max_len: usize) -> impl Strategy<Value = Vec<(ResourceType, i64)>> {
    prop::collection::vec((arb_resource_type(), -10_000_i64..10_000), 0..max_len)
}

/// A frame delta between 1/64 s and 1/2 s, in 1/64 s steps.
pub fn arb_frame_delta() -> impl Strategy<Value = Fixed> {
    (1_i64..=32).prop_map(|n| Fixed::from_bits(n << 26))
}

/// Any multiplier between -16 and 16 in quarter steps, zero included.
pub fn arb_signed_multiplier() -> impl Strategy<Value = Fixed> {
    (-64_i64..=64).prop_map(|n| Fixed::from_bits(n << 30))
}

/// A whole-pixel point inside a 1920x1080 window.
pub fn arb_screen_point() -> impl Strategy<Value = Vec2Fixed> {
    (0_i32..1920, 0_i32..1080).prop_map(|(x, y)| Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)))
}

/// A whole-unit point on a 100x100 field.
pub fn arb_world_point() -> impl Strategy<Value = Vec2Fixed> {
    (0_i32..100, 0_i32..100).prop_map(|(x, y)| Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)))
}

/// Up to `max_len` unit positions on the field.
pub fn arb_unit_positions(max_len: usize) -> impl Strategy<Value = Vec<Vec2Fixed>> {
    prop::collection::vec(arb_world_point(), 1..max_len)
}
