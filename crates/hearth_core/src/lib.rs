//! # Hearth Core
//!
//! Gameplay core for Hearthfall, a real-time strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No floating-point math (uses fixed-point)
//!
//! The engine drives it with a frame delta and consumes the events it
//! returns: animation cues, construction tints, selection indicators and
//! panel visibility are all requests for the engine to act on.
//!
//! ## Crate Structure
//!
//! - [`economy`] - Resource ledger, nodes, cargo, depots
//! - [`movement`] - Target seeking and local separation
//! - [`collector`] - Gather/deliver/build state machine
//! - [`combat`] - Target pursuit and attack cycles
//! - [`buildings`] - Construction progress and production roles
//! - [`production`] - Unit training
//! - [`selection`] - Pointer selection and command dispatch
//! - [`viewport`] - Screen/world projection seam
//! - [`simulation`] - Entity storage and the tick driver
//! - [`data`] - Unit and building catalog
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod buildings;
pub mod collector;
pub mod combat;
pub mod components;
pub mod data;
pub mod economy;
pub mod error;
pub mod factions;
pub mod math;
pub mod movement;
pub mod production;
pub mod selection;
pub mod simulation;
pub mod viewport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{Construction, ConstructionEvent, ProductionRole};
    pub use crate::collector::{Collector, CollectorState};
    pub use crate::combat::{Attacker, CombatEvent};
    pub use crate::components::*;
    pub use crate::data::{BuildingData, Catalog, UnitData};
    pub use crate::economy::{Cargo, Depot, EconomyEvent, ResourceLedger, ResourceNode, ResourceType};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{FactionId, HarvestRights};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::Mover;
    pub use crate::production::{ProductionEvent, TrainingQueue};
    pub use crate::selection::{PointerFrame, SelectionController, SelectionSettings, UiEvent};
    pub use crate::simulation::{EntitySpawnParams, Simulation, TickEvents};
    pub use crate::viewport::{TopDownViewport, Viewport};
}
