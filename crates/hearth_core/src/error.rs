//! Error types for the gameplay core.
//!
//! Every variant is contained at the point of detection: the controllers
//! driven by player input log the error and carry on, so nothing here is
//! ever fatal to the simulation.

use thiserror::Error;

use crate::components::EntityId;
use crate::factions::FactionId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all gameplay errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A required collaborator (camera, viewport, catalog) is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A catalog index is outside the declared bounds.
    #[error("Invalid {what} index {index} (have {len})")]
    InvalidIndex {
        /// What was being indexed ("unit", "building").
        what: &'static str,
        /// Requested index.
        index: usize,
        /// Number of entries available.
        len: usize,
    },

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource ledger key.
        resource: String,
        /// Amount required.
        required: i64,
        /// Amount available.
        available: i64,
    },

    /// A production building already has a job in flight.
    #[error("Entity {0} is already training a unit")]
    TrainingInProgress(EntityId),

    /// The entity exists but cannot train units.
    #[error("Entity {0} is not a production building")]
    NotProductionBuilding(EntityId),

    /// Faction is not permitted to harvest a node.
    #[error("Faction '{faction}' may not harvest node {node}")]
    HarvestDenied {
        /// The resource node.
        node: EntityId,
        /// The faction that was refused.
        faction: FactionId,
    },

    /// An entity lacks a component the operation depends on.
    #[error("Entity {entity} has no {component} component")]
    MissingComponent {
        /// The entity that was inspected.
        entity: EntityId,
        /// Name of the missing component.
        component: &'static str,
    },

    /// A catalog entry is inconsistent or carries an impossible value.
    #[error("Invalid catalog entry '{entry}': {problem}")]
    InvalidCatalog {
        /// Name of the unit or building.
        entry: String,
        /// What is wrong with it.
        problem: String,
    },

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),
}
