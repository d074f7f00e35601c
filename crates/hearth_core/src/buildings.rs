//! Building construction progress and production roles.
//!
//! A placed building starts [`ConstructionState::UnderConstruction`] and
//! builds itself at rate 1. Collectors that arrive to help multiply the
//! rate. Completion happens exactly once; afterwards the building gains the
//! [`ProductionRole`] named by its type tag.
//!
//! All calculations use fixed-point math for deterministic simulation.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::{fixed_serde, Fixed};

// ============================================================================
// Production Roles
// ============================================================================

/// What a completed building can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProductionRole {
    /// Trains units.
    Military,
    /// Resource processing.
    Resource,
    /// Research.
    Science,
    /// Static defense.
    Defense,
    /// No role.
    #[default]
    Plain,
}

impl ProductionRole {
    /// Map a building type tag onto a role, ignoring case.
    ///
    /// Unrecognized tags give [`ProductionRole::Plain`].
    #[must_use]
    pub fn from_type_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "military" => Self::Military,
            "resource" => Self::Resource,
            "science" => Self::Science,
            "defense" => Self::Defense,
            _ => Self::Plain,
        }
    }

    /// Whether buildings with this role train units.
    #[must_use]
    pub const fn trains_units(self) -> bool {
        matches!(self, Self::Military)
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Lifecycle of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionState {
    /// Still being built.
    UnderConstruction {
        /// Rate-weighted seconds of work done so far.
        #[serde(with = "fixed_serde")]
        elapsed: Fixed,
        /// Current rate multiplier.
        #[serde(with = "fixed_serde")]
        rate: Fixed,
    },
    /// Finished. Terminal.
    Completed,
}

/// Outcome of advancing construction by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionTick {
    /// Still under construction at the given progress.
    Progressed(Fixed),
    /// Finished on this tick.
    Completed,
    /// Was already finished; nothing happened.
    AlreadyComplete,
}

/// Construction progress component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Construction {
    state: ConstructionState,
    /// Seconds of work needed at rate 1.
    #[serde(with = "fixed_serde")]
    total_time: Fixed,
    /// Declared building type, resolved to a role on completion.
    type_tag: String,
}

impl Construction {
    /// Start a fresh construction site at rate 1.
    #[must_use]
    pub fn new(total_time: Fixed, type_tag: impl Into<String>) -> Self {
        Self {
            state: ConstructionState::UnderConstruction {
                elapsed: Fixed::ZERO,
                rate: Fixed::ONE,
            },
            total_time: total_time.max(Fixed::ZERO),
            type_tag: type_tag.into(),
        }
    }

    /// A building that starts out finished.
    #[must_use]
    pub fn completed(type_tag: impl Into<String>) -> Self {
        Self {
            state: ConstructionState::Completed,
            total_time: Fixed::ZERO,
            type_tag: type_tag.into(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConstructionState {
        self.state
    }

    /// Declared type tag.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Check whether construction has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.state, ConstructionState::Completed)
    }

    /// Current rate multiplier, or `None` once complete.
    #[must_use]
    pub const fn rate(&self) -> Option<Fixed> {
        match self.state {
            ConstructionState::UnderConstruction { rate, .. } => Some(rate),
            ConstructionState::Completed => None,
        }
    }

    /// Progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        match self.state {
            ConstructionState::Completed => Fixed::ONE,
            ConstructionState::UnderConstruction { elapsed, .. } => {
                if self.total_time == Fixed::ZERO {
                    return Fixed::ZERO;
                }
                (elapsed / self.total_time).min(Fixed::ONE)
            }
        }
    }

    /// Seconds left at the current rate. Zero once complete.
    #[must_use]
    pub fn remaining_time(&self) -> Fixed {
        match self.state {
            ConstructionState::Completed => Fixed::ZERO,
            ConstructionState::UnderConstruction { elapsed, rate } => {
                let left = (self.total_time - elapsed).max(Fixed::ZERO);
                left.checked_div(rate).unwrap_or(Fixed::MAX)
            }
        }
    }

    /// Multiply the build rate. Multipliers stack and are never removed.
    ///
    /// Has no effect once the building is complete. Multipliers `<= 0` are
    /// ignored so progress can never stall or run backwards.
    pub fn accelerate(&mut self, multiplier: Fixed) {
        if multiplier <= Fixed::ZERO {
            tracing::warn!(%multiplier, "Ignoring non-positive construction multiplier");
            return;
        }
        if let ConstructionState::UnderConstruction { rate, .. } = &mut self.state {
            *rate = rate.saturating_mul(multiplier);
        }
    }

    /// Advance by `dt` seconds of wall time.
    pub fn advance(&mut self, dt: Fixed) -> ConstructionTick {
        let ConstructionState::UnderConstruction { elapsed, rate } = &mut self.state else {
            return ConstructionTick::AlreadyComplete;
        };

        *elapsed = elapsed.saturating_add(dt.saturating_mul(*rate));
        if *elapsed >= self.total_time {
            self.state = ConstructionState::Completed;
            return ConstructionTick::Completed;
        }

        ConstructionTick::Progressed(self.progress())
    }
}

/// Events generated by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionEvent {
    /// A construction site was placed and paid for.
    Placed {
        /// The new site.
        building: EntityId,
        /// Gold deducted.
        cost: i64,
    },
    /// A building finished construction.
    Completed {
        /// The finished building.
        building: EntityId,
        /// Role it gained.
        role: ProductionRole,
    },
    /// A collector started helping on a site.
    Accelerated {
        /// The building site.
        building: EntityId,
        /// The helping collector.
        worker: EntityId,
        /// Rate after the multiplier was applied.
        #[serde(with = "fixed_serde")]
        rate: Fixed,
    },
}
