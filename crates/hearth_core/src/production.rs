//! Unit training at production buildings.
//!
//! A production building holds at most one in-flight job. Requests while a
//! job is running are rejected rather than queued. The cost is paid up
//! front when the job starts.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::economy::{ResourceLedger, ResourceType};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Resource that training costs are paid in.
pub const TRAINING_CURRENCY: ResourceType = ResourceType::Gold;

/// One entry of a building's training menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingOption {
    /// Unit template name in the catalog.
    pub unit: String,
    /// Gold cost.
    pub cost: i64,
    /// Seconds to train.
    #[serde(with = "fixed_serde")]
    pub time: Fixed,
}

/// The job currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJob {
    /// Index into the building's roster.
    pub index: usize,
    /// Seconds trained so far.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Seconds required.
    #[serde(with = "fixed_serde")]
    pub required: Fixed,
    /// Cost already deducted.
    pub paid: i64,
}

/// Training queue for a production building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingQueue {
    roster: Vec<TrainingOption>,
    job: Option<TrainingJob>,
    /// Where trained units appear, relative to the building.
    spawn_offset: Vec2Fixed,
}

impl TrainingQueue {
    /// Create an idle queue.
    #[must_use]
    pub fn new(roster: Vec<TrainingOption>, spawn_offset: Vec2Fixed) -> Self {
        Self {
            roster,
            job: None,
            spawn_offset,
        }
    }

    /// Units this building can train.
    #[must_use]
    pub fn roster(&self) -> &[TrainingOption] {
        &self.roster
    }

    /// Spawn point relative to the building.
    #[must_use]
    pub const fn spawn_offset(&self) -> Vec2Fixed {
        self.spawn_offset
    }

    /// The in-flight job, if any.
    #[must_use]
    pub const fn current_job(&self) -> Option<&TrainingJob> {
        self.job.as_ref()
    }

    /// Check whether a job is running.
    #[must_use]
    pub const fn is_training(&self) -> bool {
        self.job.is_some()
    }

    /// Name of the unit being trained.
    #[must_use]
    pub fn training_unit(&self) -> Option<&str> {
        let job = self.job.as_ref()?;
        self.roster.get(job.index).map(|option| option.unit.as_str())
    }

    /// Progress of the running job in `[0, 1]`, or zero when idle.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        match &self.job {
            Some(job) if job.required > Fixed::ZERO => (job.elapsed / job.required).min(Fixed::ONE),
            Some(_) => Fixed::ONE,
            None => Fixed::ZERO,
        }
    }

    /// Start training roster entry `index`, paying for it from `ledger`.
    ///
    /// Rejected without side effects when a job is already running, when the
    /// index is out of bounds, or when the ledger cannot cover the cost.
    pub fn train(
        &mut self,
        building: EntityId,
        index: usize,
        ledger: &mut ResourceLedger,
    ) -> Result<&TrainingOption> {
        if self.job.is_some() {
            return Err(GameError::TrainingInProgress(building));
        }

        let option = self.roster.get(index).ok_or(GameError::InvalidIndex {
            what: "unit",
            index,
            len: self.roster.len(),
        })?;

        ledger.try_spend(TRAINING_CURRENCY.name(), option.cost)?;

        self.job = Some(TrainingJob {
            index,
            elapsed: Fixed::ZERO,
            required: option.time,
            paid: option.cost,
        });
        Ok(option)
    }

    /// Advance the running job. Returns the roster index when it finishes.
    pub fn advance(&mut self, dt: Fixed) -> Option<usize> {
        let job = self.job.as_mut()?;
        job.elapsed = job.elapsed.saturating_add(dt);
        if job.elapsed < job.required {
            return None;
        }
        let finished = job.index;
        self.job = None;
        Some(finished)
    }
}

/// Events generated by training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionEvent {
    /// Training has started and the cost was paid.
    TrainingStarted {
        /// The building training the unit.
        building: EntityId,
        /// Unit template name.
        unit: String,
        /// Gold deducted.
        cost: i64,
    },
    /// A unit finished training and was spawned.
    UnitTrained {
        /// The building that trained the unit.
        building: EntityId,
        /// Unit template name.
        unit: String,
        /// The new unit.
        entity: EntityId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<TrainingOption> {
        vec![
            TrainingOption {
                unit: "Soldier".into(),
                cost: 50,
                time: Fixed::ONE,
            },
            TrainingOption {
                unit: "Archer".into(),
                cost: 80,
                time: Fixed::from_num(2),
            },
        ]
    }

    fn rich_ledger() -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        ledger.add_resource("Gold", 100);
        ledger
    }

    #[test]
    fn test_train_deducts_and_runs() {
        let mut queue = TrainingQueue::new(roster(), Vec2Fixed::ZERO);
        let mut ledger = rich_ledger();

        let option = queue.train(7, 0, &mut ledger).expect("affordable");
        assert_eq!(option.unit, "Soldier");
        assert_eq!(ledger.get_resource("Gold"), 50);
        assert!(queue.is_training());
        assert_eq!(queue.training_unit(), Some("Soldier"));

        let half = Fixed::from_num(0.5);
        assert_eq!(queue.advance(half), None);
        assert_eq!(queue.progress(), half);
        assert_eq!(queue.advance(half), Some(0));
        assert!(!queue.is_training());
        assert_eq!(queue.progress(), Fixed::ZERO);
    }

    #[test]
    fn test_second_request_rejected_while_in_flight() {
        let mut queue = TrainingQueue::new(roster(), Vec2Fixed::ZERO);
        let mut ledger = rich_ledger();
        queue.train(7, 0, &mut ledger).expect("affordable");

        let err = queue.train(7, 0, &mut ledger).unwrap_err();
        assert_eq!(err, GameError::TrainingInProgress(7));
        assert_eq!(ledger.get_resource("Gold"), 50);
    }

    #[test]
    fn test_invalid_index_rejected() {
        let mut queue = TrainingQueue::new(roster(), Vec2Fixed::ZERO);
        let mut ledger = rich_ledger();

        let err = queue.train(7, 5, &mut ledger).unwrap_err();
        assert_eq!(
            err,
            GameError::InvalidIndex {
                what: "unit",
                index: 5,
                len: 2
            }
        );
        assert!(!queue.is_training());
        assert_eq!(ledger.get_resource("Gold"), 100);
    }

    #[test]
    fn test_insufficient_gold_rejected() {
        let mut queue = TrainingQueue::new(roster(), Vec2Fixed::ZERO);
        let mut ledger = ResourceLedger::new();
        ledger.add_resource("Gold", 60);

        let err = queue.train(7, 1, &mut ledger).unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { required: 80, available: 60, .. }));
        assert!(!queue.is_training());
        assert_eq!(ledger.get_resource("Gold"), 60);
    }
}
