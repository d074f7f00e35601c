//! Economy and resource management.
//!
//! Collectors harvest [`ResourceNode`]s into their [`Cargo`] and deliver
//! the cargo at [`Depot`] buildings, which credits the [`ResourceLedger`].
//!
//! All quantities are integers; nothing here touches fixed-point math.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::error::{GameError, Result};
use crate::factions::{FactionId, HarvestRights};
use crate::math::Vec2Fixed;

/// Default quantity a freshly placed resource node holds.
pub const DEFAULT_NODE_QUANTITY: u32 = 100;

/// The fixed set of harvestable resource types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// Elemental essences.
    ElementalEssence,
    /// Gold, the currency units and buildings are paid in.
    Gold,
    /// Food.
    Food,
    /// Wood.
    Wood,
    /// Stone.
    Stone,
    /// Mana.
    Mana,
}

impl ResourceType {
    /// Every resource type, in ledger display order.
    pub const ALL: [Self; 6] = [
        Self::ElementalEssence,
        Self::Gold,
        Self::Food,
        Self::Wood,
        Self::Stone,
        Self::Mana,
    ];

    /// Ledger key for this resource.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ElementalEssence => "ElementalEssence",
            Self::Gold => "Gold",
            Self::Food => "Food",
            Self::Wood => "Wood",
            Self::Stone => "Stone",
            Self::Mana => "Mana",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named-counter store for the player's stockpile.
///
/// One ledger is created when the world is built and handed to everything
/// that reads or mutates balances. Writes are visible immediately.
///
/// Balances are not floored: a negative delta larger than the balance leaves
/// it negative. Spend through [`ResourceLedger::try_spend`] to get the
/// affordability check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    balances: BTreeMap<String, i64>,
}

impl ResourceLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a delta (positive or negative) to a balance.
    pub fn add_resource(&mut self, resource: &str, delta: i64) {
        let balance = self.balances.entry(resource.to_string()).or_insert(0);
        *balance = balance.saturating_add(delta);
        tracing::trace!(resource, delta, balance = *balance, "Ledger updated");
    }

    /// Current balance. Unknown keys read as zero.
    #[must_use]
    pub fn get_resource(&self, resource: &str) -> i64 {
        self.balances.get(resource).copied().unwrap_or(0)
    }

    /// Snapshot of every balance ever touched.
    #[must_use]
    pub fn all_resources(&self) -> BTreeMap<String, i64> {
        self.balances.clone()
    }

    /// Check whether a balance covers `amount`.
    #[must_use]
    pub fn can_afford(&self, resource: &str, amount: i64) -> bool {
        self.get_resource(resource) >= amount
    }

    /// Deduct `amount` if the balance covers it, otherwise leave it untouched.
    pub fn try_spend(&mut self, resource: &str, amount: i64) -> Result<()> {
        let available = self.get_resource(resource);
        if available < amount {
            return Err(GameError::InsufficientResources {
                resource: resource.to_string(),
                required: amount,
                available,
            });
        }
        self.add_resource(resource, -amount);
        Ok(())
    }
}

/// A depletable, faction-gated source of one resource type.
///
/// A node at zero stays in the world but yields nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Resource this node yields.
    pub kind: ResourceType,
    /// Quantity left.
    pub remaining: u32,
    /// Who may harvest.
    #[serde(default)]
    pub rights: HarvestRights,
}

impl ResourceNode {
    /// Create a node open to every faction.
    #[must_use]
    pub fn new(kind: ResourceType, remaining: u32) -> Self {
        Self {
            kind,
            remaining,
            rights: HarvestRights::Anyone,
        }
    }

    /// Restrict who may harvest this node.
    #[must_use]
    pub fn with_rights(mut self, rights: HarvestRights) -> Self {
        self.rights = rights;
        self
    }

    /// Check if this node is depleted.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.remaining == 0
    }

    /// Check whether `faction` may harvest here.
    #[must_use]
    pub fn can_harvest(&self, faction: &FactionId) -> bool {
        self.rights.permits(faction)
    }

    /// Take up to `requested` units.
    ///
    /// Returns the amount actually taken; a depleted node returns 0.
    pub fn harvest(&mut self, requested: u32) -> u32 {
        let taken = requested.min(self.remaining);
        self.remaining -= taken;
        taken
    }
}

/// Capacity-bounded load carried by a collector.
///
/// The load is labelled with the type of the last harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    kind: Option<ResourceType>,
    amount: u32,
    capacity: u32,
}

impl Cargo {
    /// Create an empty cargo hold.
    #[must_use]
    pub const fn new(capacity: u32) -> Self {
        Self {
            kind: None,
            amount: 0,
            capacity,
        }
    }

    /// Amount currently carried.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// Maximum load.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Resource type of the current load.
    #[must_use]
    pub const fn kind(&self) -> Option<ResourceType> {
        self.kind
    }

    /// Check if the hold is full.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.amount >= self.capacity
    }

    /// Check if the hold is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Load up to `amount`, returning what fit.
    pub fn load(&mut self, kind: ResourceType, amount: u32) -> u32 {
        let loaded = amount.min(self.capacity.saturating_sub(self.amount));
        if loaded > 0 {
            self.amount += loaded;
            self.kind = Some(kind);
        }
        loaded
    }

    /// Empty the hold, returning what it carried.
    pub fn unload(&mut self) -> Option<(ResourceType, u32)> {
        let kind = self.kind.take()?;
        let amount = std::mem::take(&mut self.amount);
        (amount > 0).then_some((kind, amount))
    }
}

/// Marker component for buildings that accept cargo deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Depot;

/// Events generated by gathering and delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EconomyEvent {
    /// A collector took resources from a node.
    Harvested {
        /// The collector entity.
        collector: EntityId,
        /// The resource node entity.
        node: EntityId,
        /// Amount harvested.
        amount: u32,
    },
    /// A collector delivered its cargo.
    Delivered {
        /// The collector entity.
        collector: EntityId,
        /// The depot entity.
        depot: EntityId,
        /// Resource credited.
        resource: ResourceType,
        /// Amount credited.
        amount: u32,
    },
    /// A resource node has been fully depleted.
    NodeDepleted {
        /// The depleted node entity.
        node: EntityId,
    },
}

/// Find the depot closest to `pos` by straight-line distance.
///
/// Ties go to the first depot in iteration order.
pub fn find_nearest_depot<I>(pos: Vec2Fixed, depots: I) -> Option<EntityId>
where
    I: IntoIterator<Item = (EntityId, Vec2Fixed)>,
{
    depots
        .into_iter()
        .min_by_key(|(_, depot_pos)| pos.distance_squared(*depot_pos).to_bits())
        .map(|(id, _)| id)
}
