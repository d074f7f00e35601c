//! Faction identifiers and harvest permissions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ownership/alignment tag carried by units, buildings and players.
///
/// Factions are data-driven, so the identifier is a plain name rather than
/// a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(pub String);

impl FactionId {
    /// Create a faction identifier from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The faction name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactionId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Which factions may harvest a resource node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HarvestRights {
    /// Wildcard: every faction may harvest.
    #[default]
    Anyone,
    /// Only the listed factions may harvest.
    Only(BTreeSet<FactionId>),
}

impl HarvestRights {
    /// Restrict harvesting to the given factions.
    #[must_use]
    pub fn only<I, F>(factions: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FactionId>,
    {
        Self::Only(factions.into_iter().map(Into::into).collect())
    }

    /// Check whether a faction is permitted to harvest.
    #[must_use]
    pub fn permits(&self, faction: &FactionId) -> bool {
        match self {
            Self::Anyone => true,
            Self::Only(allowed) => allowed.contains(faction),
        }
    }
}
