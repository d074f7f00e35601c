//! JSON protocol for driving the simulation from another process.
//!
//! The runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses and per-tick events
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. The controller sends commands as JSON lines
//! 3. Every `tick` command answers with one `events` line per tick
//! 4. `pointer` commands drive the selection controller in screen pixels
//!    and answer with the UI events they caused
//! 5. `quit` answers `bye` and ends the session
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"spawn_unit","kind":"Peasant","x":2.0,"y":0.0}
//! <- {"type":"spawned","entity_id":1,"kind":"Peasant"}
//! -> {"cmd":"gather","unit":1,"node":2}
//! <- {"type":"ack","cmd":"gather"}
//! -> {"cmd":"tick","count":20}
//! <- {"type":"events","tick":1,"events":{...}}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":20,"entities":[...],"stockpile":{"Gold":5},"hash":...}
//! ```

use std::collections::BTreeMap;

use hearth_core::economy::{ResourceType, DEFAULT_NODE_QUANTITY};
use hearth_core::selection::UiEvent;
use hearth_core::simulation::TickEvents;
use serde::{Deserialize, Serialize};

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Report the full state without advancing time.
    Query,

    /// Report the state hash (for determinism checks).
    Hash,

    /// Spawn a unit from the catalog.
    SpawnUnit {
        kind: String,
        x: f64,
        y: f64,
        #[serde(default)]
        faction: Option<String>,
    },

    /// Spawn a building from the catalog.
    SpawnBuilding {
        kind: String,
        x: f64,
        y: f64,
        #[serde(default)]
        faction: Option<String>,
        #[serde(default = "default_completed")]
        completed: bool,
    },

    /// Spawn a resource node open to every faction.
    SpawnNode {
        resource: ResourceType,
        #[serde(default = "default_node_amount")]
        amount: u32,
        x: f64,
        y: f64,
    },

    /// Send a collector to a node.
    Gather { unit: u64, node: u64 },

    /// Send a collector to help on a construction site.
    Build { unit: u64, site: u64 },

    /// Attack a target.
    Attack { unit: u64, target: u64 },

    /// Walk to a point.
    Move { unit: u64, x: f64, y: f64 },

    /// Drop every order.
    Stop { unit: u64 },

    /// Signal the end of the attack animation.
    EndAttack { unit: u64 },

    /// Queue a roster entry at a production building.
    Train { building: u64, index: usize },

    /// Pay for and place a construction site.
    Place {
        index: usize,
        x: f64,
        y: f64,
        #[serde(default)]
        worker: Option<u64>,
    },

    /// Add (or, with a negative amount, remove) resources.
    AddResource { resource: String, amount: i64 },

    /// Remove an entity from the world.
    Kill { entity_id: u64 },

    /// Feed one frame of pointer input to the selection controller.
    Pointer {
        x: f64,
        y: f64,
        #[serde(default)]
        action: PointerAction,
        /// Extend-selection modifier held.
        #[serde(default)]
        extend: bool,
    },

    /// Report the selected units and focused building.
    Selection,

    /// Train roster entry `index` at the focused building.
    TrainFocused { index: usize },

    /// Start placing catalog building `index` from the construction surface.
    BeginPlacement { index: usize },

    /// Leave placement mode.
    CancelPlacement,

    /// Replace the world with a scenario file.
    LoadScenario { path: String },

    /// End the session.
    Quit,
}

/// Button activity in a pointer frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerAction {
    /// Cursor movement only.
    #[default]
    Hover,
    /// Primary button went down.
    Press,
    /// Primary button held.
    Hold,
    /// Primary button went up.
    Release,
    /// Secondary button went down.
    Secondary,
}

fn default_tick_count() -> u32 {
    1
}

fn default_completed() -> bool {
    true
}

fn default_node_amount() -> u32 {
    DEFAULT_NODE_QUANTITY
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// An entity was spawned or placed.
    Spawned { entity_id: u64, kind: String },

    /// Everything one tick produced.
    Events { tick: u64, events: TickEvents },

    /// UI notifications from the selection controller.
    Ui { events: Vec<UiEvent> },

    /// Current selection.
    Selection {
        units: Vec<u64>,
        focused: Option<u64>,
    },

    /// Current world state.
    State {
        tick: u64,
        entities: Vec<EntityState>,
        stockpile: BTreeMap<String, i64>,
        hash: u64,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// State of a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: u64,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthState>,
    /// Collector command state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cargo: Option<u32>,
    /// Attack target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
    /// Resources left in a node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    /// Construction progress in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

/// Health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub current: u32,
    pub max: u32,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::SpawnUnit { .. } => "spawn_unit",
            Self::SpawnBuilding { .. } => "spawn_building",
            Self::SpawnNode { .. } => "spawn_node",
            Self::Gather { .. } => "gather",
            Self::Build { .. } => "build",
            Self::Attack { .. } => "attack",
            Self::Move { .. } => "move",
            Self::Stop { .. } => "stop",
            Self::EndAttack { .. } => "end_attack",
            Self::Train { .. } => "train",
            Self::Place { .. } => "place",
            Self::AddResource { .. } => "add_resource",
            Self::Kill { .. } => "kill",
            Self::Pointer { .. } => "pointer",
            Self::Selection => "selection",
            Self::TrainFocused { .. } => "train_focused",
            Self::BeginPlacement { .. } => "begin_placement",
            Self::CancelPlacement => "cancel_placement",
            Self::LoadScenario { .. } => "load_scenario",
            Self::Quit => "quit",
        }
    }
}
