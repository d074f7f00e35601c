//! Headless runner for scripted play and CI verification.
//!
//! This crate drives the gameplay core without a renderer, either from a
//! RON scenario file or from JSON commands on stdin. This enables:
//!
//! - **Scenario runs**: scripted economies and skirmishes with a summary report
//! - **External control**: another process plays through the JSON protocol
//! - **Determinism checks**: state hashes can be compared across runs
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, spawn, gather, etc.)
//! - **stdout**: Events and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See the [`protocol`] module for every command and response.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p hearth_headless -- play
//!
//! # Run a scenario
//! cargo run -p hearth_headless -- run crates/hearth_headless/scenarios/economy.ron
//!
//! # Check a catalog
//! cargo run -p hearth_headless -- validate crates/hearth_headless/scenarios/catalog.ron
//! ```

pub mod protocol;
pub mod runner;
pub mod scenario;

pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner, RunnerError, ScenarioReport};
pub use scenario::{load_catalog, Scenario, ScenarioError};
