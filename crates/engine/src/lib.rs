//! Helper and coordinator protocols
//!
//! - [`Helper`]: one actor looping JOIN, PASS-ENTRY, TASK, PASS-EXIT
//! - [`Coordinator`]: selects the highest-priority ready group and escorts it
//! - [`SimulationConfig`]: TOML-backed pool and timing settings
//! - [`Simulation`]: wires the above onto one engine and runs it

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod helper;
pub mod simulation;

pub use config::{PoolConfig, SimulationConfig};
pub use coordinator::{Coordinator, Escort, Pool};
pub use helper::{task, Helper, TaskAction, TaskError};
pub use simulation::{EscortRecord, Simulation, SimulationReport};
