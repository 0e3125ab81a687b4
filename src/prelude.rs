//! Convenient imports for Rendezvous.
//!
//! ```no_run
//! use rendezvous::prelude::*;
//!
//! let engine = TransactionEngine::new();
//! let gate = Gate::new(&engine, 2)?;
//! # Ok::<(), rendezvous::Error>(())
//! ```

// Engine
pub use rendezvous_concurrency::{
    EngineStats, ForkHandle, Outcome, ReadySignal, TVar, Transaction, TransactionEngine,
};

// Error handling
pub use rendezvous_core::{Error, Result};

// Primitives
pub use rendezvous_primitives::{Gate, GateState, Group, GroupSnapshot, GroupState, HelperTicket};

// Protocols
pub use rendezvous_engine::{
    task, Coordinator, Escort, Helper, Pool, PoolConfig, Simulation, SimulationConfig,
};

// Core types
pub use rendezvous_core::{HelperId, Version};
