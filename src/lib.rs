//! # Rendezvous
//!
//! Software transactional memory and the rendezvous primitives built on it,
//! with the Santa Claus batching problem as the worked example.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rendezvous::prelude::*;
//!
//! let engine = TransactionEngine::new();
//! let elves = Group::new(&engine, 3)?;
//!
//! // Three helper threads call `elves.join()`; the coordinator rotates the
//! // full group and lets the generation through its gates.
//! let ticket = elves.await_full()?;
//! ticket.entry_gate().operate()?;
//! ticket.entry_gate().await_drained()?;
//! ticket.exit_gate().operate()?;
//! # Ok::<(), rendezvous::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`concurrency`]: the engine. [`TVar`] cells, [`Transaction`]s that
//!   commit atomically or suspend on [`Outcome::Retry`], forked transactions.
//! - [`primitives`]: [`Gate`] and [`Group`], each a single transactional cell.
//! - [`engine`]: the [`Helper`] and [`Coordinator`] protocols, configuration
//!   and the runnable [`Simulation`].
//!
//! Shared ids and the [`Error`] type come from `rendezvous-core`.

#![warn(missing_docs)]

pub mod prelude;

pub use rendezvous_concurrency as concurrency;
pub use rendezvous_engine as engine;
pub use rendezvous_primitives as primitives;

// Re-export main entry points
pub use rendezvous_concurrency::{Outcome, TVar, Transaction, TransactionEngine};
pub use rendezvous_core::{Error, HelperId, Result, Version};
pub use rendezvous_engine::{
    Coordinator, Helper, Pool, Simulation, SimulationConfig, SimulationReport,
};
pub use rendezvous_primitives::{Gate, Group, HelperTicket};
