//! Software transactional memory for rendezvous
//!
//! This crate implements a blocking STM with:
//! - [`TVar`]: versioned transactional cells
//! - [`Transaction`]: per-attempt read/write set tracking
//! - [`TransactionEngine`]: atomic commit, conflict re-execution, and
//!   retry-until-changed suspension
//! - [`ForkHandle`]: transactions run on their own thread with a typed handoff
//!
//! Bodies return an explicit [`Outcome`]: `Commit`, `Retry` or `Abort`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod engine;
pub mod fork;
pub mod transaction;
mod waiter;

pub use cell::TVar;
pub use engine::{EngineStats, TransactionEngine};
pub use fork::{ForkHandle, ReadySignal};
pub use transaction::{Outcome, Transaction};
