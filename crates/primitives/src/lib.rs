//! Rendezvous primitives built on the transactional engine
//!
//! - [`Gate`]: capacity-limited turnstile opened by the coordinator
//! - [`Group`]: barrier that batches helpers into generations and rotates
//!   atomically once full
//! - [`HelperTicket`]: the gate pair of one generation
//!
//! Every mutable value lives in a [`TVar`](rendezvous_concurrency::TVar);
//! each operation is a single transaction, available both as a blocking call
//! (`pass`, `join`, ...) and as a composable `try_*` step.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gate;
pub mod group;
pub mod ticket;

pub use gate::{Gate, GateState};
pub use group::{Group, GroupSnapshot, GroupState};
pub use ticket::HelperTicket;
