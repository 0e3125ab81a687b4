//! Group primitive
//!
//! A rendezvous barrier that batches helpers into generations.
//!
//! ## Lifecycle
//!
//! ```text
//! new(capacity)         spaces_left = capacity, two closed gates, generation 0
//! join  x capacity      spaces_left: capacity -> 0, each joiner gets the ticket
//! await_full            spaces_left == 0: whole state replaced in one commit
//!                       (spaces_left = capacity, two NEW closed gates,
//!                       generation + 1); the OLD ticket goes to the coordinator
//! ```
//!
//! Because rotation swaps the entire [`GroupState`] in a single transaction,
//! no helper ever observes a half-rotated group, a late joiner can never be
//! handed the previous generation's gates, and a helper holding an old ticket
//! can never consume a space in the new generation.
//!
//! ## Purity
//!
//! The `try_*` steps may run several times per call due to conflicts and
//! retries. They only touch cells; logging happens after the transaction
//! resolves.

use crate::gate::{Gate, GateState};
use crate::ticket::HelperTicket;
use rendezvous_concurrency::{Outcome, TVar, Transaction, TransactionEngine};
use rendezvous_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Committed contents of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState {
    capacity: u32,
    spaces_left: u32,
    generation: u64,
    entry_gate: Gate,
    exit_gate: Gate,
}

impl GroupState {
    /// A fresh, empty generation with two new closed gates
    fn fresh(engine: &TransactionEngine, capacity: u32, generation: u64) -> Result<Self> {
        Ok(GroupState {
            capacity,
            spaces_left: capacity,
            generation,
            entry_gate: Gate::new(engine, capacity)?,
            exit_gate: Gate::new(engine, capacity)?,
        })
    }

    /// Helpers per generation
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Spaces still open in the current generation
    pub fn spaces_left(&self) -> u32 {
        self.spaces_left
    }

    /// Number of rotations so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check if the current generation has no spaces left
    pub fn is_full(&self) -> bool {
        self.spaces_left == 0
    }

    /// Ticket of the current generation
    pub fn ticket(&self) -> HelperTicket {
        HelperTicket::new(
            self.generation,
            self.entry_gate.clone(),
            self.exit_gate.clone(),
        )
    }
}

/// Serializable copy of a group and both of its gates
///
/// Cell identities are not part of a snapshot: [`Group::restore`] creates
/// fresh cells holding the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGroupSnapshot")]
pub struct GroupSnapshot {
    capacity: u32,
    spaces_left: u32,
    generation: u64,
    entry_gate: GateState,
    exit_gate: GateState,
}

#[derive(Deserialize)]
struct RawGroupSnapshot {
    capacity: u32,
    spaces_left: u32,
    generation: u64,
    entry_gate: GateState,
    exit_gate: GateState,
}

impl TryFrom<RawGroupSnapshot> for GroupSnapshot {
    type Error = Error;

    fn try_from(raw: RawGroupSnapshot) -> Result<Self> {
        let snapshot = GroupSnapshot {
            capacity: raw.capacity,
            spaces_left: raw.spaces_left,
            generation: raw.generation,
            entry_gate: raw.entry_gate,
            exit_gate: raw.exit_gate,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl GroupSnapshot {
    /// Check the group invariants
    ///
    /// - `capacity >= 1`
    /// - `spaces_left <= capacity`
    /// - both gates have the group's capacity (their own invariants are
    ///   enforced by [`GateState`])
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(0));
        }
        if self.spaces_left > self.capacity {
            return Err(Error::InvalidState(format!(
                "group spaces_left {} exceeds capacity {}",
                self.spaces_left, self.capacity
            )));
        }
        for (name, gate) in [("entry", &self.entry_gate), ("exit", &self.exit_gate)] {
            if gate.capacity() != self.capacity {
                return Err(Error::InvalidState(format!(
                    "{} gate capacity {} differs from group capacity {}",
                    name,
                    gate.capacity(),
                    self.capacity
                )));
            }
        }
        Ok(())
    }

    /// Helpers per generation
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Spaces still open in the captured generation
    pub fn spaces_left(&self) -> u32 {
        self.spaces_left
    }

    /// Generation captured
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Entry gate contents
    pub fn entry_gate(&self) -> GateState {
        self.entry_gate
    }

    /// Exit gate contents
    pub fn exit_gate(&self) -> GateState {
        self.exit_gate
    }

    /// Encode as MessagePack
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode from MessagePack, validating every invariant
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Handle to a group cell
#[derive(Debug, Clone)]
pub struct Group {
    engine: TransactionEngine,
    cell: TVar<GroupState>,
}

impl Group {
    /// Create an empty group: `spaces_left = capacity`, two closed gates
    ///
    /// # Errors
    ///
    /// `Error::InvalidCapacity` if `capacity` is zero.
    pub fn new(engine: &TransactionEngine, capacity: u32) -> Result<Self> {
        let state = GroupState::fresh(engine, capacity, 0)?;
        Ok(Group {
            engine: engine.clone(),
            cell: TVar::new(engine, state),
        })
    }

    /// Rebuild a group from a snapshot, with brand-new cells
    pub fn restore(engine: &TransactionEngine, snapshot: GroupSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let state = GroupState {
            capacity: snapshot.capacity,
            spaces_left: snapshot.spaces_left,
            generation: snapshot.generation,
            entry_gate: Gate::from_state(engine, snapshot.entry_gate),
            exit_gate: Gate::from_state(engine, snapshot.exit_gate),
        };
        Ok(Group {
            engine: engine.clone(),
            cell: TVar::new(engine, state),
        })
    }

    /// Engine this group belongs to
    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }

    /// Underlying transactional cell
    pub fn cell(&self) -> &TVar<GroupState> {
        &self.cell
    }

    /// Transaction step for [`join`](Self::join)
    pub fn try_join(&self, tx: &mut Transaction<'_>) -> Outcome<HelperTicket> {
        let state = tx.read(&self.cell);
        if state.spaces_left == 0 {
            return Outcome::Retry;
        }
        let ticket = state.ticket();
        tx.write(
            &self.cell,
            GroupState {
                spaces_left: state.spaces_left - 1,
                ..state
            },
        );
        Outcome::Commit(ticket)
    }

    /// Take a space in the current generation
    ///
    /// Blocks while the current generation is full; the caller then joins
    /// whichever generation replaces it, never the full one.
    pub fn join(&self) -> Result<HelperTicket> {
        let ticket = self.engine.atomically(|tx| self.try_join(tx))?;
        debug!(generation = ticket.generation(), "joined group");
        Ok(ticket)
    }

    /// Transaction step for [`await_full`](Self::await_full)
    pub fn try_await_full(&self, tx: &mut Transaction<'_>) -> Outcome<HelperTicket> {
        let state = tx.read(&self.cell);
        if state.spaces_left > 0 {
            return Outcome::Retry;
        }
        let fresh = match GroupState::fresh(&self.engine, state.capacity, state.generation + 1) {
            Ok(fresh) => fresh,
            Err(e) => return Outcome::Abort(e),
        };
        tx.write(&self.cell, fresh);
        Outcome::Commit(state.ticket())
    }

    /// Wait for the group to fill, then rotate it. Coordinator only.
    ///
    /// Returns the ticket of the generation that just filled.
    pub fn await_full(&self) -> Result<HelperTicket> {
        let ticket = self.engine.atomically(|tx| self.try_await_full(tx))?;
        debug!(generation = ticket.generation(), "group full, rotated");
        Ok(ticket)
    }

    /// Check whether the generation `generation` has filled
    ///
    /// True if the group is currently full at that generation, or has
    /// already been rotated past it.
    pub fn is_ready_after(&self, generation: u64) -> bool {
        self.engine.read_only(|tx| {
            let state = tx.read(&self.cell);
            state.generation > generation || state.spaces_left == 0
        })
    }

    /// Current committed state
    pub fn state(&self) -> GroupState {
        self.cell.load(&self.engine)
    }

    /// Capture the group and both gates in one consistent read
    pub fn snapshot(&self) -> GroupSnapshot {
        self.engine.read_only(|tx| {
            let state = tx.read(&self.cell);
            GroupSnapshot {
                capacity: state.capacity,
                spaces_left: state.spaces_left,
                generation: state.generation,
                entry_gate: tx.read(state.entry_gate.cell()),
                exit_gate: tx.read(state.exit_gate.cell()),
            }
        })
    }
}
