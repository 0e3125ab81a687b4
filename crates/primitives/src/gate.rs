//! Gate primitive
//!
//! A capacity-limited turnstile. A gate is created closed (`remaining = 0`);
//! helpers [`pass`](Gate::pass) through it one at a time, each decrementing
//! `remaining`, and block while it is zero. Only the coordinator
//! [`operate`](Gate::operate)s a gate, which resets `remaining` to
//! `capacity` and lets exactly `capacity` helpers through.
//!
//! ## Invariant
//!
//! `0 <= remaining <= capacity` for every reachable [`GateState`]. The only
//! transition that increases `remaining` is `operate`.

use rendezvous_concurrency::{Outcome, TVar, Transaction, TransactionEngine};
use rendezvous_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Committed contents of a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGateState")]
pub struct GateState {
    capacity: u32,
    remaining: u32,
}

/// Unvalidated wire shape of [`GateState`]
#[derive(Deserialize)]
struct RawGateState {
    capacity: u32,
    remaining: u32,
}

impl TryFrom<RawGateState> for GateState {
    type Error = Error;

    fn try_from(raw: RawGateState) -> Result<Self> {
        GateState::new(raw.capacity, raw.remaining)
    }
}

impl GateState {
    /// Build a gate state, checking `1 <= capacity` and `remaining <= capacity`
    pub fn new(capacity: u32, remaining: u32) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(0));
        }
        if remaining > capacity {
            return Err(Error::InvalidState(format!(
                "gate remaining {} exceeds capacity {}",
                remaining, capacity
            )));
        }
        Ok(GateState {
            capacity,
            remaining,
        })
    }

    /// A closed gate of the given capacity
    pub fn closed(capacity: u32) -> Result<Self> {
        GateState::new(capacity, 0)
    }

    /// Maximum number of helpers let through per opening
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Helpers still allowed through before the gate closes again
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Check if at least one helper may pass
    pub fn is_open(&self) -> bool {
        self.remaining > 0
    }

    /// State after one helper passes, or `None` if the gate is closed
    pub fn passed(self) -> Option<Self> {
        self.remaining.checked_sub(1).map(|remaining| GateState {
            remaining,
            ..self
        })
    }

    /// State after the coordinator opens the gate
    pub fn opened(self) -> Self {
        GateState {
            remaining: self.capacity,
            ..self
        }
    }
}

/// Handle to a gate cell
///
/// Cloning shares the same gate. Two handles compare equal exactly when
/// they refer to the same gate, so a gate from a rotated-away generation
/// never equals its replacement.
#[derive(Debug, Clone)]
pub struct Gate {
    engine: TransactionEngine,
    cell: TVar<GateState>,
}

impl PartialEq for Gate {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl Eq for Gate {}

impl Gate {
    /// Create a closed gate owned by `engine`
    ///
    /// # Errors
    ///
    /// `Error::InvalidCapacity` if `capacity` is zero.
    pub fn new(engine: &TransactionEngine, capacity: u32) -> Result<Self> {
        Ok(Self::from_state(engine, GateState::closed(capacity)?))
    }

    /// Create a gate holding an already validated state
    pub fn from_state(engine: &TransactionEngine, state: GateState) -> Self {
        Gate {
            engine: engine.clone(),
            cell: TVar::new(engine, state),
        }
    }

    /// Underlying transactional cell
    pub fn cell(&self) -> &TVar<GateState> {
        &self.cell
    }

    /// Transaction step for [`pass`](Self::pass)
    pub fn try_pass(&self, tx: &mut Transaction<'_>) -> Outcome<()> {
        match tx.read(&self.cell).passed() {
            Some(next) => {
                tx.write(&self.cell, next);
                Outcome::Commit(())
            }
            None => Outcome::Retry,
        }
    }

    /// Pass through the gate, blocking until it is open
    pub fn pass(&self) -> Result<()> {
        self.engine.atomically(|tx| self.try_pass(tx))
    }

    /// Transaction step for [`operate`](Self::operate)
    pub fn try_operate(&self, tx: &mut Transaction<'_>) -> Outcome<()> {
        let state = tx.read(&self.cell);
        tx.write(&self.cell, state.opened());
        Outcome::Commit(())
    }

    /// Open the gate: `remaining = capacity`. Coordinator only.
    pub fn operate(&self) -> Result<()> {
        self.engine.atomically(|tx| self.try_operate(tx))
    }

    /// Block until every helper allowed through by the last `operate` has
    /// passed. Coordinator only.
    pub fn await_drained(&self) -> Result<()> {
        self.engine.atomically(|tx| {
            if tx.read(&self.cell).is_open() {
                Outcome::Retry
            } else {
                Outcome::Commit(())
            }
        })
    }

    /// Current committed state
    pub fn state(&self) -> GateState {
        self.cell.load(&self.engine)
    }
}
