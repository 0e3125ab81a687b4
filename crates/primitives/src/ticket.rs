//! Helper tickets
//!
//! A [`HelperTicket`] is what a helper receives on a successful join and
//! what the coordinator receives when it rotates a full group: the entry
//! and exit gates of exactly one generation.

use crate::gate::Gate;

/// The gate pair of one group generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperTicket {
    generation: u64,
    entry_gate: Gate,
    exit_gate: Gate,
}

impl HelperTicket {
    pub(crate) fn new(generation: u64, entry_gate: Gate, exit_gate: Gate) -> Self {
        HelperTicket {
            generation,
            entry_gate,
            exit_gate,
        }
    }

    /// Generation this ticket belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Gate helpers pass to start the activity
    pub fn entry_gate(&self) -> &Gate {
        &self.entry_gate
    }

    /// Gate helpers pass once the activity is over
    pub fn exit_gate(&self) -> &Gate {
        &self.exit_gate
    }
}
