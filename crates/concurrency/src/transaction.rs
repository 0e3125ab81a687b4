//! Transaction attempts
//!
//! A [`Transaction`] is the ephemeral record of one execution of a body:
//!
//! - **read-set**: every cell read, with the version observed
//! - **write-set**: every cell written, with its pending value
//!
//! Nothing in a transaction is visible to other threads until the engine
//! commits it. A retried or conflicting attempt is simply dropped and the
//! body runs again against a brand-new `Transaction`.
//!
//! ## Read consistency
//!
//! Each attempt samples the engine clock when it begins (its *stamp*). Reads
//! of cells whose version is at or below the stamp are mutually consistent.
//! A read that observes a newer version asks the engine to revalidate the
//! read-set under the commit lock; if nothing read so far has changed the
//! stamp moves forward, otherwise the attempt is *doomed*. A doomed attempt
//! keeps running (every value it sees is still a well-formed `T`) but its
//! outcome is ignored and the engine re-executes the body.

use crate::cell::{ErasedCell, PendingValue, TVar};
use crate::engine::{invariant_violation, EngineInner};
use rendezvous_core::{CellId, Error, Version};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Result of running a transaction body once
///
/// This is the explicit tri-state returned by every body passed to
/// [`TransactionEngine::atomically`](crate::TransactionEngine::atomically).
#[derive(Debug)]
pub enum Outcome<T> {
    /// Apply every write atomically and return the value
    Commit(T),
    /// A precondition is unmet: suspend until a cell read by this attempt
    /// is committed by someone else, then run the body again
    Retry,
    /// Give up: discard every write and surface the error
    Abort(Error),
}

impl<T> Outcome<T> {
    /// Map the committed value, leaving `Retry` and `Abort` untouched
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Commit(value) => Outcome::Commit(f(value)),
            Outcome::Retry => Outcome::Retry,
            Outcome::Abort(err) => Outcome::Abort(err),
        }
    }

    /// Check if this outcome commits
    pub fn is_commit(&self) -> bool {
        matches!(self, Outcome::Commit(_))
    }

    /// Check if this outcome asks to retry
    pub fn is_retry(&self) -> bool {
        matches!(self, Outcome::Retry)
    }
}

impl<T> From<rendezvous_core::Result<T>> for Outcome<T> {
    fn from(result: rendezvous_core::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Commit(value),
            Err(err) => Outcome::Abort(err),
        }
    }
}

pub(crate) struct ReadEntry {
    pub(crate) cell: Arc<dyn ErasedCell>,
    pub(crate) version: Version,
}

pub(crate) struct WriteEntry {
    pub(crate) cell: Arc<dyn ErasedCell>,
    pub(crate) value: PendingValue,
}

/// One attempt at running a transaction body
pub struct Transaction<'e> {
    pub(crate) engine: &'e EngineInner,
    pub(crate) stamp: Version,
    pub(crate) reads: FxHashMap<CellId, ReadEntry>,
    pub(crate) writes: FxHashMap<CellId, WriteEntry>,
    pub(crate) doomed: bool,
}

impl<'e> Transaction<'e> {
    pub(crate) fn begin(engine: &'e EngineInner) -> Self {
        Transaction {
            engine,
            stamp: engine.clock(),
            reads: FxHashMap::default(),
            writes: FxHashMap::default(),
            doomed: false,
        }
    }

    /// Read a cell
    ///
    /// Returns this attempt's own pending write if there is one, otherwise
    /// the committed value. The first read of a cell records its version in
    /// the read-set.
    pub fn read<T>(&mut self, var: &TVar<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        self.check_owner(var);
        let id = var.id();

        if let Some(pending) = self.writes.get(&id) {
            return match pending.value.downcast_ref::<T>() {
                Some(value) => value.clone(),
                None => invariant_violation(format_args!(
                    "pending write for {} does not match the cell's type",
                    id
                )),
            };
        }

        let (version, value) = var.snapshot();
        match self.reads.get(&id).map(|seen| seen.version) {
            Some(seen) => {
                if seen != version {
                    self.doomed = true;
                }
            }
            None => {
                let cell = var.erased();
                if version > self.stamp && !self.doomed {
                    match self.engine.extend(&self.reads, &cell, version) {
                        Some(stamp) => self.stamp = stamp,
                        None => self.doomed = true,
                    }
                }
                self.reads.insert(id, ReadEntry { cell, version });
            }
        }
        value
    }

    /// Buffer a write; visible to later reads in this attempt only
    pub fn write<T>(&mut self, var: &TVar<T>, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.check_owner(var);
        self.writes.insert(
            var.id(),
            WriteEntry {
                cell: var.erased(),
                value: Box::new(value),
            },
        );
    }

    /// Read a cell, apply `f`, and write the result back
    pub fn modify<T>(&mut self, var: &TVar<T>, f: impl FnOnce(T) -> T)
    where
        T: Clone + Send + Sync + 'static,
    {
        let current = self.read(var);
        self.write(var, f(current));
    }

    /// Number of distinct cells read so far
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    /// Number of distinct cells written so far
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    fn check_owner<T>(&self, var: &TVar<T>) {
        if var.engine_id() != self.engine.id {
            panic!(
                "{} belongs to {} but was used in a transaction of {}",
                var.id(),
                var.engine_id(),
                self.engine.id
            );
        }
    }
}
