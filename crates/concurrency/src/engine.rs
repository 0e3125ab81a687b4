//! Transaction engine: executes attempts and resolves commit, retry, conflict
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. body(tx) returns Outcome::Commit(value)
//! 2. IF the write-set is empty: commit without locking (reads were
//!    consistent at the attempt's stamp), unless the attempt is doomed
//! 3. Acquire commit lock
//! 4. Validate read-set (every observed version still current)
//! 5. IF invalid: release lock, re-run body immediately (conflict)
//! 6. Allocate commit version (clock + 1)
//! 7. Install every pending write with that version
//! 8. Publish the clock, drain waiters parked on the written cells
//! 9. Release commit lock, wake drained waiters
//! ```
//!
//! ## Retry Sequence
//!
//! ```text
//! 1. body(tx) returns Outcome::Retry
//! 2. Acquire commit lock
//! 3. Validate read-set; IF invalid: re-run immediately (conflict)
//! 4. Park one waiter on every cell in the read-set
//! 5. Release commit lock, block until a commit wakes the waiter
//! 6. Unpark from the remaining cells, re-run body
//! ```
//!
//! Steps 3 and 4 happen under the same lock any committer must hold, so a
//! commit can never land between validation and parking: no lost wakeups.

use crate::cell::ErasedCell;
use crate::fork::{ForkHandle, ReadySignal};
use crate::transaction::{Outcome, ReadEntry, Transaction};
use crate::waiter::{Waiter, WaiterList};
use parking_lot::Mutex;
use rendezvous_core::{CellId, EngineId, Error, Result, Version};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Report an engine defect and abort the process
///
/// Reached only when the engine's own bookkeeping is inconsistent (for
/// example a commit that would move a cell's version backwards). Such a
/// state cannot be recovered from by retrying.
#[cold]
pub(crate) fn invariant_violation(detail: fmt::Arguments<'_>) -> ! {
    error!(%detail, "transaction engine invariant violated");
    eprintln!("transaction engine invariant violated: {}", detail);
    std::process::abort()
}

fn reads_valid(reads: &FxHashMap<CellId, ReadEntry>) -> bool {
    reads
        .values()
        .all(|entry| entry.cell.version() == entry.version)
}

/// Counters describing what the engine has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Attempts that committed (including read-only ones)
    pub commits: u64,
    /// Attempts discarded because a read went stale
    pub conflicts: u64,
    /// Attempts that suspended on `Outcome::Retry`
    pub retries: u64,
    /// Suspended attempts woken by a commit
    pub wakeups: u64,
    /// Attempts that returned `Outcome::Abort`
    pub aborts: u64,
}

#[derive(Default)]
struct Counters {
    commits: AtomicU64,
    conflicts: AtomicU64,
    retries: AtomicU64,
    wakeups: AtomicU64,
    aborts: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) struct EngineInner {
    pub(crate) id: EngineId,

    /// Global version clock
    ///
    /// Monotonically increasing. Each committed transaction with a non-empty
    /// write-set advances it by exactly one.
    clock: AtomicU64,

    /// Commit serialization lock
    ///
    /// Validation, installation and waiter registration all happen under
    /// this lock. It is the only lock guarding domain state.
    commit_lock: Mutex<()>,

    counters: Counters,

    /// Sequence for naming fork threads
    pub(crate) fork_seq: AtomicU64,
}

impl EngineInner {
    pub(crate) fn clock(&self) -> Version {
        Version::new(self.clock.load(Ordering::Acquire))
    }

    /// Try to move an attempt's stamp forward after it observed `version`
    /// on `cell`, which is newer than the current stamp.
    ///
    /// Returns the new stamp if every earlier read, and the new one, are
    /// still current; `None` if the attempt must be considered doomed.
    pub(crate) fn extend(
        &self,
        reads: &FxHashMap<CellId, ReadEntry>,
        cell: &Arc<dyn ErasedCell>,
        version: Version,
    ) -> Option<Version> {
        let _commit_guard = self.commit_lock.lock();
        if cell.version() == version && reads_valid(reads) {
            Some(self.clock())
        } else {
            None
        }
    }

    fn commit(&self, tx: Transaction<'_>) -> bool {
        if tx.doomed {
            return false;
        }
        if tx.writes.is_empty() {
            return true;
        }

        let woken = {
            let _commit_guard = self.commit_lock.lock();
            if !reads_valid(&tx.reads) {
                return false;
            }

            let version = self.clock().next();
            let mut woken = WaiterList::new();
            for (_, entry) in tx.writes {
                entry.cell.install(entry.value, version);
                woken.extend(entry.cell.take_waiters());
            }
            self.clock.store(version.as_u64(), Ordering::Release);
            trace!(engine = %self.id, %version, woken = woken.len(), "commit");
            woken
        };

        for waiter in woken {
            waiter.notify();
        }
        true
    }

    /// Park the calling thread until a commit touches the read-set
    ///
    /// Returns `Ok(false)` without blocking if the read-set is already stale.
    fn suspend(&self, tx: Transaction<'_>) -> Result<bool> {
        if tx.doomed {
            return Ok(false);
        }
        if tx.reads.is_empty() {
            return Err(Error::Internal(
                "transaction retried without reading any cell; nothing could ever wake it"
                    .to_string(),
            ));
        }

        let waiter = Waiter::new();
        {
            let _commit_guard = self.commit_lock.lock();
            if !reads_valid(&tx.reads) {
                return Ok(false);
            }
            for entry in tx.reads.values() {
                entry.cell.park(&waiter);
            }
        }

        Counters::bump(&self.counters.retries);
        trace!(engine = %self.id, cells = tx.reads.len(), "suspend");
        waiter.wait();

        for entry in tx.reads.values() {
            entry.cell.unpark(&waiter);
        }
        Counters::bump(&self.counters.wakeups);
        Ok(true)
    }
}

/// Handle to a transaction engine
///
/// Cloning is cheap and every clone refers to the same engine. All cells
/// created with one engine must only be used in that engine's transactions.
///
/// # Thread Safety
///
/// Any number of threads may run [`atomically`](Self::atomically)
/// concurrently. Commits are linearizable; the engine makes no promise about
/// which of two simultaneously ready transactions commits first.
#[derive(Clone)]
pub struct TransactionEngine {
    inner: Arc<EngineInner>,
}

impl TransactionEngine {
    /// Create a new engine with its clock at zero
    pub fn new() -> Self {
        let id = EngineId::next();
        debug!(engine = %id, "transaction engine created");
        TransactionEngine {
            inner: Arc::new(EngineInner {
                id,
                clock: AtomicU64::new(0),
                commit_lock: Mutex::new(()),
                counters: Counters::default(),
                fork_seq: AtomicU64::new(0),
            }),
        }
    }

    /// This engine's identity
    pub fn id(&self) -> EngineId {
        self.inner.id
    }

    /// Version of the most recent commit
    pub fn current_version(&self) -> Version {
        self.inner.clock()
    }

    /// Run `body` atomically
    ///
    /// The body may read and write any cells of this engine and must return
    /// an [`Outcome`]:
    ///
    /// - `Commit(value)`: writes become visible as one unit; returns `Ok(value)`
    /// - `Retry`: blocks until another commit writes a cell this attempt
    ///   read, then runs the body again from scratch
    /// - `Abort(err)`: discards writes; returns `Err(err)`
    ///
    /// If a read goes stale before the commit, the body is silently re-run.
    /// The body may therefore execute many times and must not perform
    /// side effects it cannot repeat.
    ///
    /// # Errors
    ///
    /// The body's own `Abort` error, or `Error::Internal` if the body
    /// retries without having read any cell.
    pub fn atomically<T, F>(&self, mut body: F) -> Result<T>
    where
        F: FnMut(&mut Transaction<'_>) -> Outcome<T>,
    {
        let engine = &*self.inner;
        loop {
            let mut tx = Transaction::begin(engine);
            match body(&mut tx) {
                Outcome::Commit(value) => {
                    if engine.commit(tx) {
                        Counters::bump(&engine.counters.commits);
                        return Ok(value);
                    }
                }
                Outcome::Retry => {
                    if engine.suspend(tx)? {
                        continue;
                    }
                }
                Outcome::Abort(err) => {
                    if !tx.doomed {
                        Counters::bump(&engine.counters.aborts);
                        debug!(engine = %engine.id, error = %err, "transaction aborted");
                        return Err(err);
                    }
                }
            }
            Counters::bump(&engine.counters.conflicts);
            trace!(engine = %engine.id, "conflict, re-running");
        }
    }

    /// Run a body that only reads
    ///
    /// Never blocks and never fails; re-runs only if the reads were
    /// inconsistent.
    pub fn read_only<T, F>(&self, mut body: F) -> T
    where
        F: FnMut(&mut Transaction<'_>) -> T,
    {
        let engine = &*self.inner;
        loop {
            let mut tx = Transaction::begin(engine);
            let value = body(&mut tx);
            if !tx.doomed {
                Counters::bump(&engine.counters.commits);
                return value;
            }
            Counters::bump(&engine.counters.conflicts);
        }
    }

    /// Launch `body` on its own thread and return a handle immediately
    ///
    /// The handle gets a fresh [`ReadySignal`].
    pub fn fork<T, F>(&self, body: F) -> ForkHandle<T>
    where
        T: Send + 'static,
        F: FnMut(&mut Transaction<'_>) -> Outcome<T> + Send + 'static,
    {
        self.fork_into(&ReadySignal::new(), body)
    }

    /// Launch `body` on its own thread, ringing `signal` once it resolves
    pub fn fork_into<T, F>(&self, signal: &Arc<ReadySignal>, body: F) -> ForkHandle<T>
    where
        T: Send + 'static,
        F: FnMut(&mut Transaction<'_>) -> Outcome<T> + Send + 'static,
    {
        let seq = self.inner.fork_seq.fetch_add(1, Ordering::Relaxed);
        let engine = self.clone();
        ForkHandle::spawn(
            format!("stm-fork-{}-{}", self.inner.id.as_u64(), seq),
            Arc::clone(signal),
            move || engine.atomically(body),
        )
    }

    /// Launch every body as an independent concurrent transaction
    ///
    /// All returned handles share one [`ReadySignal`], so the caller can
    /// block until any of them resolves.
    pub fn fork_and_run<T, F, I>(&self, bodies: I) -> Vec<ForkHandle<T>>
    where
        T: Send + 'static,
        F: FnMut(&mut Transaction<'_>) -> Outcome<T> + Send + 'static,
        I: IntoIterator<Item = F>,
    {
        let signal = ReadySignal::new();
        bodies
            .into_iter()
            .map(|body| self.fork_into(&signal, body))
            .collect()
    }

    /// Snapshot of the engine's counters
    pub fn stats(&self) -> EngineStats {
        let c = &self.inner.counters;
        EngineStats {
            commits: c.commits.load(Ordering::Relaxed),
            conflicts: c.conflicts.load(Ordering::Relaxed),
            retries: c.retries.load(Ordering::Relaxed),
            wakeups: c.wakeups.load(Ordering::Relaxed),
            aborts: c.aborts.load(Ordering::Relaxed),
        }
    }
}

impl Default for TransactionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("id", &self.inner.id)
            .field("version", &self.current_version())
            .finish()
    }
}
