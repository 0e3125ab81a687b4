//! Transactional cells
//!
//! A [`TVar<T>`] owns one versioned value. The value can only be read or
//! written through a [`Transaction`](crate::Transaction); the engine is the
//! only code that ever installs a new value, and it does so under its commit
//! lock with a version strictly greater than the one being replaced.
//!
//! Transactions track cells of many different `T`s in one read-set and one
//! write-set, so each cell is also reachable through the type-erased
//! [`ErasedCell`] trait.

use crate::engine::{invariant_violation, TransactionEngine};
use crate::waiter::{Waiter, WaiterList};
use parking_lot::{Mutex, RwLock};
use rendezvous_core::{CellId, EngineId, Version};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Value type stored in a write-set entry
pub(crate) type PendingValue = Box<dyn Any + Send + Sync>;

/// Current committed contents of a cell
struct Slot<T> {
    version: Version,
    value: T,
}

pub(crate) struct CellInner<T> {
    id: CellId,
    engine: EngineId,
    slot: RwLock<Slot<T>>,
    waiters: Mutex<WaiterList>,
}

/// Type-erased view of a cell used by the engine's commit path
pub(crate) trait ErasedCell: Send + Sync {
    fn id(&self) -> CellId;

    /// Current committed version
    fn version(&self) -> Version;

    /// Replace the committed value. Called only under the commit lock.
    fn install(&self, value: PendingValue, version: Version);

    /// Register a suspended attempt to be woken by the next commit here
    fn park(&self, waiter: &Arc<Waiter>);

    /// Remove a waiter that was woken through some other cell
    fn unpark(&self, waiter: &Arc<Waiter>);

    /// Drain every parked waiter
    fn take_waiters(&self) -> WaiterList;
}

impl<T: Send + Sync + 'static> ErasedCell for CellInner<T> {
    fn id(&self) -> CellId {
        self.id
    }

    fn version(&self) -> Version {
        self.slot.read().version
    }

    fn install(&self, value: PendingValue, version: Version) {
        let value = match value.downcast::<T>() {
            Ok(value) => *value,
            Err(_) => invariant_violation(format_args!(
                "pending write for {} does not match the cell's type",
                self.id
            )),
        };

        let mut slot = self.slot.write();
        if version <= slot.version {
            invariant_violation(format_args!(
                "commit would move {} from {} back to {}",
                self.id, slot.version, version
            ));
        }
        slot.version = version;
        slot.value = value;
    }

    fn park(&self, waiter: &Arc<Waiter>) {
        self.waiters.lock().push(Arc::clone(waiter));
    }

    fn unpark(&self, waiter: &Arc<Waiter>) {
        self.waiters.lock().retain(|w| !Arc::ptr_eq(w, waiter));
    }

    fn take_waiters(&self) -> WaiterList {
        std::mem::take(&mut *self.waiters.lock())
    }
}

/// A transactional variable
///
/// Cloning a `TVar` clones the handle, not the value: both handles refer to
/// the same cell. Equality and hashing follow cell identity.
///
/// # Example
///
/// ```
/// use rendezvous_concurrency::{Outcome, TVar, TransactionEngine};
///
/// let engine = TransactionEngine::new();
/// let counter = TVar::new(&engine, 0u32);
///
/// engine
///     .atomically(|tx| {
///         let n = tx.read(&counter);
///         tx.write(&counter, n + 1);
///         Outcome::Commit(())
///     })
///     .unwrap();
///
/// assert_eq!(counter.load(&engine), 1);
/// ```
pub struct TVar<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> TVar<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell owned by `engine`, holding `value` at [`Version::ZERO`]
    ///
    /// A cell created inside a transaction body is invisible to other
    /// threads until the transaction commits a reference to it.
    pub fn new(engine: &TransactionEngine, value: T) -> Self {
        TVar {
            inner: Arc::new(CellInner {
                id: CellId::next(),
                engine: engine.id(),
                slot: RwLock::new(Slot {
                    version: Version::ZERO,
                    value,
                }),
                waiters: Mutex::new(WaiterList::new()),
            }),
        }
    }

    /// Read the committed value outside any transaction
    ///
    /// Shorthand for a read-only `atomically` body.
    pub fn load(&self, engine: &TransactionEngine) -> T {
        engine.read_only(|tx| tx.read(self))
    }

    /// Consistent (version, value) pair as currently committed
    pub(crate) fn snapshot(&self) -> (Version, T) {
        let slot = self.inner.slot.read();
        (slot.version, slot.value.clone())
    }

    pub(crate) fn erased(&self) -> Arc<dyn ErasedCell> {
        Arc::clone(&self.inner) as Arc<dyn ErasedCell>
    }
}

impl<T> TVar<T> {
    /// Process-unique identity of this cell
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Engine that owns this cell
    pub fn engine_id(&self) -> EngineId {
        self.inner.engine
    }

    /// Number of attempts currently parked on this cell
    pub fn parked(&self) -> usize {
        self.inner.waiters.lock().len()
    }
}

impl<T> Clone for TVar<T> {
    fn clone(&self) -> Self {
        TVar {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for TVar<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for TVar<T> {}

impl<T> Hash for TVar<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<T> fmt::Debug for TVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TVar")
            .field("id", &self.inner.id)
            .field("engine", &self.inner.engine)
            .finish()
    }
}
