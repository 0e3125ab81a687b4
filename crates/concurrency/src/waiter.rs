//! Parking slot for suspended attempts
//!
//! A [`Waiter`] is created each time an attempt returns `Retry`. The engine
//! registers it on every cell in the attempt's read-set; the first commit
//! that writes one of those cells drains the cell's waiter list and calls
//! [`Waiter::notify`]. The suspended thread blocks in [`Waiter::wait`] on a
//! condition variable, never spinning.

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use std::sync::Arc;

/// Waiters parked on a single cell. Most cells have very few.
pub(crate) type WaiterList = SmallVec<[Arc<Waiter>; 4]>;

/// One suspended attempt
#[derive(Debug, Default)]
pub(crate) struct Waiter {
    /// Set once by the first waking commit
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Waiter {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Waiter::default())
    }

    /// Wake the suspended thread. Idempotent.
    pub(crate) fn notify(&self) {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            *signaled = true;
            self.cond.notify_one();
        }
    }

    /// Block until [`notify`](Self::notify) has been called.
    pub(crate) fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cond.wait(&mut signaled);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }
}
