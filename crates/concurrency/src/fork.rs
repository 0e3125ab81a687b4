//! Forked transactions
//!
//! [`TransactionEngine::fork_and_run`](crate::TransactionEngine::fork_and_run)
//! runs each body on its own thread. Every fork hands its result back
//! through its own typed single-producer/single-consumer channel, wrapped in
//! a [`ForkHandle`]. Forks can share a [`ReadySignal`] so one consumer can
//! sleep until *any* of several forks resolves.

use parking_lot::{Condvar, Mutex};
use rendezvous_core::{Error, Result};
use std::any::Any;
use std::fmt;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::warn;

/// Doorbell rung whenever an attached fork resolves
#[derive(Default)]
pub struct ReadySignal {
    lock: Mutex<()>,
    cond: Condvar,
}

impl ReadySignal {
    /// Create a new signal
    pub fn new() -> Arc<Self> {
        Arc::new(ReadySignal::default())
    }

    /// Block until `ready` returns true
    ///
    /// `ready` is evaluated under the signal's lock, and every ring takes
    /// the same lock, so a ring that happens between evaluation and sleep is
    /// never missed.
    pub fn wait_until(&self, mut ready: impl FnMut() -> bool) {
        let mut guard = self.lock.lock();
        while !ready() {
            self.cond.wait(&mut guard);
        }
    }

    fn ring(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadySignal").finish_non_exhaustive()
    }
}

/// Rings the signal when the fork's thread finishes, even by panicking
struct RingOnDrop(Arc<ReadySignal>);

impl Drop for RingOnDrop {
    fn drop(&mut self) {
        self.0.ring();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Receiving end of one forked transaction
pub struct ForkHandle<T> {
    name: String,
    receiver: Option<Receiver<Result<T>>>,
    buffered: Option<Result<T>>,
    thread: Option<JoinHandle<()>>,
    signal: Arc<ReadySignal>,
}

impl<T: Send + 'static> ForkHandle<T> {
    pub(crate) fn spawn<F>(name: String, signal: Arc<ReadySignal>, run: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);
        let ring = RingOnDrop(Arc::clone(&signal));

        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            let _ring = ring;
            // The receiver may already be gone if the handle was dropped.
            let _ = sender.send(run());
        });

        match spawned {
            Ok(thread) => ForkHandle {
                name,
                receiver: Some(receiver),
                buffered: None,
                thread: Some(thread),
                signal,
            },
            Err(e) => {
                warn!(fork = %name, error = %e, "failed to spawn fork thread");
                ForkHandle {
                    name,
                    receiver: None,
                    buffered: Some(Err(Error::Io(e))),
                    thread: None,
                    signal,
                }
            }
        }
    }
}

impl<T> ForkHandle<T> {
    /// Thread name of this fork
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal rung when this fork resolves
    pub fn signal(&self) -> &Arc<ReadySignal> {
        &self.signal
    }

    /// Check whether the fork has resolved, without blocking
    pub fn is_ready(&mut self) -> bool {
        self.poll();
        self.buffered.is_some()
    }

    /// Take the result if the fork has resolved
    pub fn try_take(&mut self) -> Option<Result<T>> {
        self.poll();
        self.buffered.take()
    }

    /// Block until the fork resolves and return its result
    ///
    /// # Errors
    ///
    /// Whatever the forked transaction returned, or `Error::ForkPanicked`
    /// if its body panicked.
    pub fn join(mut self) -> Result<T> {
        if let Some(result) = self.buffered.take() {
            return result;
        }
        let received = match self.receiver.take() {
            Some(receiver) => receiver.recv().ok(),
            None => None,
        };
        match received {
            Some(result) => result,
            None => Err(self.panicked()),
        }
    }

    fn poll(&mut self) {
        if self.buffered.is_some() {
            return;
        }
        let polled = match &self.receiver {
            Some(receiver) => receiver.try_recv(),
            None => return,
        };
        match polled {
            Ok(result) => {
                self.receiver = None;
                self.buffered = Some(result);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                let err = self.panicked();
                self.buffered = Some(Err(err));
            }
        }
    }

    fn panicked(&mut self) -> Error {
        let message = match self.thread.take().map(JoinHandle::join) {
            Some(Err(payload)) => panic_message(payload),
            _ => "fork ended without a result".to_string(),
        };
        warn!(fork = %self.name, %message, "forked transaction panicked");
        Error::ForkPanicked(message)
    }
}

impl<T> fmt::Debug for ForkHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkHandle")
            .field("name", &self.name)
            .field("resolved", &self.buffered.is_some())
            .finish()
    }
}
