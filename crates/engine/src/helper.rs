//! Helper protocol
//!
//! Each helper runs the same loop, whatever its pool:
//!
//! ```text
//! JOIN        group.join()            blocks while the generation is full
//! PASS-ENTRY  ticket.entry_gate.pass  blocks until the coordinator opens it
//! TASK        task(id)                external action, not transactional
//! PASS-EXIT   ticket.exit_gate.pass   blocks until the coordinator opens it
//! REST        optional random delay
//! ```
//!
//! A failing task ends the helper's loop before PASS-EXIT.

use rand::Rng;
use rendezvous_core::{Error, HelperId, Result};
use rendezvous_primitives::{Group, HelperTicket};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Error type task actions may fail with
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// External action a helper performs between its two gates
pub type TaskAction = Arc<dyn Fn(HelperId) -> std::result::Result<(), TaskError> + Send + Sync>;

/// Wrap a closure as a [`TaskAction`]
pub fn task<F>(f: F) -> TaskAction
where
    F: Fn(HelperId) -> std::result::Result<(), TaskError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One helper actor
#[derive(Clone)]
pub struct Helper {
    id: HelperId,
    pool: String,
    group: Group,
    task: TaskAction,
    rest: Option<(Duration, Duration)>,
}

impl Helper {
    /// Create a helper that joins `group` and performs `task` once inside
    pub fn new(id: HelperId, pool: impl Into<String>, group: Group, task: TaskAction) -> Self {
        Helper {
            id,
            pool: pool.into(),
            group,
            task,
            rest: None,
        }
    }

    /// Rest for a random duration between the two bounds after each cycle
    ///
    /// The bounds may be given in either order.
    pub fn with_rest(mut self, rest: Option<(Duration, Duration)>) -> Self {
        self.rest = rest.map(|(a, b)| if a <= b { (a, b) } else { (b, a) });
        self
    }

    /// This helper's id
    pub fn id(&self) -> HelperId {
        self.id
    }

    /// Name of the pool this helper belongs to
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Run one JOIN → PASS-ENTRY → TASK → PASS-EXIT cycle
    ///
    /// Returns the ticket of the generation the helper went through.
    ///
    /// # Errors
    ///
    /// `Error::TaskFailed` if the task fails; the exit gate is then never
    /// passed.
    pub fn run_cycle(&self) -> Result<HelperTicket> {
        let ticket = self.group.join()?;
        debug!(pool = %self.pool, helper = %self.id, generation = ticket.generation(), "joined");

        ticket.entry_gate().pass()?;
        (self.task)(self.id).map_err(|e| {
            warn!(pool = %self.pool, helper = %self.id, error = %e, "task failed");
            Error::task_failed(self.id, e.to_string())
        })?;
        ticket.exit_gate().pass()?;

        debug!(pool = %self.pool, helper = %self.id, generation = ticket.generation(), "left");
        Ok(ticket)
    }

    /// Run cycles forever; returns only on error
    pub fn run(&self) -> Result<()> {
        loop {
            self.run_cycle()?;
            self.rest();
        }
    }

    /// Run [`run`](Self::run) on a dedicated thread named after the helper
    pub fn spawn(self) -> io::Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name(format!("{}-{}", self.pool, self.id.as_u32()))
            .spawn(move || self.run())
    }

    fn rest(&self) {
        if let Some((min, max)) = self.rest {
            let delay = rand::thread_rng().gen_range(min..=max);
            thread::sleep(delay);
        }
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Helper")
            .field("id", &self.id)
            .field("pool", &self.pool)
            .field("rest", &self.rest)
            .finish_non_exhaustive()
    }
}
