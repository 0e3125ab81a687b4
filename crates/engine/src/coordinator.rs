//! Coordinator protocol
//!
//! ```text
//! SLEEP ─► SELECT-READY-GROUP ─► ESCORT-IN ─► WORK-PERIOD ─► ESCORT-OUT ─┐
//!   ▲                                                                   │
//!   └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Selecting a group
//!
//! Every pool has at most one outstanding forked `await_full` transaction.
//! All forks ring the coordinator's [`ReadySignal`]; the coordinator sleeps
//! until any of them resolves.
//!
//! The engine does not order independent commits, so "reindeer before
//! elves" is a tie-break applied here. Once woken, the coordinator scans
//! pools in priority order and picks the first that is ready: its fork has
//! resolved, or its group is observably full (or already rotated past the
//! generation its fork is awaiting). In the latter case the fork is bound
//! to resolve, so the coordinator simply joins it. Results of lower-priority
//! pools stay buffered in their handles for a later cycle.
//!
//! ## Escorting
//!
//! ESCORT-IN opens the entry gate and waits until every helper of the
//! generation has passed it. ESCORT-OUT opens the exit gate. The exit gate
//! is not awaited: a helper whose task failed never passes it.

use rendezvous_concurrency::{ForkHandle, ReadySignal, TransactionEngine};
use rendezvous_core::{Error, Result};
use rendezvous_primitives::{Group, HelperTicket};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// A named group of helpers
#[derive(Debug, Clone)]
pub struct Pool {
    name: String,
    group: Group,
}

impl Pool {
    /// Pair a name with a group
    pub fn new(name: impl Into<String>, group: Group) -> Self {
        Pool {
            name: name.into(),
            group,
        }
    }

    /// Pool name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pool's group
    pub fn group(&self) -> &Group {
        &self.group
    }
}

/// The coordinator's choice for one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escort {
    /// Index of the chosen pool in priority order (0 is highest)
    pub pool: usize,
    /// Name of the chosen pool
    pub name: String,
    /// Gates of the generation being escorted
    pub ticket: HelperTicket,
}

struct PoolSlot {
    pool: Pool,
    /// Outstanding `await_full`, if any
    pending: Option<ForkHandle<HelperTicket>>,
    /// Generation the outstanding fork will rotate
    awaited: u64,
}

impl PoolSlot {
    fn fork_resolved(&mut self) -> bool {
        self.pending.as_mut().map_or(false, |fork| fork.is_ready())
    }

    fn is_ready(&mut self) -> bool {
        self.fork_resolved() || self.pool.group.is_ready_after(self.awaited)
    }
}

/// The single actor that selects and escorts ready groups
pub struct Coordinator {
    engine: TransactionEngine,
    slots: Vec<PoolSlot>,
    signal: Arc<ReadySignal>,
    work: Duration,
}

impl Coordinator {
    /// Create a coordinator for `pools`, given in priority order
    ///
    /// # Errors
    ///
    /// `Error::NoPools` if `pools` is empty.
    pub fn new(engine: &TransactionEngine, pools: Vec<Pool>, work: Duration) -> Result<Self> {
        if pools.is_empty() {
            return Err(Error::NoPools);
        }
        let slots = pools
            .into_iter()
            .map(|pool| {
                let awaited = pool.group.state().generation();
                PoolSlot {
                    pool,
                    pending: None,
                    awaited,
                }
            })
            .collect();
        Ok(Coordinator {
            engine: engine.clone(),
            slots,
            signal: ReadySignal::new(),
            work,
        })
    }

    /// Pools in priority order
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.slots.iter().map(|slot| &slot.pool)
    }

    /// SELECT-READY-GROUP: block until a group is full and rotate it
    ///
    /// The highest-priority ready pool wins.
    pub fn next_ready(&mut self) -> Result<Escort> {
        for slot in &mut self.slots {
            if slot.pending.is_none() {
                let group = slot.pool.group.clone();
                slot.pending = Some(
                    self.engine
                        .fork_into(&self.signal, move |tx| group.try_await_full(tx)),
                );
                debug!(pool = %slot.pool.name, generation = slot.awaited, "awaiting full group");
            }
        }

        let slots = &mut self.slots;
        self.signal
            .wait_until(|| slots.iter_mut().any(PoolSlot::fork_resolved));

        let index = self
            .slots
            .iter_mut()
            .position(PoolSlot::is_ready)
            .ok_or_else(|| Error::Internal("woken with no ready pool".to_string()))?;

        let slot = &mut self.slots[index];
        let ticket = match slot.pending.take() {
            Some(fork) => fork.join()?,
            None => return Err(Error::Internal("ready pool has no fork".to_string())),
        };
        slot.awaited = ticket.generation() + 1;

        info!(
            pool = %slot.pool.name,
            generation = ticket.generation(),
            "group ready"
        );
        Ok(Escort {
            pool: index,
            name: slot.pool.name.clone(),
            ticket,
        })
    }

    /// ESCORT-IN, WORK-PERIOD and ESCORT-OUT for one ready group
    pub fn escort(&self, escort: &Escort) -> Result<()> {
        let ticket = &escort.ticket;

        ticket.entry_gate().operate()?;
        ticket.entry_gate().await_drained()?;
        info!(pool = %escort.name, generation = ticket.generation(), "escorted in");

        if !self.work.is_zero() {
            thread::sleep(self.work);
        }

        ticket.exit_gate().operate()?;
        info!(pool = %escort.name, generation = ticket.generation(), "escorted out");
        Ok(())
    }

    /// One full cycle: select, then escort
    pub fn run_cycle(&mut self) -> Result<Escort> {
        let escort = self.next_ready()?;
        self.escort(&escort)?;
        Ok(escort)
    }

    /// Run `cycles` cycles and return what was escorted, in order
    pub fn run(&mut self, cycles: u32) -> Result<Vec<Escort>> {
        (0..cycles).map(|_| self.run_cycle()).collect()
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("pools", &self.slots.iter().map(|s| &s.pool.name).collect::<Vec<_>>())
            .field("work", &self.work)
            .finish_non_exhaustive()
    }
}
