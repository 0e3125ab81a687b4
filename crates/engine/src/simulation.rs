//! Simulation wiring
//!
//! Builds one engine, one group per configured pool, the helper threads and
//! the coordinator, then drives the coordinator for the configured number of
//! cycles. Helper threads are detached; they stay parked on their groups
//! once the coordinator stops and die with the process.

use crate::config::{PoolConfig, SimulationConfig};
use crate::coordinator::{Coordinator, Pool};
use crate::helper::{task, Helper, TaskAction};
use rendezvous_concurrency::{EngineStats, TransactionEngine};
use rendezvous_core::{HelperId, Result};
use rendezvous_primitives::Group;
use serde::Serialize;
use std::fmt;
use std::thread;
use tracing::info;

/// One escorted generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscortRecord {
    /// Coordinator cycle, from 1
    pub cycle: u32,
    /// Pool that was escorted
    pub pool: String,
    /// Generation of that pool's group
    pub generation: u64,
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Escorts in the order they happened
    pub escorts: Vec<EscortRecord>,
    /// Engine counters at shutdown
    pub stats: EngineStats,
}

impl SimulationReport {
    /// Number of escorts of `pool`
    pub fn count(&self, pool: &str) -> usize {
        self.escorts.iter().filter(|e| e.pool == pool).count()
    }
}

/// A configured, not yet started simulation
pub struct Simulation {
    config: SimulationConfig,
    engine: TransactionEngine,
    pools: Vec<Pool>,
    task: Option<TaskAction>,
}

impl Simulation {
    /// Validate `config` and create the engine and groups
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let engine = TransactionEngine::new();
        let pools = config
            .pools
            .iter()
            .map(|pool| Ok(Pool::new(pool.name.clone(), Group::new(&engine, pool.capacity)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Simulation {
            config,
            engine,
            pools,
            task: None,
        })
    }

    /// Replace the default task of every helper
    pub fn with_task(mut self, task: TaskAction) -> Self {
        self.task = Some(task);
        self
    }

    /// The configuration this simulation runs
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Engine shared by every group
    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }

    /// Pools in priority order
    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Spawn the helpers, run the coordinator and report what it escorted
    pub fn run(self) -> Result<SimulationReport> {
        info!(
            pools = self.pools.len(),
            cycles = self.config.cycles,
            "starting simulation"
        );

        for (pool, settings) in self.pools.iter().zip(&self.config.pools) {
            let action = self
                .task
                .clone()
                .unwrap_or_else(|| default_task(settings));
            for n in 1..=settings.helpers {
                Helper::new(HelperId::new(n), pool.name(), pool.group().clone(), action.clone())
                    .with_rest(settings.rest_range())
                    .spawn()?;
            }
        }

        let mut coordinator =
            Coordinator::new(&self.engine, self.pools, self.config.work_duration())?;
        let escorts = coordinator
            .run(self.config.cycles)?
            .into_iter()
            .zip(1..)
            .map(|(escort, cycle)| EscortRecord {
                cycle,
                pool: escort.name,
                generation: escort.ticket.generation(),
            })
            .collect();

        let stats = self.engine.stats();
        info!(
            commits = stats.commits,
            conflicts = stats.conflicts,
            retries = stats.retries,
            "simulation finished"
        );
        Ok(SimulationReport { escorts, stats })
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("custom_task", &self.task.is_some())
            .finish()
    }
}

/// Log the pool's activity and take `task_ms`
fn default_task(pool: &PoolConfig) -> TaskAction {
    let name = pool.name.clone();
    let activity = pool.activity.clone();
    let duration = pool.task_duration();
    task(move |id| {
        info!(pool = %name, helper = %id, "{}", activity);
        if !duration.is_zero() {
            thread::sleep(duration);
        }
        Ok(())
    })
}
