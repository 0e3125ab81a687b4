//! Simulation configuration
//!
//! Loaded from TOML; every field has a default matching the classic
//! problem (nine reindeer in one batch, ten elves in batches of three,
//! reindeer first).
//!
//! ```toml
//! cycles = 6
//! work_ms = 1000
//!
//! [[pools]]
//! name = "reindeer"
//! capacity = 9
//! helpers = 9
//! activity = "delivering toys"
//! task_ms = 100
//! rest_min_ms = 0
//! rest_max_ms = 1000
//! ```
//!
//! Pools are listed in priority order: when several are ready at once the
//! coordinator escorts the one listed first.

use rendezvous_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// One helper pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Pool name, used in logs and escort records
    pub name: String,
    /// Helpers per generation
    pub capacity: u32,
    /// Helper threads to spawn
    pub helpers: u32,
    /// What the helpers do once inside, for logging
    pub activity: String,
    /// Duration of each helper's task
    #[serde(default)]
    pub task_ms: u64,
    /// Lower bound of the random rest between cycles
    #[serde(default)]
    pub rest_min_ms: u64,
    /// Upper bound of the random rest between cycles
    #[serde(default)]
    pub rest_max_ms: u64,
}

impl PoolConfig {
    /// Pool with no task duration and no rest
    pub fn new(name: impl Into<String>, capacity: u32, helpers: u32) -> Self {
        PoolConfig {
            name: name.into(),
            capacity,
            helpers,
            activity: "working".to_string(),
            task_ms: 0,
            rest_min_ms: 0,
            rest_max_ms: 0,
        }
    }

    /// Set the activity label
    pub fn activity(mut self, activity: impl Into<String>) -> Self {
        self.activity = activity.into();
        self
    }

    /// Task duration
    pub fn task_duration(&self) -> Duration {
        Duration::from_millis(self.task_ms)
    }

    /// Rest range, `None` when helpers never rest
    pub fn rest_range(&self) -> Option<(Duration, Duration)> {
        if self.rest_max_ms == 0 {
            None
        } else {
            Some((
                Duration::from_millis(self.rest_min_ms),
                Duration::from_millis(self.rest_max_ms),
            ))
        }
    }
}

/// Whole-simulation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Coordinator cycles before shutdown
    pub cycles: u32,
    /// Length of each escorted activity
    pub work_ms: u64,
    /// Pools in priority order, highest first
    pub pools: Vec<PoolConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig::classic()
    }
}

impl SimulationConfig {
    /// Nine reindeer and ten elves, with human-scale delays
    pub fn classic() -> Self {
        SimulationConfig {
            cycles: 6,
            work_ms: 1000,
            pools: vec![
                PoolConfig {
                    task_ms: 100,
                    rest_min_ms: 0,
                    rest_max_ms: 1000,
                    ..PoolConfig::new("reindeer", 9, 9).activity("delivering toys")
                },
                PoolConfig {
                    task_ms: 100,
                    rest_min_ms: 0,
                    rest_max_ms: 1000,
                    ..PoolConfig::new("elves", 3, 10).activity("meeting in the study")
                },
            ],
        }
    }

    /// Same pools as [`classic`](Self::classic) without any delays
    pub fn fast() -> Self {
        let mut config = SimulationConfig::classic();
        config.work_ms = 0;
        for pool in &mut config.pools {
            pool.task_ms = 0;
            pool.rest_min_ms = 0;
            pool.rest_max_ms = 0;
        }
        config
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Work period as a duration
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_ms)
    }

    /// Check the configuration can run to completion
    ///
    /// Every pool needs a non-zero capacity and at least `capacity`
    /// helpers, otherwise its group can never fill.
    pub fn validate(&self) -> Result<()> {
        if self.pools.is_empty() {
            return Err(Error::NoPools);
        }

        let mut names = HashSet::new();
        for pool in &self.pools {
            if !names.insert(pool.name.as_str()) {
                return Err(Error::Config(format!("duplicate pool name '{}'", pool.name)));
            }
            if pool.capacity == 0 {
                return Err(Error::InvalidCapacity(0));
            }
            if pool.helpers < pool.capacity {
                return Err(Error::Config(format!(
                    "pool '{}' has {} helpers but needs {} to fill a group",
                    pool.name, pool.helpers, pool.capacity
                )));
            }
            if pool.rest_min_ms > pool.rest_max_ms {
                return Err(Error::Config(format!(
                    "pool '{}' rest range {}..={} ms is empty",
                    pool.name, pool.rest_min_ms, pool.rest_max_ms
                )));
            }
        }
        Ok(())
    }
}
