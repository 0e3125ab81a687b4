//! Identifiers and version stamps
//!
//! - [`EngineId`]: distinguishes transaction engines living in one process
//! - [`CellId`]: process-unique identity of a transactional cell
//! - [`Version`]: commit stamp carried by every cell
//! - [`HelperId`]: identity of a helper actor within its pool

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(u64);

impl EngineId {
    /// Allocate a fresh, never-before-seen engine id
    pub fn next() -> Self {
        EngineId(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

/// Unique identifier for a transactional cell
///
/// Ids are allocated from a process-wide counter, so two cells never share
/// an id even when they belong to different engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Allocate a fresh cell id
    pub fn next() -> Self {
        CellId(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell-{}", self.0)
    }
}

/// Commit version stamp
///
/// Every committed transaction that writes at least one cell allocates the
/// next version from its engine's clock and stamps each written cell with
/// it. A freshly created cell carries [`Version::ZERO`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Version(u64);

impl Version {
    /// Version of a cell that has never been written by a commit
    pub const ZERO: Version = Version(0);

    /// Wrap a raw stamp
    pub const fn new(raw: u64) -> Self {
        Version(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version immediately after this one
    pub fn next(&self) -> Self {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identifier of a helper within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HelperId(u32);

impl HelperId {
    /// Wrap a raw helper number
    pub const fn new(raw: u32) -> Self {
        HelperId(raw)
    }

    /// Raw numeric value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for HelperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
