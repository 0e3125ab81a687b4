//! Core types for the rendezvous workspace
//!
//! This crate defines the vocabulary shared by every layer:
//! - [`Error`] / [`Result`]: the single error type surfaced to callers
//! - [`types`]: identifiers for engines, cells and helpers, plus version stamps

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CellId, EngineId, HelperId, Version};
