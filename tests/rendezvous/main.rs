//! Rendezvous integration tests
//!
//! Exercise the engine, the primitives and the protocols together through
//! the public facade.

mod common;
mod engine;
mod gate;
mod group;
mod protocol;
