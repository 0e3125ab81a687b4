//! Shared helpers for the integration suite.

#![allow(dead_code)]

pub use rendezvous::prelude::*;
pub use std::sync::Arc;
pub use std::thread;
pub use std::time::Duration;

use std::thread::JoinHandle;

/// Spin until `n` transactions are parked on `var`.
pub fn wait_parked<T>(var: &TVar<T>, n: usize) {
    while var.parked() < n {
        thread::sleep(Duration::from_millis(1));
    }
}

/// Spawn `n` threads that each join `group` once.
pub fn spawn_joiners(group: &Group, n: usize) -> Vec<JoinHandle<Result<HelperTicket>>> {
    (0..n)
        .map(|_| {
            let group = group.clone();
            thread::spawn(move || group.join())
        })
        .collect()
}

/// Join `group` until it is full, from the calling thread.
pub fn fill(group: &Group) -> HelperTicket {
    let capacity = group.state().capacity();
    let mut last = None;
    for _ in 0..capacity {
        last = Some(group.join().unwrap());
    }
    last.unwrap()
}

/// Collect every joiner's ticket.
pub fn join_all(handles: Vec<JoinHandle<Result<HelperTicket>>>) -> Vec<HelperTicket> {
    handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect()
}
