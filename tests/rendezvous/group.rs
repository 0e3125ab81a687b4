//! Group tests
//!
//! Liveness of `join`/`await_full`, generation rotation and no-overtake.

use crate::common::*;
use proptest::prelude::*;

// ============================================================================
// Liveness
// ============================================================================

#[test]
fn n_joiners_fill_and_rotate() {
    let engine = TransactionEngine::new();
    let group = Group::new(&engine, 5).unwrap();

    let joiners = spawn_joiners(&group, 5);
    let ticket = group.await_full().unwrap();
    let tickets = join_all(joiners);

    assert!(tickets.iter().all(|t| *t == ticket));
    let state = group.state();
    assert_eq!(state.spaces_left(), 5);
    assert_eq!(state.generation(), 1);
    assert_ne!(state.ticket(), ticket);
}

#[test]
fn await_full_waits_for_last_joiner() {
    let engine = TransactionEngine::new();
    let group = Group::new(&engine, 2).unwrap();
    group.join().unwrap();

    let coordinator = {
        let group = group.clone();
        thread::spawn(move || group.await_full())
    };
    wait_parked(group.cell(), 1);
    assert!(!coordinator.is_finished());

    let last = group.join().unwrap();
    assert_eq!(coordinator.join().unwrap().unwrap(), last);
}

#[test]
fn rotation_installs_closed_gates() {
    let engine = TransactionEngine::new();
    let group = Group::new(&engine, 3).unwrap();
    fill(&group);
    let old = group.await_full().unwrap();
    old.entry_gate().operate().unwrap();

    let fresh = group.state().ticket();
    assert_eq!(fresh.entry_gate().state().remaining(), 0);
    assert_eq!(fresh.exit_gate().state().remaining(), 0);
    assert_eq!(fresh.entry_gate().state().capacity(), 3);
    assert_ne!(fresh.entry_gate(), old.entry_gate());
}

// ============================================================================
// No-overtake
// ============================================================================

#[test]
fn late_joiner_lands_in_next_generation() {
    let engine = TransactionEngine::new();
    let group = Group::new(&engine, 3).unwrap();
    let first = fill(&group);

    // A fourth helper arrives while the group is full but not yet rotated.
    let late = spawn_joiners(&group, 1);
    wait_parked(group.cell(), 1);
    assert_eq!(group.state().spaces_left(), 0);

    let rotated = group.await_full().unwrap();
    assert_eq!(rotated, first);

    let late_ticket = join_all(late).remove(0);
    assert_ne!(late_ticket, first, "late joiner must not receive the old gates");
    assert_eq!(late_ticket.generation(), 1);
    assert_eq!(group.state().spaces_left(), 2);
}

#[test]
fn old_ticket_never_touches_new_gates() {
    let engine = TransactionEngine::new();
    let group = Group::new(&engine, 1).unwrap();
    let old = fill(&group);
    group.await_full().unwrap();
    let new = fill(&group);

    old.entry_gate().operate().unwrap();
    old.entry_gate().pass().unwrap();

    assert_eq!(old.entry_gate().state().remaining(), 0);
    assert_eq!(new.entry_gate().state().remaining(), 0);
    assert!(!new.entry_gate().state().is_open());
}

// ============================================================================
// Invariant
// ============================================================================

#[derive(Debug, Clone)]
enum GroupOp {
    Join,
    AwaitFull,
}

fn group_op() -> impl Strategy<Value = GroupOp> {
    prop_oneof![4 => Just(GroupOp::Join), 1 => Just(GroupOp::AwaitFull)]
}

proptest! {
    #[test]
    fn spaces_left_stays_within_capacity(
        capacity in 1u32..6,
        ops in prop::collection::vec(group_op(), 0..64),
    ) {
        let engine = TransactionEngine::new();
        let group = Group::new(&engine, capacity).unwrap();
        let mut rotations = 0u64;

        for op in ops {
            let before = group.state();
            match op {
                GroupOp::Join if !before.is_full() => {
                    let ticket = group.join().unwrap();
                    prop_assert_eq!(ticket, before.ticket());
                }
                GroupOp::AwaitFull if before.is_full() => {
                    let ticket = group.await_full().unwrap();
                    prop_assert_eq!(ticket, before.ticket());
                    rotations += 1;
                }
                _ => {}
            }
            let state = group.state();
            prop_assert!(state.spaces_left() <= state.capacity());
            prop_assert_eq!(state.generation(), rotations);
        }
    }
}
