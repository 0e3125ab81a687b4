//! Gate tests
//!
//! Safety of `pass`, the drain wait and the `remaining` invariant.

use crate::common::*;
use proptest::prelude::*;

// ============================================================================
// Safety
// ============================================================================

#[test]
fn pass_waits_for_operate_on_that_gate() {
    let engine = TransactionEngine::new();
    let gate = Gate::new(&engine, 1).unwrap();
    let other = Gate::new(&engine, 1).unwrap();

    let passer = {
        let gate = gate.clone();
        thread::spawn(move || gate.pass())
    };
    wait_parked(gate.cell(), 1);

    other.operate().unwrap();
    thread::sleep(Duration::from_millis(20));
    assert!(!passer.is_finished(), "opening another gate must not release it");
    assert_eq!(other.state().remaining(), 1);

    gate.operate().unwrap();
    passer.join().unwrap().unwrap();
    assert_eq!(gate.state().remaining(), 0);
}

#[test]
fn operate_lets_exactly_capacity_through() {
    let engine = TransactionEngine::new();
    let gate = Gate::new(&engine, 3).unwrap();

    let passers: Vec<_> = (0..4)
        .map(|_| {
            let gate = gate.clone();
            thread::spawn(move || gate.pass())
        })
        .collect();
    wait_parked(gate.cell(), 4);

    gate.operate().unwrap();
    gate.await_drained().unwrap();
    // The fourth passer is parked again on the closed gate.
    wait_parked(gate.cell(), 1);
    let finished = passers.iter().filter(|p| p.is_finished()).count();
    assert!(finished <= 3);

    gate.operate().unwrap();
    for p in passers {
        p.join().unwrap().unwrap();
    }
    assert_eq!(gate.state().remaining(), 2);
}

#[test]
fn await_drained_returns_once_all_passed() {
    let engine = TransactionEngine::new();
    let gate = Gate::new(&engine, 2).unwrap();
    gate.operate().unwrap();

    let drained = {
        let gate = gate.clone();
        thread::spawn(move || gate.await_drained())
    };
    wait_parked(gate.cell(), 1);

    gate.pass().unwrap();
    assert_eq!(gate.state().remaining(), 1);
    gate.pass().unwrap();
    drained.join().unwrap().unwrap();
    assert!(!gate.state().is_open());
}

#[test]
fn zero_capacity_rejected() {
    let engine = TransactionEngine::new();
    assert!(matches!(Gate::new(&engine, 0), Err(Error::InvalidCapacity(0))));
}

// ============================================================================
// Invariant
// ============================================================================

#[derive(Debug, Clone)]
enum GateOp {
    Pass,
    Operate,
}

fn gate_op() -> impl Strategy<Value = GateOp> {
    prop_oneof![3 => Just(GateOp::Pass), 1 => Just(GateOp::Operate)]
}

proptest! {
    #[test]
    fn remaining_stays_within_capacity(
        capacity in 1u32..8,
        ops in prop::collection::vec(gate_op(), 0..64),
    ) {
        let engine = TransactionEngine::new();
        let gate = Gate::new(&engine, capacity).unwrap();
        let mut model = 0u32;

        for op in ops {
            match op {
                GateOp::Pass if model > 0 => {
                    gate.pass().unwrap();
                    model -= 1;
                }
                GateOp::Pass => {}
                GateOp::Operate => {
                    gate.operate().unwrap();
                    model = capacity;
                }
            }
            let state = gate.state();
            prop_assert!(state.remaining() <= state.capacity());
            prop_assert_eq!(state.remaining(), model);
        }
    }

    #[test]
    fn gate_state_rejects_overfull(capacity in 1u32..100, extra in 1u32..100) {
        prop_assert!(GateState::new(capacity, capacity + extra).is_err());
        prop_assert!(GateState::new(capacity, capacity).is_ok());
    }
}
