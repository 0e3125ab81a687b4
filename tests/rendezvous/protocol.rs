//! Helper and coordinator protocol tests
//!
//! End-to-end batching, priority between pools and task failure.

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counting_task(calls: &Arc<AtomicUsize>) -> rendezvous::engine::TaskAction {
    let calls = Arc::clone(calls);
    task(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

fn wait_full(group: &Group) {
    while !group.state().is_full() {
        thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn three_elves_go_through_one_generation() {
    let engine = TransactionEngine::new();
    let elves = Group::new(&engine, 3).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let helpers: Vec<_> = (1..=3)
        .map(|n| {
            let helper = Helper::new(
                HelperId::new(n),
                "elves",
                elves.clone(),
                counting_task(&calls),
            );
            thread::spawn(move || helper.run_cycle())
        })
        .collect();

    let mut coordinator =
        Coordinator::new(&engine, vec![Pool::new("elves", elves.clone())], Duration::ZERO)
            .unwrap();
    let escort = coordinator.run_cycle().unwrap();
    assert_eq!(escort.name, "elves");
    assert_eq!(escort.ticket.generation(), 0);

    for h in helpers {
        assert_eq!(h.join().unwrap().unwrap(), escort.ticket);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(escort.ticket.entry_gate().state().remaining(), 0);
    assert_eq!(escort.ticket.exit_gate().state().remaining(), 0);

    let state = elves.state();
    assert_eq!(state.spaces_left(), 3);
    assert_eq!(state.generation(), 1);
    assert!(!state.ticket().entry_gate().state().is_open());

    // Eligible for the next generation straight away.
    let next = elves.join().unwrap();
    assert_eq!(next.generation(), 1);
}

#[test]
fn fourth_elf_blocks_until_rotation() {
    let engine = TransactionEngine::new();
    let elves = Group::new(&engine, 3).unwrap();
    let first = join_all(spawn_joiners(&elves, 3));

    let fourth = spawn_joiners(&elves, 1);
    wait_parked(elves.cell(), 1);
    assert_eq!(elves.state().spaces_left(), 0);

    let rotated = elves.await_full().unwrap();
    assert!(first.iter().all(|t| *t == rotated));

    let ticket = join_all(fourth).remove(0);
    assert_eq!(ticket.generation(), 1);
    assert_eq!(ticket, elves.state().ticket());
    assert_eq!(elves.state().spaces_left(), 2);
}

// ============================================================================
// Priority
// ============================================================================

#[test]
fn reindeer_first_when_both_groups_full() {
    let engine = TransactionEngine::new();
    let reindeer = Group::new(&engine, 9).unwrap();
    let elves = Group::new(&engine, 3).unwrap();

    let elf_joiners = spawn_joiners(&elves, 3);
    let reindeer_joiners = spawn_joiners(&reindeer, 9);
    wait_full(&elves);
    wait_full(&reindeer);

    let mut coordinator = Coordinator::new(
        &engine,
        vec![
            Pool::new("reindeer", reindeer.clone()),
            Pool::new("elves", elves.clone()),
        ],
        Duration::ZERO,
    )
    .unwrap();

    let first = coordinator.next_ready().unwrap();
    assert_eq!(first.name, "reindeer");
    assert_eq!(first.pool, 0);
    let second = coordinator.next_ready().unwrap();
    assert_eq!(second.name, "elves");

    assert!(join_all(reindeer_joiners).iter().all(|t| *t == first.ticket));
    assert!(join_all(elf_joiners).iter().all(|t| *t == second.ticket));
}

#[test]
fn coordinator_keeps_escorting_with_live_helpers() {
    let engine = TransactionEngine::new();
    let reindeer = Group::new(&engine, 4).unwrap();
    let elves = Group::new(&engine, 2).unwrap();

    for n in 1..=4 {
        Helper::new(HelperId::new(n), "reindeer", reindeer.clone(), task(|_| Ok(())))
            .spawn()
            .unwrap();
    }
    for n in 1..=5 {
        Helper::new(HelperId::new(n), "elves", elves.clone(), task(|_| Ok(())))
            .spawn()
            .unwrap();
    }

    let mut coordinator = Coordinator::new(
        &engine,
        vec![
            Pool::new("reindeer", reindeer.clone()),
            Pool::new("elves", elves.clone()),
        ],
        Duration::ZERO,
    )
    .unwrap();
    let escorts = coordinator.run(12).unwrap();

    assert_eq!(escorts.len(), 12);
    for pool in 0..2 {
        let generations: Vec<u64> = escorts
            .iter()
            .filter(|e| e.pool == pool)
            .map(|e| e.ticket.generation())
            .collect();
        let expected: Vec<u64> = (0..generations.len() as u64).collect();
        assert_eq!(generations, expected);
    }
}

// ============================================================================
// Failure
// ============================================================================

#[test]
fn failed_task_does_not_wedge_the_coordinator() {
    let engine = TransactionEngine::new();
    let elves = Group::new(&engine, 2).unwrap();

    let failing = Helper::new(
        HelperId::new(1),
        "elves",
        elves.clone(),
        task(|_| Err("sprained wrist".into())),
    );
    let fine = Helper::new(HelperId::new(2), "elves", elves.clone(), task(|_| Ok(())));
    let failing = thread::spawn(move || failing.run_cycle());
    let fine = thread::spawn(move || fine.run_cycle());

    let mut coordinator =
        Coordinator::new(&engine, vec![Pool::new("elves", elves.clone())], Duration::ZERO)
            .unwrap();
    let escort = coordinator.run_cycle().unwrap();

    let err = failing.join().unwrap().unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(fine.join().unwrap().unwrap(), escort.ticket);
    // Only the healthy helper went through the exit gate.
    assert_eq!(escort.ticket.exit_gate().state().remaining(), 1);
}

// ============================================================================
// Simulation
// ============================================================================

#[test]
fn fast_simulation_reports_every_cycle() {
    let config = SimulationConfig {
        cycles: 6,
        ..SimulationConfig::fast()
    };
    let report = Simulation::new(config).unwrap().run().unwrap();

    assert_eq!(report.escorts.len(), 6);
    assert_eq!(report.count("reindeer") + report.count("elves"), 6);
    let json: Vec<String> = report
        .escorts
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect();
    assert!(json[0].starts_with(r#"{"cycle":1,"pool":""#));
}
