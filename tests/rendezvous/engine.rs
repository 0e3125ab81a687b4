//! Transaction engine tests
//!
//! Atomicity under contention, retry wakeups and forked transactions.

use crate::common::*;
use std::sync::Barrier;

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn concurrent_transfers_preserve_total() {
    let engine = TransactionEngine::new();
    let accounts: Vec<TVar<i64>> = (0..4).map(|_| TVar::new(&engine, 100)).collect();
    let threads = 8;
    let transfers = 200;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let engine = engine.clone();
            let accounts = accounts.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..transfers {
                    let from = &accounts[(t + i) % accounts.len()];
                    let to = &accounts[(t + i + 1) % accounts.len()];
                    engine
                        .atomically(|tx| {
                            let amount = 1 + (i as i64 % 5);
                            tx.modify(from, |v| v - amount);
                            tx.modify(to, |v| v + amount);
                            Outcome::Commit(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let total: i64 = engine.read_only(|tx| accounts.iter().map(|a| tx.read(a)).sum());
    assert_eq!(total, 400);
}

#[test]
fn counter_has_no_lost_updates() {
    let engine = TransactionEngine::new();
    let counter = TVar::new(&engine, 0u64);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = engine.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    engine
                        .atomically(|tx| {
                            tx.modify(&counter, |n| n + 1);
                            Outcome::Commit(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(counter.load(&engine), 3000);
    assert!(engine.stats().commits >= 3000);
}

#[test]
fn abort_discards_writes() {
    let engine = TransactionEngine::new();
    let a = TVar::new(&engine, 1);
    let b = TVar::new(&engine, 2);

    let result: Result<()> = engine.atomically(|tx| {
        tx.write(&a, 10);
        tx.write(&b, 20);
        Outcome::Abort(Error::InvalidState("changed my mind".into()))
    });

    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert_eq!(a.load(&engine), 1);
    assert_eq!(b.load(&engine), 2);
    assert_eq!(engine.stats().aborts, 1);
}

// ============================================================================
// Retry
// ============================================================================

#[test]
fn retry_sleeps_until_a_read_cell_changes() {
    let engine = TransactionEngine::new();
    let flag = TVar::new(&engine, false);

    let waiter = {
        let engine = engine.clone();
        let flag = flag.clone();
        thread::spawn(move || {
            engine.atomically(|tx| {
                if tx.read(&flag) {
                    Outcome::Commit("seen")
                } else {
                    Outcome::Retry
                }
            })
        })
    };

    wait_parked(&flag, 1);
    let retries_before = engine.stats().retries;
    thread::sleep(Duration::from_millis(20));
    assert_eq!(
        engine.stats().retries,
        retries_before,
        "a parked transaction must not re-run without a commit"
    );

    engine
        .atomically(|tx| {
            tx.write(&flag, true);
            Outcome::Commit(())
        })
        .unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), "seen");
    assert_eq!(flag.parked(), 0);
    assert!(engine.stats().wakeups >= 1);
}

#[test]
fn retry_without_reads_is_an_error() {
    let engine = TransactionEngine::new();
    let result: Result<()> = engine.atomically(|_| Outcome::Retry);
    assert!(matches!(result, Err(Error::Internal(_))));
}

// ============================================================================
// Forks
// ============================================================================

#[test]
fn fork_and_run_resolves_every_body() {
    let engine = TransactionEngine::new();
    let counter = TVar::new(&engine, 0u32);

    let bodies: Vec<_> = (0..5)
        .map(|_| {
            let counter = counter.clone();
            move |tx: &mut Transaction<'_>| {
                let n = tx.read(&counter) + 1;
                tx.write(&counter, n);
                Outcome::Commit(n)
            }
        })
        .collect();

    let mut results: Vec<u32> = engine
        .fork_and_run(bodies)
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    results.sort_unstable();

    assert_eq!(results, vec![1, 2, 3, 4, 5]);
    assert_eq!(counter.load(&engine), 5);
}

#[test]
fn shared_signal_wakes_on_any_fork() {
    let engine = TransactionEngine::new();
    let left = TVar::new(&engine, None::<u8>);
    let right = TVar::new(&engine, None::<u8>);
    let signal = ReadySignal::new();

    let watch = |var: &TVar<Option<u8>>| {
        let var = var.clone();
        engine.fork_into(&signal, move |tx| match tx.read(&var) {
            Some(v) => Outcome::Commit(v),
            None => Outcome::Retry,
        })
    };
    let mut forks = vec![watch(&left), watch(&right)];

    engine
        .atomically(|tx| {
            tx.write(&right, Some(7));
            Outcome::Commit(())
        })
        .unwrap();

    signal.wait_until(|| forks.iter_mut().any(|f| f.is_ready()));
    assert!(!forks[0].is_ready());
    let right_fork = forks.pop().unwrap();
    assert_eq!(right_fork.join().unwrap(), 7);
}
