// Concurrency coverage for quota admission: many writers over the same
// database file, one enforcer (and connection) per thread, like separate
// request handlers racing on the same backing store.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Local, TimeZone};
use typedrill::clock::FixedClock;
use typedrill::problem::ProblemId;
use typedrill::quota::{QuotaEnforcer, QuotaError, UserId, MAX_DAILY_ATTEMPTS};
use typedrill::result::AttemptResult;
use typedrill::session::DurationBudget;

fn test_clock() -> FixedClock {
    FixedClock(Local.with_ymd_and_hms(2026, 7, 9, 12, 0, 0).unwrap())
}

fn open_enforcer(path: &std::path::Path) -> QuotaEnforcer {
    QuotaEnforcer::open(path)
        .unwrap()
        .with_clock(Box::new(test_clock()))
}

fn a_result() -> AttemptResult {
    AttemptResult::score(120, 5, DurationBudget::Sixty, false)
}

#[test]
fn cap_holds_under_concurrent_attempts_for_one_user() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("attempts.db");
    // schema bootstrap before the contenders pile in
    open_enforcer(&db);

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let mut handles = Vec::new();
    for _ in 0..threads {
        let barrier = Arc::clone(&barrier);
        let db = db.clone();
        handles.push(thread::spawn(move || {
            let mut enforcer = open_enforcer(&db);
            let user = UserId::new("alice");
            let problem = ProblemId::new("coin_change");
            barrier.wait();
            enforcer.try_record_attempt(&user, &problem, &a_result())
        }));
    }

    let mut admitted = 0;
    let mut exceeded = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => admitted += 1,
            Err(QuotaError::Exceeded { used, cap }) => {
                assert_eq!(used, MAX_DAILY_ATTEMPTS);
                assert_eq!(cap, MAX_DAILY_ATTEMPTS);
                exceeded += 1;
            }
            Err(QuotaError::Store(e)) => panic!("store failure under contention: {e}"),
        }
    }

    assert_eq!(admitted, MAX_DAILY_ATTEMPTS);
    assert_eq!(exceeded, threads as u32 - MAX_DAILY_ATTEMPTS);

    let enforcer = open_enforcer(&db);
    let user = UserId::new("alice");
    let status = enforcer.quota_status(&user).unwrap();
    assert_eq!(status.used, MAX_DAILY_ATTEMPTS);
    assert!(!status.can_attempt);
    // every consumed unit has exactly one record behind it
    assert_eq!(
        enforcer
            .attempt_count_for_day(&user, test_clock().0.date_naive())
            .unwrap(),
        MAX_DAILY_ATTEMPTS
    );
}

#[test]
fn racers_for_the_last_slot_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("attempts.db");
    let user = UserId::new("bob");
    let problem = ProblemId::new("climbing_stairs");

    let mut warmup = open_enforcer(&db);
    for _ in 0..MAX_DAILY_ATTEMPTS - 1 {
        warmup.try_record_attempt(&user, &problem, &a_result()).unwrap();
    }

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let barrier = Arc::clone(&barrier);
        let db = db.clone();
        handles.push(thread::spawn(move || {
            let mut enforcer = open_enforcer(&db);
            let user = UserId::new("bob");
            let problem = ProblemId::new("climbing_stairs");
            barrier.wait();
            enforcer.try_record_attempt(&user, &problem, &a_result())
        }));
    }

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let admitted = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(admitted, 1, "exactly one racer may take the final slot");
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(
                matches!(err, QuotaError::Exceeded { .. }),
                "the losing racer must see the cap, not a store failure: {err}"
            );
        }
    }

    let status = warmup.quota_status(&user).unwrap();
    assert_eq!(status.used, MAX_DAILY_ATTEMPTS);
    assert_eq!(status.remaining, 0);
}

#[test]
fn concurrent_users_consume_independent_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("attempts.db");
    open_enforcer(&db);

    let users = ["alice", "bob", "carol"];
    let attempts_per_user = 5;
    let barrier = Arc::new(Barrier::new(users.len() * attempts_per_user));
    let mut handles = Vec::new();
    for user in users {
        for _ in 0..attempts_per_user {
            let barrier = Arc::clone(&barrier);
            let db = db.clone();
            handles.push(thread::spawn(move || {
                let mut enforcer = open_enforcer(&db);
                let user = UserId::new(user);
                let problem = ProblemId::new("number_of_islands");
                barrier.wait();
                enforcer.try_record_attempt(&user, &problem, &a_result())
            }));
        }
    }
    for handle in handles {
        let _ = handle.join().unwrap();
    }

    let enforcer = open_enforcer(&db);
    let day = test_clock().0.date_naive();
    for user in users {
        let user = UserId::new(user);
        let status = enforcer.quota_status(&user).unwrap();
        assert_eq!(status.used, MAX_DAILY_ATTEMPTS, "bucket for {user}");
        assert_eq!(
            enforcer.attempt_count_for_day(&user, day).unwrap(),
            MAX_DAILY_ATTEMPTS
        );
    }
}

#[test]
fn sequential_overflow_leaves_counter_and_ledger_in_step() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("attempts.db");
    let mut enforcer = open_enforcer(&db);
    let user = UserId::new("dave");
    let problem = ProblemId::new("coin_change");

    let outcomes: Vec<bool> = (0..10)
        .map(|_| {
            enforcer
                .try_record_attempt(&user, &problem, &a_result())
                .is_ok()
        })
        .collect();

    // admissions come first, refusals after, never interleaved
    assert_eq!(
        outcomes,
        vec![true, true, true, false, false, false, false, false, false, false]
    );
    let status = enforcer.quota_status(&user).unwrap();
    assert_eq!(status.used, MAX_DAILY_ATTEMPTS);
    assert_eq!(
        enforcer
            .attempt_count_for_day(&user, test_clock().0.date_naive())
            .unwrap(),
        MAX_DAILY_ATTEMPTS
    );
}
