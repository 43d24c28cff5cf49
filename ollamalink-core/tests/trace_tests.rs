//! Audit trail semantics under sequential and concurrent use

use ollamalink_core::{Direction, TraceBuffer};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

#[test]
fn snapshot_and_clear_returns_the_pre_call_trail() {
    let trace = TraceBuffer::new();
    trace.record(Direction::Outbound, "/api/generate", "{\"a\":1}");
    trace.record(Direction::Inbound, "/api/generate", "{\"b\":2}");

    let taken = trace.snapshot(true);
    assert_eq!(taken.len(), 2);
    assert_eq!(taken[0].json, "{\"a\":1}");
    assert!(trace.snapshot(false).is_empty());
}

#[test]
fn clear_before_keeps_entries_at_or_after_the_cutoff() {
    let trace = TraceBuffer::new();
    trace.record(Direction::Inbound, "/api/chat", "old");
    thread::sleep(Duration::from_millis(20));
    let cutoff = SystemTime::now();
    thread::sleep(Duration::from_millis(20));
    trace.record(Direction::Inbound, "/api/chat", "new");

    trace.clear_before(cutoff);

    let entries = trace.snapshot(false);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].json, "new");
}

#[test]
fn clear_before_preserves_survivor_order() {
    let trace = TraceBuffer::new();
    trace.record(Direction::Inbound, "/api/chat", "old");
    thread::sleep(Duration::from_millis(20));
    let cutoff = SystemTime::now();
    thread::sleep(Duration::from_millis(20));
    for i in 0..5 {
        trace.record(Direction::Inbound, "/api/chat", &format!("{}", i));
    }

    trace.clear_before(cutoff);

    let survivors: Vec<String> = trace
        .snapshot(false)
        .into_iter()
        .map(|e| e.json)
        .collect();
    assert_eq!(survivors, ["0", "1", "2", "3", "4"]);
}

#[test]
fn clear_before_the_far_future_behaves_like_clear() {
    let trace = TraceBuffer::new();
    for _ in 0..3 {
        trace.record(Direction::Inbound, "/api/chat", "{}");
    }
    trace.clear_before(SystemTime::now() + Duration::from_secs(86_400));
    assert!(trace.is_empty());
}

#[test]
fn clear_older_than_drops_only_aged_entries() {
    let trace = TraceBuffer::new();
    trace.record(Direction::Inbound, "/api/chat", "recent");
    trace.clear_older_than(Duration::from_secs(3600));
    assert_eq!(trace.len(), 1);

    thread::sleep(Duration::from_millis(5));
    trace.clear_older_than(Duration::ZERO);
    assert!(trace.is_empty());
}

#[test]
fn concurrent_appends_lose_no_entries() {
    let trace = Arc::new(TraceBuffer::new());
    let mut handles = Vec::new();
    for worker in 0..8 {
        let trace = Arc::clone(&trace);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                trace.record(
                    Direction::Inbound,
                    "/api/chat",
                    &format!("{}-{}", worker, i),
                );
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(trace.len(), 400);
}

#[test]
fn snapshot_and_clear_is_atomic_against_concurrent_appends() {
    let trace = Arc::new(TraceBuffer::new());
    let writer = {
        let trace = Arc::clone(&trace);
        thread::spawn(move || {
            for i in 0..500 {
                trace.record(Direction::Inbound, "/api/chat", &format!("{}", i));
            }
        })
    };

    let mut collected = Vec::new();
    for _ in 0..50 {
        collected.extend(trace.snapshot(true));
        thread::yield_now();
    }
    writer.join().unwrap();
    collected.extend(trace.snapshot(true));

    // Every appended entry ends up in exactly one snapshot.
    assert_eq!(collected.len(), 500);
    let mut seen: Vec<usize> = collected.iter().map(|e| e.json.parse().unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..500).collect::<Vec<_>>());
}

#[test]
fn entries_from_one_caller_stay_in_arrival_order() {
    let trace = TraceBuffer::new();
    for i in 0..10 {
        trace.record(Direction::Inbound, "/api/generate", &format!("{}", i));
    }
    let order: Vec<String> = trace.snapshot(false).into_iter().map(|e| e.json).collect();
    assert_eq!(order, (0..10).map(|i| i.to_string()).collect::<Vec<_>>());
}
