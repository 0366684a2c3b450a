//! Tests for utility functions

use prometheus_slot_scheduler::util::{now_secs, Clock, ManualClock, SystemClock};

#[test]
fn test_wall_clock_is_monotone_in_seconds() {
    let secs = now_secs();
    assert!(secs > 0);
    assert!(SystemClock.now() >= secs);
}

#[test]
fn test_manual_clock_clones_share_time() {
    let clock = ManualClock::new(100);
    let shared = clock.clone();
    clock.advance(5);
    assert_eq!(shared.now(), 105);
    shared.set(7);
    assert_eq!(clock.now(), 7);
}

#[test]
fn test_manual_clock_saturates() {
    let clock = ManualClock::new(u64::MAX - 1);
    clock.advance(10);
    assert_eq!(clock.now(), u64::MAX);
}

#[test]
fn test_tracing_init_is_idempotent() {
    prometheus_slot_scheduler::util::init_tracing();
    prometheus_slot_scheduler::util::init_tracing_with("debug");
}
