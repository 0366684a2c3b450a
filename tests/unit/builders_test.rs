//! Tests for builder modules

use prometheus_slot_scheduler::builders::SchedulerBuilder;
use prometheus_slot_scheduler::config::{BackendConfig, SchedulerConfig};
use prometheus_slot_scheduler::core::{Outcome, SchedulerError, Slot, SlotHandle, Step};
use prometheus_slot_scheduler::infra::Backend;
use prometheus_slot_scheduler::util::ManualClock;

fn done(_h: SlotHandle, _s: &mut Slot<u8>) -> Step {
    Step::Complete(Outcome::Success(1))
}

#[test]
fn test_builder_keeps_config() {
    let config = SchedulerConfig {
        slots: 4,
        ..SchedulerConfig::default()
    };
    let builder = SchedulerBuilder::new(config.clone());
    assert_eq!(builder.config(), &config);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let builder = SchedulerBuilder::new(SchedulerConfig {
        max_events: 0,
        backend: BackendConfig::InMemory,
        ..SchedulerConfig::default()
    });
    let result = builder.build::<u8, _>(3, done);
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}

#[test]
fn test_builder_applies_slots_and_timeout() {
    let builder = SchedulerBuilder::new(SchedulerConfig {
        slots: 3,
        default_timeout_secs: 9,
        backend: BackendConfig::InMemory,
        ..SchedulerConfig::default()
    });
    let clock = ManualClock::new(50);
    let mut sched = builder.build_with_clock::<u8, _, _>(3, done, clock).unwrap();
    assert_eq!(sched.multiplexer().backend(), Backend::InMemory);
    assert_eq!(sched.stats().capacity, 3);
    assert_eq!(sched.stats().idle, 3);

    let h = sched.admit(10, 0).unwrap();
    assert_eq!(sched.run_pass(), Some(h));
}

#[cfg(target_os = "linux")]
#[test]
fn test_builder_opens_native_backend() {
    let builder = SchedulerBuilder::new(SchedulerConfig {
        backend: BackendConfig::Auto,
        ..SchedulerConfig::default()
    });
    let sched = builder.build::<u8, _>(-1, done);
    // The listening descriptor must be valid for the native backend.
    assert!(matches!(sched, Err(SchedulerError::Init(_))));
}

#[cfg(target_os = "linux")]
#[test]
fn test_builder_refuses_foreign_backend() {
    let builder = SchedulerBuilder::new(SchedulerConfig {
        backend: BackendConfig::Kqueue,
        ..SchedulerConfig::default()
    });
    assert!(matches!(
        builder.build::<u8, _>(0, done),
        Err(SchedulerError::Unsupported(_))
    ));
}
