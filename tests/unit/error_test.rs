//! Tests for error types

use std::io;

use prometheus_slot_scheduler::core::SchedulerError;

#[test]
fn test_registration_error_display() {
    let err = SchedulerError::Registration {
        fd: 12,
        source: io::Error::from_raw_os_error(libc::EBADF),
    };
    assert!(format!("{}", err).starts_with("cannot watch fd 12: "));
    assert_eq!(err.raw_os_error(), Some(libc::EBADF));
}

#[test]
fn test_unknown_slot_error() {
    let err = SchedulerError::UnknownSlot(7);
    assert_eq!(format!("{}", err), "unknown slot 7");
    assert_eq!(err.raw_os_error(), None);
}

#[test]
fn test_invalid_state_error() {
    let err = SchedulerError::InvalidState {
        index: 2,
        found: "running",
        expected: "done",
    };
    assert_eq!(format!("{}", err), "slot 2 is running, expected done");
}

#[test]
fn test_config_error() {
    let err = SchedulerError::Config("slots must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "config invalid: slots must be greater than 0"
    );
}

#[test]
fn test_only_interrupted_wait_is_transient() {
    let interrupted = SchedulerError::Wait(io::Error::from(io::ErrorKind::Interrupted));
    assert!(interrupted.is_transient());

    let broken = SchedulerError::Wait(io::Error::from_raw_os_error(libc::EBADF));
    assert!(!broken.is_transient());

    let init = SchedulerError::Init(io::Error::from(io::ErrorKind::Interrupted));
    assert!(!init.is_transient());
}

#[test]
fn test_unsupported_backend_error() {
    let err = SchedulerError::Unsupported("kqueue");
    assert_eq!(
        format!("{}", err),
        "backend kqueue is not available on this platform"
    );
}
