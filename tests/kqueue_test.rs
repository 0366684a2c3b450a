//! Kernel event queue backend against real sockets.
#![cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]

use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};

use prometheus_slot_scheduler::core::{Interest, SchedulerError};
use prometheus_slot_scheduler::infra::multiplexer::kqueue::KqueueMultiplexer;
use prometheus_slot_scheduler::infra::{Backend, Events, Multiplexer, Readiness};

fn listener() -> (UnixListener, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!(
        "slot-scheduler-kq-{}-{}.sock",
        std::process::id(),
        rand::random::<u64>()
    ));
    let listener = UnixListener::bind(&path).unwrap();
    (listener, path)
}

fn ready(mux: &mut KqueueMultiplexer, events: &mut Events) -> Vec<Readiness> {
    mux.wait(events, false, 0).unwrap();
    events.iter().copied().collect()
}

#[test]
fn test_register_update_deregister() {
    let (listener, path) = listener();
    let mut mux = KqueueMultiplexer::new(listener.as_raw_fd(), 4).unwrap();
    assert_eq!(mux.backend(), Backend::Kqueue);
    let (ours, mut theirs) = UnixStream::pair().unwrap();
    let fd = ours.as_raw_fd();
    let mut events = Events::with_capacity(4);

    mux.register(fd, Interest::Readable).unwrap();
    assert!(ready(&mut mux, &mut events).is_empty());

    // Pending input must not be reported once the descriptor watches writes.
    theirs.write_all(b"x").unwrap();
    mux.update(fd, Interest::Writable).unwrap();
    assert_eq!(
        ready(&mut mux, &mut events),
        vec![Readiness { fd, interest: Interest::Writable }]
    );

    mux.update(fd, Interest::Readable).unwrap();
    assert_eq!(
        ready(&mut mux, &mut events),
        vec![Readiness { fd, interest: Interest::Readable }]
    );

    mux.deregister(fd, Interest::Readable).unwrap();
    assert!(ready(&mut mux, &mut events).is_empty());
    std::fs::remove_file(path).ok();
}

#[test]
fn test_deregister_after_close_is_ok() {
    let (listener, path) = listener();
    let mut mux = KqueueMultiplexer::new(listener.as_raw_fd(), 4).unwrap();
    let (ours, _theirs) = UnixStream::pair().unwrap();
    let fd = ours.as_raw_fd();
    mux.register(fd, Interest::Writable).unwrap();
    drop(ours);
    assert!(mux.deregister(fd, Interest::Writable).is_ok());
    std::fs::remove_file(path).ok();
}

#[test]
fn test_register_invalid_fd_fails() {
    let (listener, path) = listener();
    let mut mux = KqueueMultiplexer::new(listener.as_raw_fd(), 4).unwrap();
    let err = mux.register(1_000_000, Interest::Readable).unwrap_err();
    assert!(matches!(err, SchedulerError::Registration { fd: 1_000_000, .. }));
    std::fs::remove_file(path).ok();
}
