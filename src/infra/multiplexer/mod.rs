//! Readiness multiplexer contract and its backends.
//!
//! Each backend owns exactly one kernel readiness resource and watches the
//! worker's listening descriptor from the moment it is created. The scheduler
//! only ever talks to the [`Multiplexer`] trait; backend quirks (the device
//! poll table has no real modify or remove) stay inside the backend.

pub mod devpoll;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod epoll;
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub mod kqueue;
pub mod memory;

use std::io;
use std::os::fd::RawFd;

use crate::config::BackendConfig;
use crate::core::{Interest, SchedulerError};

/// One ready descriptor reported by a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// Ready descriptor.
    pub fd: RawFd,
    /// Direction it is ready for.
    pub interest: Interest,
}

/// Reusable buffer of readiness events, bounded by the batch size.
#[derive(Debug, Clone)]
pub struct Events {
    ready: Vec<Readiness>,
    capacity: usize,
}

impl Events {
    /// Buffer holding at most `capacity` events per wait.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ready: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum events a single wait may report.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events from the last wait.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    /// Whether the last wait reported nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Events in the order the backend reported them.
    pub fn iter(&self) -> impl Iterator<Item = &Readiness> {
        self.ready.iter()
    }

    /// Drop all events.
    pub fn clear(&mut self) {
        self.ready.clear();
    }

    pub(crate) fn push(&mut self, fd: RawFd, interest: Interest) {
        if self.ready.len() < self.capacity {
            self.ready.push(Readiness { fd, interest });
        }
    }
}

/// Native readiness mechanism behind a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Edge/level readiness queue (Linux).
    Epoll,
    /// Device-file poll table (Solaris, illumos).
    DevPoll,
    /// Kernel event queue (BSD, macOS).
    Kqueue,
    /// Process-local backend driven by hand.
    InMemory,
}

impl Backend {
    /// Backend name as used in configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Epoll => "epoll",
            Self::DevPoll => "dev_poll",
            Self::Kqueue => "kqueue",
            Self::InMemory => "in_memory",
        }
    }
}

/// A readiness multiplexer.
pub trait Multiplexer {
    /// Which mechanism this is.
    fn backend(&self) -> Backend;

    /// Start watching `fd` for `interest`.
    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError>;

    /// Change the direction watched for an already registered `fd`.
    fn update(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError>;

    /// Stop watching `fd`. Descriptors the OS already dropped count as removed.
    fn deregister(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError>;

    /// Collect ready descriptors into `events`, at most `events.capacity()`.
    ///
    /// `timeout_secs > 0` bounds the wait; otherwise `block` selects between
    /// waiting indefinitely and returning immediately.
    fn wait(
        &mut self,
        events: &mut Events,
        block: bool,
        timeout_secs: u64,
    ) -> Result<usize, SchedulerError>;
}

impl<M: Multiplexer + ?Sized> Multiplexer for Box<M> {
    fn backend(&self) -> Backend {
        (**self).backend()
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        (**self).register(fd, interest)
    }

    fn update(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        (**self).update(fd, interest)
    }

    fn deregister(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        (**self).deregister(fd, interest)
    }

    fn wait(
        &mut self,
        events: &mut Events,
        block: bool,
        timeout_secs: u64,
    ) -> Result<usize, SchedulerError> {
        (**self).wait(events, block, timeout_secs)
    }
}

/// Millisecond timeout for backends that take one: -1 waits forever.
#[must_use]
pub fn timeout_millis(block: bool, timeout_secs: u64) -> i32 {
    if timeout_secs == 0 {
        return if block { -1 } else { 0 };
    }
    i32::try_from(timeout_secs.saturating_mul(1000)).unwrap_or(i32::MAX)
}

/// Whether a failed removal only means the descriptor is already gone.
pub(crate) fn already_removed(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::EBADF | libc::ENOENT))
}

/// Open the backend selected by `backend`, watching `listen_fd` for reads.
pub fn open(
    backend: &BackendConfig,
    listen_fd: RawFd,
    max_events: usize,
) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    let mux: Box<dyn Multiplexer> = match backend {
        BackendConfig::Auto => open_native(listen_fd, max_events)?,
        BackendConfig::Epoll => open_epoll(listen_fd, max_events)?,
        BackendConfig::Kqueue => open_kqueue(listen_fd, max_events)?,
        BackendConfig::DevPoll => open_devpoll(listen_fd, max_events)?,
        BackendConfig::InMemory => Box::new(memory::InMemoryMultiplexer::new(listen_fd)),
    };
    tracing::info!(
        "opened {} multiplexer watching listen fd {}",
        mux.backend().name(),
        listen_fd
    );
    Ok(mux)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn open_native(listen_fd: RawFd, max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    open_epoll(listen_fd, max_events)
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn open_native(listen_fd: RawFd, max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    open_kqueue(listen_fd, max_events)
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
fn open_native(listen_fd: RawFd, max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    open_devpoll(listen_fd, max_events)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "solaris",
    target_os = "illumos"
)))]
fn open_native(_listen_fd: RawFd, _max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    Err(SchedulerError::Unsupported("native"))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn open_epoll(listen_fd: RawFd, max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    Ok(Box::new(epoll::EpollMultiplexer::new(listen_fd, max_events)?))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn open_epoll(_listen_fd: RawFd, _max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    Err(SchedulerError::Unsupported(Backend::Epoll.name()))
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn open_kqueue(listen_fd: RawFd, max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    Ok(Box::new(kqueue::KqueueMultiplexer::new(listen_fd, max_events)?))
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
fn open_kqueue(_listen_fd: RawFd, _max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    Err(SchedulerError::Unsupported(Backend::Kqueue.name()))
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
fn open_devpoll(listen_fd: RawFd, max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    Ok(Box::new(devpoll::DevPollMultiplexer::new(listen_fd, max_events)?))
}

#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
fn open_devpoll(_listen_fd: RawFd, _max_events: usize) -> Result<Box<dyn Multiplexer>, SchedulerError> {
    Err(SchedulerError::Unsupported(Backend::DevPoll.name()))
}
