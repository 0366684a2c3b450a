//! Edge/level readiness queue backend (Linux `epoll`).
#![allow(unsafe_code)]

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::core::{Interest, SchedulerError};

use super::{already_removed, timeout_millis, Backend, Events, Multiplexer};

const READ_MASK: u32 = (libc::EPOLLIN | libc::EPOLLRDHUP) as u32;
const WRITE_MASK: u32 = libc::EPOLLOUT as u32;

/// `epoll` instance plus its native event buffer.
pub struct EpollMultiplexer {
    epfd: OwnedFd,
    buffer: Vec<libc::epoll_event>,
}

impl EpollMultiplexer {
    /// Create the epoll instance and watch `listen_fd` for reads.
    pub fn new(listen_fd: RawFd, max_events: usize) -> Result<Self, SchedulerError> {
        // SAFETY: plain syscall, no pointers involved.
        let raw = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if raw < 0 {
            return Err(SchedulerError::Init(io::Error::last_os_error()));
        }
        // SAFETY: `raw` is a freshly created descriptor nobody else owns.
        let epfd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mux = Self {
            epfd,
            buffer: vec![libc::epoll_event { events: 0, u64: 0 }; max_events.max(1)],
        };
        mux.ctl(libc::EPOLL_CTL_ADD, listen_fd, Interest::Readable)
            .map_err(SchedulerError::Init)?;
        Ok(mux)
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, interest: Interest) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: mask(interest),
            u64: fd as u64,
        };
        // SAFETY: `event` lives for the duration of the call.
        let rc = unsafe { libc::epoll_ctl(self.epfd.as_raw_fd(), op, fd, &mut event) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

const fn mask(interest: Interest) -> u32 {
    match interest {
        Interest::Readable => READ_MASK,
        Interest::Writable => WRITE_MASK,
    }
}

/// Errors and hangups wake readers; pure write readiness wakes writers.
const fn interest_of(flags: u32) -> Interest {
    if flags & WRITE_MASK != 0 && flags & READ_MASK == 0 {
        Interest::Writable
    } else {
        Interest::Readable
    }
}

impl Multiplexer for EpollMultiplexer {
    fn backend(&self) -> Backend {
        Backend::Epoll
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, interest)
            .map_err(|source| SchedulerError::Registration { fd, source })
    }

    fn update(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, interest)
            .map_err(|source| SchedulerError::Registration { fd, source })
    }

    fn deregister(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        match self.ctl(libc::EPOLL_CTL_DEL, fd, interest) {
            Err(source) if !already_removed(&source) => {
                Err(SchedulerError::Registration { fd, source })
            }
            _ => Ok(()),
        }
    }

    fn wait(
        &mut self,
        events: &mut Events,
        block: bool,
        timeout_secs: u64,
    ) -> Result<usize, SchedulerError> {
        events.clear();
        let max = events.capacity().min(self.buffer.len()).max(1);
        let max = libc::c_int::try_from(max).unwrap_or(libc::c_int::MAX);
        // SAFETY: the buffer holds at least `max` initialized entries.
        let n = unsafe {
            libc::epoll_wait(
                self.epfd.as_raw_fd(),
                self.buffer.as_mut_ptr(),
                max,
                timeout_millis(block, timeout_secs),
            )
        };
        if n < 0 {
            return Err(SchedulerError::Wait(io::Error::last_os_error()));
        }
        for event in &self.buffer[..n as usize] {
            let flags = event.events;
            let fd = event.u64 as RawFd;
            events.push(fd, interest_of(flags));
        }
        Ok(events.len())
    }
}
