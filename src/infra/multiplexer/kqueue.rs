//! Kernel event queue backend (`kqueue`).

use std::io;
use std::os::fd::RawFd;

use nix::sys::event::{EventFilter, EventFlag, FilterFlag, KEvent, Kqueue};

use crate::core::{Interest, SchedulerError};

use super::{already_removed, Backend, Events, Multiplexer};

/// `kqueue` instance plus its native event buffer.
pub struct KqueueMultiplexer {
    kq: Kqueue,
    buffer: Vec<KEvent>,
}

const fn filter(interest: Interest) -> EventFilter {
    match interest {
        Interest::Readable => EventFilter::EVFILT_READ,
        Interest::Writable => EventFilter::EVFILT_WRITE,
    }
}

const fn opposite(interest: Interest) -> Interest {
    match interest {
        Interest::Readable => Interest::Writable,
        Interest::Writable => Interest::Readable,
    }
}

fn change(fd: RawFd, interest: Interest, flags: EventFlag) -> KEvent {
    KEvent::new(
        fd as libc::uintptr_t,
        filter(interest),
        flags,
        FilterFlag::empty(),
        0,
        0,
    )
}

impl KqueueMultiplexer {
    /// Create the queue and watch `listen_fd` for reads.
    pub fn new(listen_fd: RawFd, max_events: usize) -> Result<Self, SchedulerError> {
        let kq = Kqueue::new().map_err(|e| SchedulerError::Init(io::Error::from(e)))?;
        let empty = change(0, Interest::Readable, EventFlag::empty());
        let mux = Self {
            kq,
            buffer: vec![empty; max_events.max(1)],
        };
        mux.apply(&[change(listen_fd, Interest::Readable, EventFlag::EV_ADD)])
            .map_err(SchedulerError::Init)?;
        Ok(mux)
    }

    fn apply(&self, changes: &[KEvent]) -> io::Result<()> {
        self.kq
            .kevent(changes, &mut [], None)
            .map(|_| ())
            .map_err(io::Error::from)
    }
}

impl Multiplexer for KqueueMultiplexer {
    fn backend(&self) -> Backend {
        Backend::Kqueue
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        self.apply(&[change(fd, interest, EventFlag::EV_ADD)])
            .map_err(|source| SchedulerError::Registration { fd, source })
    }

    /// Read and write are separate filters here, so the filter for the other
    /// direction is deleted before the requested one is armed; an event for
    /// the old interest can never fire after the change.
    fn update(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        match self.apply(&[change(fd, opposite(interest), EventFlag::EV_DELETE)]) {
            Err(source) if !already_removed(&source) => {
                return Err(SchedulerError::Registration { fd, source });
            }
            _ => {}
        }
        self.apply(&[change(fd, interest, EventFlag::EV_ADD | EventFlag::EV_ENABLE)])
            .map_err(|source| SchedulerError::Registration { fd, source })
    }

    fn deregister(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        match self.apply(&[change(fd, interest, EventFlag::EV_DELETE)]) {
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
        let timeout = if timeout_secs == 0 && block {
            None
        } else {
            Some(libc::timespec {
                tv_sec: libc::time_t::try_from(timeout_secs).unwrap_or(libc::time_t::MAX),
                tv_nsec: 0,
            })
        };
        let max = events.capacity().min(self.buffer.len()).max(1);
        let n = self
            .kq
            .kevent(&[], &mut self.buffer[..max], timeout)
            .map_err(|e| SchedulerError::Wait(io::Error::from(e)))?;
        for event in &self.buffer[..n] {
            let interest = match event.filter() {
                Ok(EventFilter::EVFILT_WRITE) => Interest::Writable,
                _ => Interest::Readable,
            };
            events.push(event.ident() as RawFd, interest);
        }
        Ok(events.len())
    }
}
