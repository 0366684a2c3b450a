//! In-memory multiplexer for development and testing.
//!
//! Nothing here touches the OS: readiness is injected with
//! [`InMemoryMultiplexer::push_ready`] and waits never block.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::os::fd::RawFd;

use crate::core::{Interest, SchedulerError};

use super::{Backend, Events, Multiplexer, Readiness};

/// Watch table kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMultiplexer {
    listen_fd: RawFd,
    watched: HashMap<RawFd, Interest>,
    pending: VecDeque<Readiness>,
    rejected: HashSet<RawFd>,
    registrations: usize,
    interrupt_next: bool,
}

impl InMemoryMultiplexer {
    /// New table watching `listen_fd` for reads.
    #[must_use]
    pub fn new(listen_fd: RawFd) -> Self {
        let mut watched = HashMap::new();
        watched.insert(listen_fd, Interest::Readable);
        Self {
            listen_fd,
            watched,
            ..Self::default()
        }
    }

    /// Queue a readiness event for the next wait. Events for descriptors that
    /// are not watched by then are dropped.
    pub fn push_ready(&mut self, fd: RawFd, interest: Interest) {
        self.pending.push_back(Readiness { fd, interest });
    }

    /// Make every future registration of `fd` fail with `EBADF`.
    pub fn reject(&mut self, fd: RawFd) {
        self.rejected.insert(fd);
    }

    /// Fail the next wait with `EINTR`.
    pub fn interrupt_next_wait(&mut self) {
        self.interrupt_next = true;
    }

    /// Whether `fd` is currently watched.
    #[must_use]
    pub fn is_watched(&self, fd: RawFd) -> bool {
        self.watched.contains_key(&fd)
    }

    /// Direction watched for `fd`.
    #[must_use]
    pub fn watched_interest(&self, fd: RawFd) -> Option<Interest> {
        self.watched.get(&fd).copied()
    }

    /// Watched descriptors, the listening one excluded.
    #[must_use]
    pub fn watched_len(&self) -> usize {
        self.watched.len() - usize::from(self.watched.contains_key(&self.listen_fd))
    }

    /// Successful `register` calls so far.
    #[must_use]
    pub const fn registrations(&self) -> usize {
        self.registrations
    }
}

impl Multiplexer for InMemoryMultiplexer {
    fn backend(&self) -> Backend {
        Backend::InMemory
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        if self.rejected.contains(&fd) {
            return Err(SchedulerError::Registration {
                fd,
                source: io::Error::from_raw_os_error(libc::EBADF),
            });
        }
        if self.watched.contains_key(&fd) {
            return Err(SchedulerError::Registration {
                fd,
                source: io::Error::from_raw_os_error(libc::EEXIST),
            });
        }
        self.watched.insert(fd, interest);
        self.registrations += 1;
        Ok(())
    }

    fn update(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
        match self.watched.get_mut(&fd) {
            Some(current) => {
                *current = interest;
                Ok(())
            }
            None => Err(SchedulerError::Registration {
                fd,
                source: io::Error::from_raw_os_error(libc::ENOENT),
            }),
        }
    }

    fn deregister(&mut self, fd: RawFd, _interest: Interest) -> Result<(), SchedulerError> {
        self.watched.remove(&fd);
        Ok(())
    }

    fn wait(
        &mut self,
        events: &mut Events,
        _block: bool,
        _timeout_secs: u64,
    ) -> Result<usize, SchedulerError> {
        events.clear();
        if std::mem::take(&mut self.interrupt_next) {
            return Err(SchedulerError::Wait(io::Error::from(io::ErrorKind::Interrupted)));
        }
        while events.len() < events.capacity() {
            let Some(ready) = self.pending.pop_front() else {
                break;
            };
            if self.watched.get(&ready.fd) == Some(&ready.interest) {
                events.push(ready.fd, ready.interest);
            }
        }
        Ok(events.len())
    }
}
