//! Device-file poll table backend (`/dev/poll`).
//!
//! The poll device is driven by writing `struct pollfd` records to it. There
//! is no modify or delete call: writing a record for a descriptor that is
//! already in the table replaces it, and writing one with `POLLREMOVE` drops
//! it. [`DevPollChanges`] produces those records for any writer so the table
//! semantics do not depend on the platform.
#![cfg_attr(any(target_os = "solaris", target_os = "illumos"), allow(unsafe_code))]

use std::io::{self, Write};
use std::os::fd::RawFd;

use crate::core::Interest;

/// Read readiness.
pub const POLLIN: i16 = 0x0001;
/// Write readiness.
pub const POLLOUT: i16 = 0x0004;
/// Error condition (reported only).
pub const POLLERR: i16 = 0x0008;
/// Hangup (reported only).
pub const POLLHUP: i16 = 0x0010;
/// Marker that removes a descriptor from the poll table.
pub const POLLREMOVE: i16 = 0x0800;

/// Size of one `struct pollfd` record.
pub const RECORD_LEN: usize = 8;

/// Native poll mask for a direction.
#[must_use]
pub const fn events_of(interest: Interest) -> i16 {
    match interest {
        Interest::Readable => POLLIN,
        Interest::Writable => POLLOUT,
    }
}

/// Direction reported by a returned `revents` mask.
#[must_use]
pub const fn interest_of(revents: i16) -> Interest {
    if revents & POLLOUT != 0 && revents & (POLLIN | POLLERR | POLLHUP) == 0 {
        Interest::Writable
    } else {
        Interest::Readable
    }
}

/// Encode one `struct pollfd { int fd; short events; short revents; }`.
#[must_use]
pub fn encode(fd: RawFd, events: i16) -> [u8; RECORD_LEN] {
    let mut record = [0u8; RECORD_LEN];
    record[..4].copy_from_slice(&fd.to_ne_bytes());
    record[4..6].copy_from_slice(&events.to_ne_bytes());
    record
}

/// Decode a record produced by [`encode`] into `(fd, events, revents)`.
#[must_use]
pub fn decode(record: [u8; RECORD_LEN]) -> (RawFd, i16, i16) {
    let fd = RawFd::from_ne_bytes([record[0], record[1], record[2], record[3]]);
    let events = i16::from_ne_bytes([record[4], record[5]]);
    let revents = i16::from_ne_bytes([record[6], record[7]]);
    (fd, events, revents)
}

/// Writes poll-table changes to a device (or any writer).
#[derive(Debug)]
pub struct DevPollChanges<W> {
    device: W,
}

impl<W: Write> DevPollChanges<W> {
    /// Wrap the poll device.
    pub const fn new(device: W) -> Self {
        Self { device }
    }

    /// Add `fd` to the table.
    pub fn add(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.device.write_all(&encode(fd, events_of(interest)))
    }

    /// Replace the watched direction; the last record for a descriptor wins.
    pub fn modify(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.add(fd, interest)
    }

    /// Drop `fd` from the table.
    pub fn remove(&mut self, fd: RawFd) -> io::Result<()> {
        self.device.write_all(&encode(fd, POLLREMOVE))
    }

    /// Underlying device.
    pub const fn device(&self) -> &W {
        &self.device
    }
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub use self::native::DevPollMultiplexer;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
mod native {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::fd::{AsRawFd, RawFd};

    use crate::core::{Interest, SchedulerError};
    use crate::infra::multiplexer::{
        already_removed, timeout_millis, Backend, Events, Multiplexer,
    };

    use super::{interest_of, DevPollChanges};

    const DP_POLL: libc::c_int = (0xD0 << 8) | 1;

    #[repr(C)]
    struct DvPoll {
        dp_fds: *mut libc::pollfd,
        dp_nfds: libc::c_int,
        dp_timeout: libc::c_int,
    }

    /// `/dev/poll` handle plus its native event buffer.
    pub struct DevPollMultiplexer {
        changes: DevPollChanges<File>,
        buffer: Vec<libc::pollfd>,
    }

    impl DevPollMultiplexer {
        /// Open the poll device and watch `listen_fd` for reads.
        pub fn new(listen_fd: RawFd, max_events: usize) -> Result<Self, SchedulerError> {
            let device = OpenOptions::new()
                .read(true)
                .write(true)
                .open("/dev/poll")
                .map_err(SchedulerError::Init)?;
            let mut changes = DevPollChanges::new(device);
            changes
                .add(listen_fd, Interest::Readable)
                .map_err(SchedulerError::Init)?;
            Ok(Self {
                changes,
                buffer: vec![
                    libc::pollfd {
                        fd: -1,
                        events: 0,
                        revents: 0,
                    };
                    max_events.max(1)
                ],
            })
        }
    }

    impl Multiplexer for DevPollMultiplexer {
        fn backend(&self) -> Backend {
            Backend::DevPoll
        }

        fn register(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
            self.changes
                .add(fd, interest)
                .map_err(|source| SchedulerError::Registration { fd, source })
        }

        fn update(&mut self, fd: RawFd, interest: Interest) -> Result<(), SchedulerError> {
            self.changes
                .modify(fd, interest)
                .map_err(|source| SchedulerError::Registration { fd, source })
        }

        fn deregister(&mut self, fd: RawFd, _interest: Interest) -> Result<(), SchedulerError> {
            match self.changes.remove(fd) {
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
            let mut request = DvPoll {
                dp_fds: self.buffer.as_mut_ptr(),
                dp_nfds: libc::c_int::try_from(max).unwrap_or(libc::c_int::MAX),
                dp_timeout: timeout_millis(block, timeout_secs),
            };
            let device = self.changes.device().as_raw_fd();
            // SAFETY: `request` points into a buffer of at least `dp_nfds` entries.
            let n = unsafe { libc::ioctl(device, DP_POLL, &mut request) };
            if n < 0 {
                return Err(SchedulerError::Wait(io::Error::last_os_error()));
            }
            for entry in &self.buffer[..n as usize] {
                events.push(entry.fd, interest_of(entry.revents));
            }
            Ok(events.len())
        }
    }
}
