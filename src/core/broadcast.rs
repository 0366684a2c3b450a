//! Fan-out writes to paused slots and their release.

use std::io;
use std::os::fd::RawFd;

use serde::{Deserialize, Serialize};

use crate::core::{SchedulerError, SlotPool, SlotStatus};

/// Sink for broadcast writes.
pub trait OutputWriter {
    /// Write `buf` to `fd` once, returning the number of bytes accepted.
    fn write(&mut self, fd: RawFd, buf: &[u8]) -> io::Result<usize>;
}

impl<F> OutputWriter for F
where
    F: FnMut(RawFd, &[u8]) -> io::Result<usize>,
{
    fn write(&mut self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        self(fd, buf)
    }
}

/// Result of one broadcast.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BroadcastReport {
    /// Paused slots with an output descriptor.
    pub targets: usize,
    /// Targets that accepted at least part of the buffer.
    pub delivered: usize,
    /// Total bytes accepted across targets.
    pub bytes: u64,
    /// Failed targets; one entry per slot.
    #[serde(skip)]
    pub failed: Vec<SchedulerError>,
}

impl<R> SlotPool<R> {
    /// Write `buf` to the output descriptor of every paused slot.
    ///
    /// A failing target is recorded and skipped; it never stops delivery to
    /// the others.
    pub fn write_to_paused<W: OutputWriter>(&mut self, writer: &mut W, buf: &[u8]) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.status != SlotStatus::Paused {
                continue;
            }
            let Some(fd) = slot.output_fd else {
                continue;
            };
            report.targets += 1;
            match writer.write(fd, buf) {
                Ok(n) => {
                    let n = n as u64;
                    slot.bytes_emitted = slot.bytes_emitted.saturating_add(n);
                    report.bytes += n;
                    report.delivered += 1;
                }
                Err(source) => {
                    tracing::warn!("broadcast to slot {} (fd {}) failed: {}", index, fd, source);
                    report.failed.push(SchedulerError::Write { fd, source });
                }
            }
        }
        report
    }

    /// Make every paused slot running again. Returns how many were released.
    pub fn unpause_all(&mut self) -> usize {
        let mut released = 0;
        for slot in &mut self.slots {
            if slot.status == SlotStatus::Paused {
                slot.status = SlotStatus::Running;
                released += 1;
            }
        }
        released
    }
}
