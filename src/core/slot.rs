//! Request slots and the values a resumable handler exchanges with the scheduler.

use std::fmt;
use std::os::fd::RawFd;

use serde::{Deserialize, Serialize};

/// Readiness direction a slot waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interest {
    /// Descriptor has data to read (or the peer hung up).
    Readable,
    /// Descriptor accepts writes.
    Writable,
}

/// Terminal result of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Finished; carries the response size.
    Success(u64),
    /// Failed; carries an errno-style code.
    Error(i32),
}

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    /// Unoccupied.
    Idle,
    /// Occupied; runnable or waiting on I/O or a timer.
    Running,
    /// Suspended until an external broadcast/unpause.
    Paused,
    /// Finished; must be released before it can be reused.
    Done(Outcome),
}

impl SlotStatus {
    /// Short name used in errors and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Done(_) => "done",
        }
    }

    /// Whether this is a terminal status.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable index-based handle to a slot in a [`SlotPool`](crate::core::SlotPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotHandle(pub(crate) usize);

impl SlotHandle {
    /// Position of the slot in the pool.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// What a handler wants to happen after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The unit of work is finished.
    Complete(Outcome),
    /// Suspend until `fd` is ready for `interest`.
    ///
    /// `timeout: None` applies the scheduler's default timeout; `Some(0)`
    /// expires on the next expiry sweep.
    WaitFor {
        /// Descriptor to watch.
        fd: RawFd,
        /// Direction to watch for.
        interest: Interest,
        /// Seconds before the wait is abandoned.
        timeout: Option<u64>,
    },
    /// Suspend for the given number of seconds.
    WaitTimeout(u64),
    /// Stay runnable; resume again on the next pass.
    Yield,
    /// Suspend until [`unpause_all`](crate::core::SlotPool::unpause_all).
    Pause,
}

/// One unit of pool capacity.
///
/// `R` is the per-request state owned by the application (connection,
/// parser state, ...).
#[derive(Debug)]
pub struct Slot<R> {
    pub(crate) status: SlotStatus,
    pub(crate) waiting_fd: Option<RawFd>,
    pub(crate) waiting_interest: Interest,
    pub(crate) monitored: bool,
    pub(crate) deadline: Option<u64>,
    pub(crate) deadline_expired: bool,
    pub(crate) output_fd: Option<RawFd>,
    pub(crate) bytes_emitted: u64,
    pub(crate) request: Option<R>,
}

impl<R> Default for Slot<R> {
    fn default() -> Self {
        Self {
            status: SlotStatus::Idle,
            waiting_fd: None,
            waiting_interest: Interest::Readable,
            monitored: false,
            deadline: None,
            deadline_expired: false,
            output_fd: None,
            bytes_emitted: 0,
            request: None,
        }
    }
}

impl<R> Slot<R> {
    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SlotStatus {
        self.status
    }

    /// Descriptor the slot is blocked on.
    #[must_use]
    pub const fn waiting_fd(&self) -> Option<RawFd> {
        self.waiting_fd
    }

    /// Direction requested for [`waiting_fd`](Self::waiting_fd).
    #[must_use]
    pub const fn waiting_interest(&self) -> Interest {
        self.waiting_interest
    }

    /// Whether the waiting descriptor is registered with the multiplexer.
    #[must_use]
    pub const fn is_monitored(&self) -> bool {
        self.monitored
    }

    /// Absolute deadline in clock seconds.
    #[must_use]
    pub const fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Set when the last wait ended because its deadline passed.
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.deadline_expired
    }

    /// Descriptor used for broadcast writes.
    #[must_use]
    pub const fn output_fd(&self) -> Option<RawFd> {
        self.output_fd
    }

    /// Replace the broadcast output descriptor.
    pub fn set_output_fd(&mut self, fd: RawFd) {
        self.output_fd = Some(fd);
    }

    /// Bytes written to the output descriptor so far.
    #[must_use]
    pub const fn bytes_emitted(&self) -> u64 {
        self.bytes_emitted
    }

    /// Account bytes the handler wrote itself.
    pub fn add_bytes_emitted(&mut self, n: u64) {
        self.bytes_emitted = self.bytes_emitted.saturating_add(n);
    }

    /// Application state of the current request.
    #[must_use]
    pub const fn request(&self) -> Option<&R> {
        self.request.as_ref()
    }

    /// Mutable application state of the current request.
    pub fn request_mut(&mut self) -> Option<&mut R> {
        self.request.as_mut()
    }

    /// Runnable: running, not blocked on a descriptor, no pending deadline.
    #[must_use]
    pub const fn is_runnable(&self) -> bool {
        matches!(self.status, SlotStatus::Running)
            && self.waiting_fd.is_none()
            && self.deadline.is_none()
    }

    pub(crate) fn start(fd: RawFd, request: R) -> Self {
        Self {
            status: SlotStatus::Running,
            output_fd: Some(fd),
            request: Some(request),
            ..Self::default()
        }
    }

    pub(crate) fn clear_wait(&mut self) {
        self.waiting_fd = None;
        self.monitored = false;
    }
}
