//! Error types for scheduler operations.

use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The readiness resource could not be created or the listening
    /// descriptor could not be watched. Fatal for the worker.
    #[error("multiplexer init failed: {0}")]
    Init(#[source] io::Error),
    /// A descriptor could not be added to (or changed in) the watch set.
    #[error("cannot watch fd {fd}: {source}")]
    Registration {
        /// Descriptor that was rejected.
        fd: RawFd,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The blocking wait failed.
    #[error("wait failed: {0}")]
    Wait(#[source] io::Error),
    /// A broadcast write to one paused slot failed.
    #[error("write to fd {fd} failed: {source}")]
    Write {
        /// Output descriptor of the paused slot.
        fd: RawFd,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Slot handle does not address a slot in this pool.
    #[error("unknown slot {0}")]
    UnknownSlot(usize),
    /// Slot is not in the state the operation requires.
    #[error("slot {index} is {found}, expected {expected}")]
    InvalidState {
        /// Slot index.
        index: usize,
        /// State the slot was found in.
        found: &'static str,
        /// State the operation requires.
        expected: &'static str,
    },
    /// Requested backend is not compiled for this platform.
    #[error("backend {0} is not available on this platform")]
    Unsupported(&'static str),
    /// Configuration rejected during validation.
    #[error("config invalid: {0}")]
    Config(String),
}

impl SchedulerError {
    /// True for failures the caller should simply retry (an interrupted wait).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Wait(e) if e.kind() == io::ErrorKind::Interrupted)
    }

    /// Raw OS error code carried by this error, if any.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Init(e) | Self::Wait(e) => e.raw_os_error(),
            Self::Registration { source, .. } | Self::Write { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
