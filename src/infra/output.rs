//! Raw descriptor output for broadcasts.
#![allow(unsafe_code)]

use std::io;
use std::os::fd::RawFd;

use crate::core::OutputWriter;

/// Issues one `write(2)` per call; partial writes are returned as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct FdWriter;

impl OutputWriter for FdWriter {
    fn write(&mut self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        loop {
            // SAFETY: `buf` is valid for `buf.len()` bytes; a stale or closed
            // descriptor only yields an error.
            let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}
