//! Cooperative scheduler driving the slot pool.
//!
//! A worker loop looks like this:
//!
//! ```rust,ignore
//! let mut events = Events::with_capacity(cfg.max_events);
//! loop {
//!     while let Some(done) = scheduler.run_pass() {
//!         let (outcome, conn) = scheduler.release(done)?;
//!         // close the connection, log the outcome
//!     }
//!     for ready in scheduler.turn(&mut events)? {
//!         // the listening socket is ready: accept and `admit`
//!     }
//! }
//! ```
//!
//! Nothing here blocks except [`Scheduler::turn`], which is the only caller
//! of the multiplexer's wait.

use std::os::fd::RawFd;

use tracing::{debug, error, warn};

use crate::core::{
    BroadcastReport, Outcome, OutputWriter, PoolStats, SchedulerError, Slot, SlotHandle, SlotPool,
    SlotStatus, Step,
};
use crate::infra::{Events, FdWriter, Multiplexer, Readiness};
use crate::util::clock::{Clock, SystemClock};

/// Resumable per-request logic supplied by the protocol/application layer.
///
/// Called only for running slots with no pending descriptor wait and no
/// pending deadline; called again on every resumption until it returns
/// [`Step::Complete`].
pub trait RequestHandler<R> {
    /// Advance the request held in `slot`.
    fn resume(&mut self, handle: SlotHandle, slot: &mut Slot<R>) -> Step;
}

impl<R, F> RequestHandler<R> for F
where
    F: FnMut(SlotHandle, &mut Slot<R>) -> Step,
{
    fn resume(&mut self, handle: SlotHandle, slot: &mut Slot<R>) -> Step {
        self(handle, slot)
    }
}

/// Slot pool, handler, multiplexer and clock of one worker.
pub struct Scheduler<R, H, M, C = SystemClock> {
    pool: SlotPool<R>,
    handler: H,
    mux: M,
    clock: C,
    default_timeout_secs: u64,
    saturated: bool,
}

impl<R, H, M, C> Scheduler<R, H, M, C>
where
    H: RequestHandler<R>,
    M: Multiplexer,
    C: Clock,
{
    /// Scheduler with `capacity` idle slots.
    pub fn new(capacity: usize, handler: H, mux: M, clock: C) -> Self {
        Self {
            pool: SlotPool::new(capacity),
            handler,
            mux,
            clock,
            default_timeout_secs: 0,
            saturated: false,
        }
    }

    /// Timeout applied to descriptor waits that do not carry one; 0 disables it.
    #[must_use]
    pub const fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    /// The slot arena.
    pub const fn pool(&self) -> &SlotPool<R> {
        &self.pool
    }

    /// Borrow one slot.
    pub fn slot(&self, handle: SlotHandle) -> Result<&Slot<R>, SchedulerError> {
        self.pool.get(handle)
    }

    /// Mutably borrow one slot.
    pub fn slot_mut(&mut self, handle: SlotHandle) -> Result<&mut Slot<R>, SchedulerError> {
        self.pool.get_mut(handle)
    }

    /// The multiplexer.
    pub const fn multiplexer(&self) -> &M {
        &self.mux
    }

    /// The multiplexer, mutably.
    pub fn multiplexer_mut(&mut self) -> &mut M {
        &mut self.mux
    }

    /// The clock.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Whether the last admission was refused for lack of an idle slot.
    pub const fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Lowest idle slot, `None` when saturated.
    pub fn find_idle(&self) -> Option<SlotHandle> {
        self.pool.find_idle()
    }

    /// Start a new request on the lowest idle slot. `fd` is the connection and
    /// becomes the slot's output descriptor. On saturation the request is
    /// handed back so the acceptor can defer or reject it.
    pub fn admit(&mut self, fd: RawFd, request: R) -> Result<SlotHandle, R> {
        let Some(handle) = self.pool.find_idle() else {
            if self.saturated {
                debug!("still saturated, deferring connection fd {}", fd);
            } else {
                warn!("all {} slots busy, deferring connections", self.pool.capacity());
                self.saturated = true;
            }
            return Err(request);
        };
        self.saturated = false;
        self.pool.slots[handle.0] = Slot::start(fd, request);
        debug!("admitted fd {} into {}", fd, handle);
        Ok(handle)
    }

    /// Return a finished slot to idle, yielding its outcome and request.
    pub fn release(&mut self, handle: SlotHandle) -> Result<(Outcome, Option<R>), SchedulerError> {
        let slot = self.pool.get_mut(handle)?;
        if let (Some(fd), true, true) = (slot.waiting_fd, slot.monitored, slot.status.is_done()) {
            if let Err(err) = self.mux.deregister(fd, slot.waiting_interest) {
                warn!("{}: {}", handle, err);
            }
            slot.clear_wait();
        }
        let released = self.pool.recycle(handle)?;
        self.saturated = false;
        debug!("released {} ({:?})", handle, released.0);
        Ok(released)
    }

    /// One scan of the pool in index order.
    ///
    /// Registers newly waiting descriptors, resumes runnable slots and returns
    /// the first slot that finishes. A slot whose descriptor cannot be
    /// registered is finished with an error and returned at once; its
    /// descriptor must be closed before anything else touches it.
    pub fn run_pass(&mut self) -> Option<SlotHandle> {
        for index in 0..self.pool.slots.len() {
            let handle = SlotHandle(index);
            let slot = &mut self.pool.slots[index];
            if slot.status != SlotStatus::Running {
                continue;
            }

            if let Some(fd) = slot.waiting_fd {
                if slot.monitored {
                    continue;
                }
                match self.mux.register(fd, slot.waiting_interest) {
                    Ok(()) => {
                        slot.monitored = true;
                        debug!("{} waits on fd {} ({:?})", handle, fd, slot.waiting_interest);
                    }
                    Err(err) => {
                        warn!("{} failed: {}", handle, err);
                        let code = err.raw_os_error().unwrap_or(libc::EIO);
                        slot.clear_wait();
                        slot.deadline = None;
                        slot.status = SlotStatus::Done(Outcome::Error(code));
                        return Some(handle);
                    }
                }
                continue;
            }

            if slot.deadline.is_some() {
                continue;
            }

            let step = self.handler.resume(handle, slot);
            slot.deadline_expired = false;
            if apply_step(slot, step, &self.clock, self.default_timeout_secs) {
                debug!("{} finished: {}", handle, slot.status);
                return Some(handle);
            }
        }
        None
    }

    /// Hand readiness events to the slots waiting for them.
    ///
    /// Each matched slot has its descriptor deregistered and its wait (and
    /// wait deadline) cleared so the next pass resumes it. Events no slot is
    /// waiting for, such as the listening socket, are returned.
    pub fn dispatch(&mut self, events: &Events) -> Vec<Readiness> {
        let mut unclaimed = Vec::new();
        for ready in events.iter() {
            let found = self
                .pool
                .find_by_fd(ready.fd, Some(ready.interest))
                .or_else(|| self.pool.find_by_fd(ready.fd, None));
            let Some(handle) = found else {
                unclaimed.push(*ready);
                continue;
            };
            let slot = &mut self.pool.slots[handle.0];
            if slot.monitored {
                if let Err(err) = self.mux.deregister(ready.fd, slot.waiting_interest) {
                    warn!("{}: {}", handle, err);
                }
            }
            slot.clear_wait();
            slot.deadline = None;
            debug!("fd {} ready, {} runnable", ready.fd, handle);
        }
        unclaimed
    }

    /// Seconds until the nearest pending deadline; 0 when none.
    pub fn soonest_deadline(&self) -> u64 {
        self.pool.soonest_deadline(self.clock.now())
    }

    /// Arm a deadline `secs` from now on a running slot.
    pub fn set_timeout(&mut self, handle: SlotHandle, secs: u64) -> Result<(), SchedulerError> {
        let now = self.clock.now();
        self.pool.set_timeout(handle, secs, now)
    }

    /// Expire passed deadlines. Expired slots also give up their descriptor
    /// wait, so the next pass resumes them with `timed_out()` set.
    pub fn expire_timeouts(&mut self) -> Vec<SlotHandle> {
        let expired = self.pool.expire_deadlines(self.clock.now());
        for handle in &expired {
            let slot = &mut self.pool.slots[handle.0];
            if let Some(fd) = slot.waiting_fd {
                if slot.monitored {
                    if let Err(err) = self.mux.deregister(fd, slot.waiting_interest) {
                        warn!("{}: {}", handle, err);
                    }
                }
                slot.clear_wait();
            }
            debug!("{} timed out", handle);
        }
        expired
    }

    /// One wait/dispatch/expire cycle.
    ///
    /// The wait does not block while a pass has work to do or a deadline is
    /// overdue; otherwise it is bounded by the nearest deadline. Interrupted
    /// waits count as an empty cycle. Returns the unclaimed events.
    pub fn turn(&mut self, events: &mut Events) -> Result<Vec<Readiness>, SchedulerError> {
        let now = self.clock.now();
        let (block, timeout) = if self.pool.has_pending_work() || self.pool.has_overdue(now) {
            (false, 0)
        } else {
            (true, self.pool.soonest_deadline(now))
        };
        match self.mux.wait(events, block, timeout) {
            Ok(n) => debug!("wait returned {} events", n),
            Err(err) if err.is_transient() => {
                debug!("{}, retrying on next turn", err);
                events.clear();
            }
            Err(err) => {
                error!("{}", err);
                return Err(err);
            }
        }
        let unclaimed = self.dispatch(events);
        self.expire_timeouts();
        Ok(unclaimed)
    }

    /// Write `buf` to every paused slot's output descriptor.
    pub fn write_to_paused(&mut self, buf: &[u8]) -> BroadcastReport {
        self.pool.write_to_paused(&mut FdWriter, buf)
    }

    /// [`write_to_paused`](Self::write_to_paused) through a custom writer.
    pub fn write_to_paused_with<W: OutputWriter>(&mut self, writer: &mut W, buf: &[u8]) -> BroadcastReport {
        self.pool.write_to_paused(writer, buf)
    }

    /// Make every paused slot running again.
    pub fn unpause_all(&mut self) -> usize {
        self.pool.unpause_all()
    }
}

/// Record what the handler asked for; true when the slot finished.
fn apply_step<R, C: Clock>(slot: &mut Slot<R>, step: Step, clock: &C, default_timeout: u64) -> bool {
    match step {
        Step::Complete(outcome) => {
            slot.deadline = None;
            slot.status = SlotStatus::Done(outcome);
            true
        }
        Step::WaitFor {
            fd,
            interest,
            timeout,
        } => {
            slot.waiting_fd = Some(fd);
            slot.waiting_interest = interest;
            slot.monitored = false;
            let secs = timeout.or((default_timeout > 0).then_some(default_timeout));
            slot.deadline = secs.map(|s| clock.now().saturating_add(s));
            false
        }
        Step::WaitTimeout(secs) => {
            slot.deadline = Some(clock.now().saturating_add(secs));
            false
        }
        Step::Yield => false,
        Step::Pause => {
            slot.status = SlotStatus::Paused;
            false
        }
    }
}
