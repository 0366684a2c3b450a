//! Fixed-size slot arena and its lookup helpers.

use std::os::fd::RawFd;

use serde::{Deserialize, Serialize};

use crate::core::{Interest, Outcome, SchedulerError, Slot, SlotHandle, SlotStatus};

/// Snapshot of slot occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Total slots.
    pub capacity: usize,
    /// Unoccupied slots.
    pub idle: usize,
    /// Running slots (runnable or waiting).
    pub running: usize,
    /// Paused slots.
    pub paused: usize,
    /// Finished slots not yet released.
    pub done: usize,
    /// Slots whose waiting descriptor is registered with the multiplexer.
    pub monitored: usize,
}

/// Arena of request slots, allocated once and never resized.
///
/// Slots are addressed by [`SlotHandle`]; every scan walks them in ascending
/// index order, so lower slots are always considered first.
#[derive(Debug)]
pub struct SlotPool<R> {
    pub(crate) slots: Vec<Slot<R>>,
}

impl<R> SlotPool<R> {
    /// Allocate `capacity` idle slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Borrow a slot.
    pub fn get(&self, handle: SlotHandle) -> Result<&Slot<R>, SchedulerError> {
        self.slots
            .get(handle.0)
            .ok_or(SchedulerError::UnknownSlot(handle.0))
    }

    /// Mutably borrow a slot.
    pub fn get_mut(&mut self, handle: SlotHandle) -> Result<&mut Slot<R>, SchedulerError> {
        self.slots
            .get_mut(handle.0)
            .ok_or(SchedulerError::UnknownSlot(handle.0))
    }

    /// Iterate over all slots with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &Slot<R>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (SlotHandle(i), slot))
    }

    /// Lowest-index idle slot, or `None` when the pool is saturated.
    #[must_use]
    pub fn find_idle(&self) -> Option<SlotHandle> {
        self.slots
            .iter()
            .position(|slot| slot.status == SlotStatus::Idle)
            .map(SlotHandle)
    }

    /// Lowest-index slot waiting on `fd`; with `interest` set the requested
    /// direction must match too.
    #[must_use]
    pub fn find_by_fd(&self, fd: RawFd, interest: Option<Interest>) -> Option<SlotHandle> {
        self.slots
            .iter()
            .position(|slot| {
                slot.waiting_fd == Some(fd)
                    && interest.is_none_or(|wanted| slot.waiting_interest == wanted)
            })
            .map(SlotHandle)
    }

    /// Assign a new unit of work to an idle slot. `fd` becomes the slot's
    /// broadcast output descriptor.
    pub fn occupy(
        &mut self,
        handle: SlotHandle,
        fd: RawFd,
        request: R,
    ) -> Result<(), SchedulerError> {
        let slot = self.get_mut(handle)?;
        if slot.status != SlotStatus::Idle {
            return Err(SchedulerError::InvalidState {
                index: handle.0,
                found: slot.status.name(),
                expected: "idle",
            });
        }
        *slot = Slot::start(fd, request);
        Ok(())
    }

    /// Drain a finished slot back to idle, returning its outcome and request.
    ///
    /// The slot must not hold a monitored descriptor; the scheduler
    /// deregisters before calling this.
    pub fn recycle(&mut self, handle: SlotHandle) -> Result<(Outcome, Option<R>), SchedulerError> {
        let slot = self.get_mut(handle)?;
        let SlotStatus::Done(outcome) = slot.status else {
            return Err(SchedulerError::InvalidState {
                index: handle.0,
                found: slot.status.name(),
                expected: "done",
            });
        };
        let request = slot.request.take();
        *slot = Slot::default();
        Ok((outcome, request))
    }

    /// Whether any slot could be resumed without waiting.
    #[must_use]
    pub fn has_runnable(&self) -> bool {
        self.slots.iter().any(Slot::is_runnable)
    }

    /// Whether a scheduler pass has something to do: a runnable slot or a
    /// waiting descriptor that is not registered yet.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.has_runnable()
            || self.slots.iter().any(|slot| {
                slot.status == SlotStatus::Running && slot.waiting_fd.is_some() && !slot.monitored
            })
    }

    /// Occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            capacity: self.slots.len(),
            ..PoolStats::default()
        };
        for slot in &self.slots {
            match slot.status {
                SlotStatus::Idle => stats.idle += 1,
                SlotStatus::Running => stats.running += 1,
                SlotStatus::Paused => stats.paused += 1,
                SlotStatus::Done(_) => stats.done += 1,
            }
            if slot.monitored {
                stats.monitored += 1;
            }
        }
        stats
    }
}
