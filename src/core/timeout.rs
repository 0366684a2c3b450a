//! Per-slot deadlines.
//!
//! Deadlines are absolute clock seconds. A deadline only matters while its
//! slot is running; paused or finished slots are ignored by every sweep.

use crate::core::{SchedulerError, SlotHandle, SlotPool, SlotStatus};

impl<R> SlotPool<R> {
    /// Seconds until the nearest pending deadline, or 0 when nothing is
    /// pending, nothing is running, or a slot still has an unobserved expiry.
    #[must_use]
    pub fn soonest_deadline(&self, now: u64) -> u64 {
        let mut soonest: Option<u64> = None;
        for slot in &self.slots {
            if slot.status != SlotStatus::Running {
                continue;
            }
            if slot.deadline_expired {
                return 0;
            }
            if let Some(deadline) = slot.deadline {
                soonest = Some(soonest.map_or(deadline, |s| s.min(deadline)));
            }
        }
        soonest.map_or(0, |deadline| deadline.saturating_sub(now))
    }

    /// Whether a running slot's deadline has already passed without being
    /// expired yet.
    #[must_use]
    pub fn has_overdue(&self, now: u64) -> bool {
        self.slots.iter().any(|slot| {
            slot.status == SlotStatus::Running
                && (slot.deadline_expired || slot.deadline.is_some_and(|d| d <= now))
        })
    }

    /// Expire every running slot whose deadline is at or before `now`.
    ///
    /// The slot stays running with `timed_out()` set; the handler decides what
    /// the expiry means. Returns the expired slots in index order.
    pub fn expire_deadlines(&mut self, now: u64) -> Vec<SlotHandle> {
        let mut expired = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.status != SlotStatus::Running {
                continue;
            }
            if slot.deadline.is_some_and(|d| d <= now) {
                slot.deadline = None;
                slot.deadline_expired = true;
                expired.push(SlotHandle(index));
            }
        }
        expired
    }

    /// Arm (or re-arm) a deadline `secs` after `now` on a running slot.
    pub fn set_timeout(
        &mut self,
        handle: SlotHandle,
        secs: u64,
        now: u64,
    ) -> Result<(), SchedulerError> {
        let slot = self.get_mut(handle)?;
        if slot.status != SlotStatus::Running {
            return Err(SchedulerError::InvalidState {
                index: handle.0,
                found: slot.status.name(),
                expected: "running",
            });
        }
        slot.deadline = Some(now.saturating_add(secs));
        slot.deadline_expired = false;
        Ok(())
    }
}
