//! Slot pool, deadlines and the cooperative scheduler.

pub mod broadcast;
pub mod error;
pub mod pool;
pub mod scheduler;
pub mod slot;
pub mod timeout;

pub use broadcast::{BroadcastReport, OutputWriter};
pub use error::{AppResult, SchedulerError};
pub use pool::{PoolStats, SlotPool};
pub use scheduler::{RequestHandler, Scheduler};
pub use slot::{Interest, Outcome, Slot, SlotHandle, SlotStatus, Step};
