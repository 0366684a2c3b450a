//! Configuration models for the slot pool and its multiplexer.

pub mod scheduler;

pub use scheduler::{BackendConfig, SchedulerConfig};
