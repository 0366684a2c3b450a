//! # Prometheus Slot Scheduler
//!
//! A fixed-capacity, cooperative request scheduler for single-threaded
//! network workers.
//!
//! Each worker owns a pool of request slots. A slot holds one in-flight
//! request and a resumable handler drives it forward one step at a time.
//! When a handler needs to wait, it names a descriptor (or a timeout) and
//! returns; the scheduler registers the descriptor with the platform's
//! readiness multiplexer and resumes the slot once it is ready, or once its
//! deadline passes.
//!
//! ## Key Features
//!
//! - **Bounded concurrency**: a fixed slot arena, no allocation per request
//! - **Readiness multiplexing**: `epoll`, `kqueue` and `/dev/poll` behind one trait
//! - **Deadlines**: per-slot timeouts in whole seconds, driven by a pluggable clock
//! - **Broadcast**: write a buffer to every paused request at once
//!
//! ## Worker loop
//!
//! ```rust,ignore
//! use prometheus_slot_scheduler::builders::SchedulerBuilder;
//! use prometheus_slot_scheduler::config::SchedulerConfig;
//! use prometheus_slot_scheduler::infra::Events;
//!
//! let cfg = SchedulerConfig::from_env()?;
//! let mut scheduler = SchedulerBuilder::new(cfg.clone()).build(listener_fd, handler)?;
//! let mut events = Events::with_capacity(cfg.max_events);
//! loop {
//!     while let Some(done) = scheduler.run_pass() {
//!         let (outcome, conn) = scheduler.release(done)?;
//!     }
//!     for ready in scheduler.turn(&mut events)? {
//!         // accept on the listener and `admit` the connection
//!     }
//! }
//! ```
//!
//! For complete flows, see `tests/scheduler_test.rs`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Slot pool, deadlines and the cooperative scheduler.
pub mod core;
/// Configuration models for the slot pool and its backend.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// OS adapters: readiness multiplexers and descriptor output.
pub mod infra;
/// Shared utilities.
pub mod util;
