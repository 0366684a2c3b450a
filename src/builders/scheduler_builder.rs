//! Build a worker's scheduler from configuration.

use std::os::fd::RawFd;

use crate::config::SchedulerConfig;
use crate::core::{RequestHandler, Scheduler, SchedulerError};
use crate::infra::multiplexer::{self, Multiplexer};
use crate::util::clock::{Clock, SystemClock};

/// Scheduler type produced from configuration.
pub type ConfiguredScheduler<R, H, C = SystemClock> = Scheduler<R, H, Box<dyn Multiplexer>, C>;

/// Validates a [`SchedulerConfig`] and assembles pool, backend and clock.
#[derive(Debug, Clone)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    /// Builder for `config`.
    #[must_use]
    pub const fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Build with the wall clock, watching `listen_fd` for new connections.
    pub fn build<R, H>(&self, listen_fd: RawFd, handler: H) -> Result<ConfiguredScheduler<R, H>, SchedulerError>
    where
        H: RequestHandler<R>,
    {
        self.build_with_clock(listen_fd, handler, SystemClock)
    }

    /// Build with a caller-supplied clock.
    pub fn build_with_clock<R, H, C>(
        &self,
        listen_fd: RawFd,
        handler: H,
        clock: C,
    ) -> Result<ConfiguredScheduler<R, H, C>, SchedulerError>
    where
        H: RequestHandler<R>,
        C: Clock,
    {
        self.config.validate().map_err(SchedulerError::Config)?;
        let mux = multiplexer::open(&self.config.backend, listen_fd, self.config.max_events)?;
        tracing::info!(
            "scheduler ready: {} slots, {} events per wait, default timeout {}s",
            self.config.slots,
            self.config.max_events,
            self.config.default_timeout_secs
        );
        Ok(Scheduler::new(self.config.slots, handler, mux, clock)
            .with_default_timeout(self.config.default_timeout_secs))
    }
}
