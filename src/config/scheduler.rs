//! Scheduler configuration structures.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable prefix read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "SLOT_SCHEDULER_";

/// Readiness backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendConfig {
    /// Native backend of the build platform.
    #[default]
    Auto,
    /// Linux `epoll`.
    Epoll,
    /// Solaris/illumos `/dev/poll`.
    DevPoll,
    /// BSD/macOS `kqueue`.
    Kqueue,
    /// In-memory backend for development/testing.
    InMemory,
}

impl FromStr for BackendConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "epoll" => Ok(Self::Epoll),
            "dev_poll" | "devpoll" => Ok(Self::DevPoll),
            "kqueue" => Ok(Self::Kqueue),
            "in_memory" | "memory" => Ok(Self::InMemory),
            other => Err(format!("unknown backend `{other}`")),
        }
    }
}

/// Scheduler configuration for one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of request slots (maximum in-flight requests).
    pub slots: usize,
    /// Maximum readiness events collected per wait.
    pub max_events: usize,
    /// Timeout in seconds applied to fd waits that carry none; 0 disables it.
    pub default_timeout_secs: u64,
    /// Readiness backend.
    pub backend: BackendConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            slots: 64,
            max_events: 64,
            default_timeout_secs: 0,
            backend: BackendConfig::Auto,
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.slots == 0 {
            return Err("slots must be greater than 0".into());
        }
        if self.max_events == 0 {
            return Err("max_events must be greater than 0".into());
        }
        if i32::try_from(self.max_events).is_err() {
            return Err("max_events does not fit a native wait batch".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the environment (after loading `.env` if
    /// present). Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary `SLOT_SCHEDULER_*` lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        if let Some(v) = var("SLOTS") {
            cfg.slots = parse("SLOTS", &v)?;
        }
        if let Some(v) = var("MAX_EVENTS") {
            cfg.max_events = parse("MAX_EVENTS", &v)?;
        }
        if let Some(v) = var("DEFAULT_TIMEOUT_SECS") {
            cfg.default_timeout_secs = parse("DEFAULT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("BACKEND") {
            cfg.backend = v.parse()?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}
