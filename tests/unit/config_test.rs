//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_slot_scheduler::config::{BackendConfig, SchedulerConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.slots, 64);
    assert_eq!(cfg.backend, BackendConfig::Auto);
}

#[test]
fn test_zero_slots_rejected() {
    let cfg = SchedulerConfig {
        slots: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_max_events_rejected() {
    let cfg = SchedulerConfig {
        max_events: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_default_timeout_is_allowed() {
    let cfg = SchedulerConfig {
        default_timeout_secs: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_json_fills_missing_fields() {
    let cfg = SchedulerConfig::from_json_str(r#"{"slots": 8, "backend": "in_memory"}"#).unwrap();
    assert_eq!(cfg.slots, 8);
    assert_eq!(cfg.max_events, 64);
    assert_eq!(cfg.backend, BackendConfig::InMemory);
}

#[test]
fn test_json_validation_applies() {
    assert!(SchedulerConfig::from_json_str(r#"{"slots": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_env_lookup_overrides_defaults() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("SLOT_SCHEDULER_SLOTS", "16"),
        ("SLOT_SCHEDULER_DEFAULT_TIMEOUT_SECS", " 30 "),
        ("SLOT_SCHEDULER_BACKEND", "epoll"),
    ]))
    .unwrap();
    assert_eq!(cfg.slots, 16);
    assert_eq!(cfg.max_events, 64);
    assert_eq!(cfg.default_timeout_secs, 30);
    assert_eq!(cfg.backend, BackendConfig::Epoll);
}

#[test]
fn test_env_lookup_reports_bad_values() {
    let err = SchedulerConfig::from_lookup(lookup(&[("SLOT_SCHEDULER_SLOTS", "many")])).unwrap_err();
    assert!(err.contains("SLOT_SCHEDULER_SLOTS"));

    let err = SchedulerConfig::from_lookup(lookup(&[("SLOT_SCHEDULER_BACKEND", "select")])).unwrap_err();
    assert!(err.contains("select"));
}

#[test]
fn test_backend_names_parse() {
    assert_eq!("devpoll".parse::<BackendConfig>(), Ok(BackendConfig::DevPoll));
    assert_eq!("KQUEUE".parse::<BackendConfig>(), Ok(BackendConfig::Kqueue));
    assert_eq!("memory".parse::<BackendConfig>(), Ok(BackendConfig::InMemory));
}
