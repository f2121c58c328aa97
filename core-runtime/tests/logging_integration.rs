//! Integration tests for logging and configuration

use bridge_traits::time::LogLevel;
use core_runtime::config::ServerConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

#[test]
fn test_init_logging_twice_fails() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn);

    // The first call may lose a race with another test binary's subscriber,
    // but a second call in the same process can never succeed.
    let _ = init_logging(config.clone());
    assert!(init_logging(config).is_err());
}

#[test]
fn test_config_carries_logging_settings() {
    let config = ServerConfig::builder()
        .client_id("id")
        .client_secret("secret")
        .callback_url("http://localhost:8080/api/auth/callback")
        .log_format(LogFormat::Json)
        .log_level(LogLevel::Debug)
        .log_filter("core_export=trace")
        .build()
        .unwrap();

    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.filter.as_deref(), Some("core_export=trace"));
}

#[test]
fn test_from_lookup_without_credentials_fails() {
    let err = ServerConfig::from_lookup(|_| None).unwrap_err();
    assert!(err.to_string().contains("APS_CLIENT_ID"));
}
