//! Integration tests for logging system

use core_runtime::logging::{init_logging, strip_path, LogFormat, LogLevel, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_logging_initialization_once() {
    // Only one global subscriber per process: the second attempt must be
    // reported rather than silently replacing the first.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    let first = init_logging(config.clone());
    assert!(first.is_ok());

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::AlreadyInitialized)));

    tracing::debug!(target: "core_playback", "logging initialized in test");
}

#[test]
fn test_path_stripping() {
    // Unix paths
    assert_eq!(strip_path("/home/user/music/song.flac"), "song.flac");
    assert_eq!(strip_path("/var/log/app.log"), "app.log");

    // Windows paths
    assert_eq!(strip_path("C:\\Users\\John\\Music\\song.mp3"), "song.mp3");

    // Already basename
    assert_eq!(strip_path("track.ogg"), "track.ogg");

    // Edge cases
    assert_eq!(strip_path("/var/log/"), "");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: LoggingConfig =
        serde_json::from_str(r#"{ "format": "json", "level": "trace" }"#).unwrap();

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Trace);
    assert_eq!(config.filter, None);
    assert!(config.enable_spans);
    assert!(config.display_target);
    assert!(!config.display_thread_info);
}
