// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use photostrip::Config;
use photostrip::backends::camera::CameraBackendType;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.timing.countdown_start, 2);
    assert_eq!(config.timing.time_unit_ms, 1000);
    assert_eq!(config.timing.flash_ms, 150);
    assert_eq!(config.layout.canvas_width, 1050);
    assert_eq!(config.layout.canvas_height, 1500);
    assert_eq!(config.export.jpeg_quality, 90);
    assert_eq!(config.export.filename, "photostrip.jpg");
    assert!(config.camera.mirror, "Mirroring should be enabled by default");
    assert_eq!(config.camera.backend, CameraBackendType::V4l2);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_json_roundtrip_keeps_overrides() {
    let mut config = Config::default();
    config.timing.countdown_start = 5;
    config.export.jpeg_quality = 75;

    let json = serde_json::to_string(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_config_load_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("booth.json");
    std::fs::write(
        &path,
        r#"{ "camera": { "backend": "Virtual" }, "export": { "output_dir": "/tmp/out" } }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.camera.backend, CameraBackendType::Virtual);
    assert_eq!(config.export.output_dir.as_deref(), Some(std::path::Path::new("/tmp/out")));
    assert_eq!(config.export.filename, "photostrip.jpg");
}

#[test]
fn test_config_rejects_invalid_values() {
    let mut config = Config::default();
    config.timing.time_unit_ms = 0;
    assert!(config.validate().is_err(), "Zero time unit should be rejected");

    let mut config = Config::default();
    config.export.jpeg_quality = 0;
    assert!(config.validate().is_err(), "Quality 0 should be rejected");

    let mut config = Config::default();
    config.layout.photos_per_strip = 3;
    assert!(config.validate().is_err(), "Strips always hold four photos");

    let mut config = Config::default();
    config.layout.photo_padding = 1000.0;
    assert!(config.validate().is_err(), "No room left for photos");
}

#[test]
fn test_config_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(&dir.path().join("missing.json")).is_err());
}

#[test]
fn test_session_timing_from_config() {
    let mut config = Config::default();
    config.timing.countdown_start = 3;
    config.timing.time_unit_ms = 100;

    let timing = config.session_timing();
    assert_eq!(timing.countdown_start, 3);
    assert_eq!(timing.time_unit, Duration::from_millis(100));
    // 4 x (3 countdown + 1 cooldown) + 1 completion
    assert_eq!(timing.total_duration(), Duration::from_millis(1700));
}
