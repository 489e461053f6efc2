// SPDX-License-Identifier: GPL-3.0-only

//! Booth configuration
//!
//! Nothing is read implicitly: the defaults are the fixed values from
//! [`crate::constants`], a JSON file can be given with `--config`, and single
//! command-line flags override either.

use crate::backends::camera::CameraBackendType;
use crate::backends::camera::types::StreamRequest;
use crate::capture::SessionTiming;
use crate::constants::{PHOTOS_PER_SESSION, camera, export, timing};
use crate::errors::{AppError, AppResult};
use crate::geometry::LayoutSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Capture timer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Countdown start value before each photo
    pub countdown_start: u32,
    /// Length of one countdown step in milliseconds
    pub time_unit_ms: u64,
    /// Flash duration in milliseconds
    pub flash_ms: u64,
    /// Pause after each capture, in time units
    pub cooldown_units: u32,
    /// Pause before hand-off, in time units
    pub completion_units: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            countdown_start: timing::COUNTDOWN_START,
            time_unit_ms: timing::TIME_UNIT.as_millis() as u64,
            flash_ms: timing::FLASH_DURATION.as_millis() as u64,
            cooldown_units: timing::COOLDOWN_UNITS,
            completion_units: timing::COMPLETION_UNITS,
        }
    }
}

impl From<TimingSettings> for SessionTiming {
    fn from(settings: TimingSettings) -> Self {
        SessionTiming {
            countdown_start: settings.countdown_start,
            time_unit: Duration::from_millis(settings.time_unit_ms),
            flash: Duration::from_millis(settings.flash_ms),
            cooldown_units: settings.cooldown_units,
            completion_units: settings.completion_units,
        }
    }
}

/// Camera selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub backend: CameraBackendType,
    /// Index into the enumerated devices
    pub device_index: usize,
    pub ideal_width: u32,
    pub ideal_height: u32,
    /// Mirror the feed (selfie view)
    pub mirror: bool,
    /// Still image looped by the virtual backend (test pattern when unset)
    pub virtual_image: Option<PathBuf>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            device_index: 0,
            ideal_width: camera::IDEAL_WIDTH,
            ideal_height: camera::IDEAL_HEIGHT,
            mirror: true,
            virtual_image: None,
        }
    }
}

impl CameraSettings {
    pub fn stream_request(&self) -> StreamRequest {
        StreamRequest {
            device_index: self.device_index,
            ideal_width: self.ideal_width,
            ideal_height: self.ideal_height,
            mirror: self.mirror,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    pub filename: String,
    /// Output directory; the pictures directory when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: export::JPEG_QUALITY,
            filename: export::FILENAME.to_string(),
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timing: TimingSettings,
    pub camera: CameraSettings,
    pub export: ExportSettings,
    pub layout: LayoutSpec,
}

impl Config {
    /// Load a JSON configuration file; missing fields keep their defaults
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("invalid {}: {}", path.display(), e)))?;
        config.validate()?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Reject values the booth cannot work with
    pub fn validate(&self) -> AppResult<()> {
        let fail = |msg: String| Err(AppError::Config(msg));

        if self.timing.time_unit_ms == 0 {
            return fail("timing.time_unit_ms must be positive".into());
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return fail(format!(
                "export.jpeg_quality must be 1-100, got {}",
                self.export.jpeg_quality
            ));
        }
        if self.export.filename.trim().is_empty() {
            return fail("export.filename must not be empty".into());
        }
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return fail("camera resolution must be non-zero".into());
        }
        if self.layout.photos_per_strip != PHOTOS_PER_SESSION {
            return fail(format!(
                "layout.photos_per_strip must be {}, got {}",
                PHOTOS_PER_SESSION, self.layout.photos_per_strip
            ));
        }

        let strip = self.layout.strip_layout();
        if !(strip.strip_width > 0.0) || !(strip.photo_height > 0.0) {
            return fail(format!(
                "layout leaves no room for photos (strip width {:.1}, photo height {:.1})",
                strip.strip_width, strip.photo_height
            ));
        }
        if self.layout.outer_padding < 0.0 || self.layout.photo_padding < 0.0 {
            return fail("layout paddings must not be negative".into());
        }
        Ok(())
    }

    pub fn session_timing(&self) -> SessionTiming {
        self.timing.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("booth.json");
        std::fs::write(&path, r#"{ "timing": { "countdown_start": 3 } }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timing.countdown_start, 3);
        assert_eq!(config.timing.time_unit_ms, 1000);
        assert_eq!(config.export, ExportSettings::default());
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("booth.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn degenerate_layout_is_rejected() {
        let mut config = Config::default();
        config.layout.outer_padding = 600.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn session_timing_uses_milliseconds() {
        let mut config = Config::default();
        config.timing.time_unit_ms = 250;
        assert_eq!(config.session_timing().time_unit, Duration::from_millis(250));
    }
}
