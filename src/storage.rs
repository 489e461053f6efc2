// SPDX-License-Identifier: GPL-3.0-only

//! Where exported strips go

use crate::config::ExportSettings;
use crate::constants::export;
use crate::errors::CompositeError;
use crate::pipelines::photo::encoding::{EncodedImage, PhotoEncoder};
use std::path::PathBuf;
use tracing::debug;

/// Output directory: configured, else `~/Pictures/photostrip`, else the
/// current directory
pub fn output_dir(settings: &ExportSettings) -> PathBuf {
    if let Some(dir) = &settings.output_dir {
        return dir.clone();
    }
    let dir = dirs::picture_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join(export::DEFAULT_SUBDIR))
        .unwrap_or_else(|| PathBuf::from("."));
    debug!(path = %dir.display(), "Using default output directory");
    dir
}

/// Directory for the booth's log file
pub fn log_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(export::DEFAULT_SUBDIR))
}

/// Write an exported strip under its fixed filename
pub async fn save_export(
    encoded: &EncodedImage,
    settings: &ExportSettings,
) -> Result<PathBuf, CompositeError> {
    let dir = output_dir(settings);
    PhotoEncoder::save(encoded, &dir, &settings.filename)
        .await
        .map_err(CompositeError::Save)
}
