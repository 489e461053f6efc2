// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding and saving
//!
//! Snapshots and the exported strip are both lossy JPEG, at different
//! quality factors. Encoding is CPU-bound, so async callers run it on the
//! blocking pool.

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Encoded image data ready for saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

/// JPEG encoder with a fixed quality factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoEncoder {
    quality: u8,
}

impl PhotoEncoder {
    /// Quality is clamped to the JPEG range 1-100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode on the calling thread
    pub fn encode_jpeg(&self, image: &RgbImage) -> Result<EncodedImage, String> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, self.quality);
        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| format!("JPEG encoding failed: {}", e))?;

        debug!(size = buffer.len(), quality = self.quality, "Encoding complete");
        Ok(EncodedImage {
            data: buffer,
            width: image.width(),
            height: image.height(),
        })
    }

    /// Write encoded data to `output_dir/filename`, replacing any previous file
    pub async fn save(
        encoded: &EncodedImage,
        output_dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, String> {
        let filepath = output_dir.join(filename);
        info!(path = %filepath.display(), "Saving image");

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| format!("Failed to create {}: {}", output_dir.display(), e))?;
        tokio::fs::write(&filepath, &encoded.data)
            .await
            .map_err(|e| format!("Failed to save image: {}", e))?;

        info!(path = %filepath.display(), "Image saved successfully");
        Ok(filepath)
    }
}
