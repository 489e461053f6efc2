// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot of the live feed
//!
//! The snapshot is taken at the frame's native resolution at the instant of
//! capture and encoded immediately, so the resulting [`Photo`] is immutable.

use super::encoding::PhotoEncoder;
use crate::backends::camera::types::CameraFrame;
use crate::constants::camera;
use crate::photo::Photo;
use image::buffer::ConvertBuffer;
use image::RgbImage;
use std::sync::Arc;
use tracing::debug;

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Encode the given live frame into a photo
    pub fn snapshot(frame: &CameraFrame) -> Result<Photo, String> {
        let rgba = frame
            .to_rgba_image()
            .ok_or_else(|| "Frame buffer does not match its dimensions".to_string())?;
        let rgb: RgbImage = rgba.convert();

        let encoded = PhotoEncoder::new(camera::SNAPSHOT_JPEG_QUALITY).encode_jpeg(&rgb)?;
        debug!(
            width = frame.width,
            height = frame.height,
            size = encoded.data.len(),
            "Snapshot taken"
        );

        Ok(Photo::from_encoded(Arc::<[u8]>::from(encoded.data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_native_resolution() {
        let frame = CameraFrame::from_rgba(64, 36, vec![128u8; 64 * 36 * 4]).unwrap();
        let photo = PhotoCapture::snapshot(&frame).unwrap();

        assert!(photo.origin_file().is_none());
        assert_eq!(photo.mime_type(), "image/jpeg");
        let decoded = photo.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 36));
    }
}
