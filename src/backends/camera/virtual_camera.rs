// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera
//!
//! Streams a still image (or a generated test pattern) as if it were a live
//! feed. Used for demos on machines without a webcam and by the tests.

use super::format_converters::mirror_rgba_in_place;
use super::types::*;
use super::{CameraBackend, CameraStream, CaptureLoopController, LoopAction};
use crate::constants::{camera, file_formats};
use crate::errors::CameraError;
use futures::channel::mpsc;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What the virtual camera shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualSource {
    /// Colour bars at the requested resolution
    TestPattern,
    /// A still image file
    Image(PathBuf),
}

/// Backend that loops one frame forever
#[derive(Debug, Clone)]
pub struct VirtualCameraBackend {
    source: VirtualSource,
    frame_interval: Duration,
}

impl VirtualCameraBackend {
    pub fn test_pattern() -> Self {
        Self {
            source: VirtualSource::TestPattern,
            frame_interval: camera::VIRTUAL_FRAME_INTERVAL,
        }
    }

    pub fn from_image(path: impl Into<PathBuf>) -> Self {
        Self {
            source: VirtualSource::Image(path.into()),
            frame_interval: camera::VIRTUAL_FRAME_INTERVAL,
        }
    }

    fn device(&self) -> CameraDevice {
        match &self.source {
            VirtualSource::TestPattern => CameraDevice {
                name: "Virtual camera (test pattern)".to_string(),
                path: "virtual:pattern".to_string(),
                driver: None,
            },
            VirtualSource::Image(path) => CameraDevice {
                name: format!("Virtual camera ({})", path.display()),
                path: format!("virtual:{}", path.display()),
                driver: None,
            },
        }
    }

    fn build_frame(&self, request: &StreamRequest) -> Result<CameraFrame, CameraError> {
        let mut frame = match &self.source {
            VirtualSource::TestPattern => {
                test_pattern_frame(request.ideal_width.max(1), request.ideal_height.max(1))
            }
            VirtualSource::Image(path) => load_image_as_frame(path)?,
        };

        if request.mirror {
            let mut data = frame.data.to_vec();
            mirror_rgba_in_place(&mut data, frame.width);
            frame = CameraFrame::from_rgba(frame.width, frame.height, data)
                .ok_or_else(|| CameraError::AcquisitionFailure("frame size mismatch".into()))?;
        }
        Ok(frame)
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn is_available(&self) -> bool {
        match &self.source {
            VirtualSource::TestPattern => true,
            VirtualSource::Image(path) => path.is_file(),
        }
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![self.device()]
    }

    fn acquire(&self, request: &StreamRequest) -> Result<CameraStream, CameraError> {
        if request.device_index != 0 {
            return Err(CameraError::AcquisitionFailure(format!(
                "virtual camera has no device {}",
                request.device_index
            )));
        }

        let frame = self.build_frame(request)?;
        let format = CameraFormat {
            width: frame.width,
            height: frame.height,
            pixel_format: "RGBA".to_string(),
        };
        info!(format = %format, "Starting virtual camera");

        let (mut sender, receiver) = mpsc::channel(camera::FRAME_CHANNEL_CAPACITY);
        let interval = self.frame_interval;
        let controller = CaptureLoopController::start("virtual-camera", move || {
            let frame = CameraFrame {
                captured_at: Instant::now(),
                ..frame.clone()
            };
            match sender.try_send(frame) {
                Err(e) if e.is_disconnected() => return LoopAction::Stop,
                _ => {}
            }
            std::thread::sleep(interval);
            LoopAction::Continue
        });

        Ok(CameraStream::new(self.device(), format, receiver, controller))
    }
}

/// Load an image file as a single RGBA frame
pub fn load_image_as_frame(path: &Path) -> Result<CameraFrame, CameraError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !file_formats::is_image_extension(extension) {
        return Err(CameraError::AcquisitionFailure(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    let img = image::open(path).map_err(|e| {
        CameraError::AcquisitionFailure(format!("Failed to load image '{}': {}", path.display(), e))
    })?;
    let rgba = img.to_rgba8();
    debug!(width = rgba.width(), height = rgba.height(), "Virtual camera image loaded");

    CameraFrame::from_image(rgba)
        .ok_or_else(|| CameraError::AcquisitionFailure("empty image".to_string()))
}

/// Eight vertical colour bars over a dark-to-light vertical ramp
pub fn test_pattern_frame(width: u32, height: u32) -> CameraFrame {
    const BARS: [[u8; 3]; 8] = [
        [235, 235, 235],
        [235, 235, 16],
        [16, 235, 235],
        [16, 235, 16],
        [235, 16, 235],
        [235, 16, 16],
        [16, 16, 235],
        [16, 16, 16],
    ];

    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        let bar = BARS[(x as usize * BARS.len() / width as usize).min(BARS.len() - 1)];
        let shade = 0.5 + 0.5 * (y as f32 / height as f32);
        image::Rgba([
            (bar[0] as f32 * shade) as u8,
            (bar[1] as f32 * shade) as u8,
            (bar[2] as f32 * shade) as u8,
            255,
        ])
    });

    CameraFrame {
        width,
        height,
        data: image.into_raw().into(),
        captured_at: Instant::now(),
    }
}
