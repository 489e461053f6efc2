// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::camera;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices
    #[default]
    V4l2,
    /// Looping still image or generated test pattern
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Virtual => write!(f, "Virtual"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human-readable name (V4L2 card)
    pub name: String,
    /// Device path (e.g., /dev/video0) or virtual source description
    pub path: String,
    /// Driver name, if known
    pub driver: Option<String>,
}

/// Negotiated capture format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    /// FourCC as text (e.g., "MJPG", "YUYV")
    pub pixel_format: String,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
    }
}

/// Which camera to open and how
///
/// Mirrors a front-facing video request: the resolution is a preference the
/// driver may round to the closest mode it supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Index into the backend's device enumeration
    pub device_index: usize,
    pub ideal_width: u32,
    pub ideal_height: u32,
    /// Flip frames horizontally (selfie view)
    pub mirror: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            device_index: 0,
            ideal_width: camera::IDEAL_WIDTH,
            ideal_height: camera::IDEAL_HEIGHT,
            mirror: true,
        }
    }
}

/// A single RGBA frame from the live feed
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA pixels (stride = width * 4)
    pub data: Arc<[u8]>,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap RGBA pixels; `None` if the buffer does not match the size
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 || width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            captured_at: Instant::now(),
        })
    }

    /// Frame from a decoded image
    pub fn from_image(image: image::RgbaImage) -> Option<Self> {
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    /// Row stride in bytes
    pub fn stride(&self) -> u32 {
        self.width * 4
    }

    /// RGB of the pixel at (x, y), clamped to the frame
    pub fn pixel_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let idx = (y * self.stride() + x * 4) as usize;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Copy into an owned image buffer
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
    }
}

/// Receiver side of a backend's frame channel
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;

/// Sender side of a backend's frame channel
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;
