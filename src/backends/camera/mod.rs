// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   Capture session   │
//! └──────────┬──────────┘
//!            │ acquire(StreamRequest)
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌─────────┐
//!   │ V4L2 │  │ Virtual │
//!   └──────┘  └─────────┘
//! ```
//!
//! A successful acquisition yields a [`CameraStream`]: the only owner of the
//! device while it is open. Releasing or dropping the stream stops the
//! capture thread, so every exit path of a session gives the camera back.

pub mod format_converters;
pub mod frame_loop;
pub mod types;
pub mod v4l2;
pub mod virtual_camera;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use types::*;

use crate::errors::CameraError;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Camera backend trait
pub trait CameraBackend: Send + Sync {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend can work on the current system at all
    fn is_available(&self) -> bool;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open a camera and start streaming frames
    ///
    /// Blocks until the device is streaming or has failed. Failures are
    /// classified (capability, context, permission, other) so the caller can
    /// show the matching message.
    fn acquire(&self, request: &StreamRequest) -> Result<CameraStream, CameraError>;
}

/// An open camera stream
///
/// Frames arrive on [`CameraStream::frames`]. The stream owns the capture
/// thread; dropping it stops all capture.
pub struct CameraStream {
    device: CameraDevice,
    format: CameraFormat,
    frames: FrameReceiver,
    controller: Option<CaptureLoopController>,
}

impl CameraStream {
    pub fn new(
        device: CameraDevice,
        format: CameraFormat,
        frames: FrameReceiver,
        controller: CaptureLoopController,
    ) -> Self {
        Self {
            device,
            format,
            frames,
            controller: Some(controller),
        }
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    pub fn format(&self) -> &CameraFormat {
        &self.format
    }

    /// Live frames from the capture thread
    pub fn frames(&mut self) -> &mut FrameReceiver {
        &mut self.frames
    }

    /// Whether the capture thread is still delivering
    pub fn is_active(&self) -> bool {
        self.controller
            .as_ref()
            .map(|c| c.is_running())
            .unwrap_or(false)
    }

    /// Stop capturing and release the device
    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            self.frames.close();
            controller.stop();
            info!(device = %self.device.name, "Camera stream released");
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CameraStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStream")
            .field("device", &self.device)
            .field("format", &self.format)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Get a backend instance for a type
///
/// `virtual_image` selects the still image looped by the virtual backend;
/// without it the virtual backend shows a test pattern.
pub fn get_backend_for_type(
    backend_type: CameraBackendType,
    virtual_image: Option<&Path>,
) -> Arc<dyn CameraBackend> {
    match (backend_type, virtual_image) {
        (CameraBackendType::V4l2, _) => Arc::new(v4l2::V4l2Backend::new()),
        (CameraBackendType::Virtual, Some(path)) => {
            Arc::new(virtual_camera::VirtualCameraBackend::from_image(path))
        }
        (CameraBackendType::Virtual, None) => {
            Arc::new(virtual_camera::VirtualCameraBackend::test_pattern())
        }
    }
}
