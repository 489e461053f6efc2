// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the photo booth
//!
//! Camera acquisition errors are caught where the stream is requested and
//! turned into an inline message; they never abort the application. Results
//! that arrive after their context was superseded are not errors at all, see
//! [`crate::pipelines::strip::RenderOutcome::Superseded`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Upload selection errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
    /// Compositing and export errors
    #[error("Composite error: {0}")]
    Composite(#[from] CompositeError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Camera acquisition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// No camera API or device on this system
    #[error("camera capability unavailable")]
    CapabilityUnavailable,
    /// The capability exists but the execution context blocks it
    #[error("camera blocked by the execution context")]
    InsecureContext,
    /// The user (or system policy) refused access to the device
    #[error("camera permission denied")]
    PermissionDenied,
    /// Any other start failure (device busy, format negotiation, ...)
    #[error("camera acquisition failed: {0}")]
    AcquisitionFailure(String),
}

impl CameraError {
    /// Message shown inline in the capture stage
    pub fn user_message(&self) -> &'static str {
        match self {
            CameraError::CapabilityUnavailable => {
                "Camera access is not supported on this system. Use Upload Photos instead."
            }
            CameraError::InsecureContext => {
                "Camera access is blocked in this environment. Grant the sandbox device access to use the camera."
            }
            CameraError::PermissionDenied => {
                "Camera permission was denied. Please allow camera access (e.g. join the 'video' group) and try again."
            }
            CameraError::AcquisitionFailure(_) => {
                "Could not access camera. Please check that it is connected and not used by another application."
            }
        }
    }

    /// Whether retrying within the same session can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CameraError::AcquisitionFailure(_))
    }
}

impl From<String> for CameraError {
    fn from(msg: String) -> Self {
        CameraError::AcquisitionFailure(msg)
    }
}

/// Upload selection errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Fewer photos than a strip needs; the user must re-select
    #[error("please select exactly {required} photos ({count} selected)")]
    IncompleteSelection { count: usize, required: usize },
    /// A selected file could not be read or is not an image
    #[error("cannot read '{}': {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
}

/// Compositing and export errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeError {
    /// One of the photos could not be decoded
    #[error("failed to decode photo {index}: {reason}")]
    Decode { index: usize, reason: String },
    /// The canvas could not be encoded
    #[error("encoding failed: {0}")]
    Encode(String),
    /// The encoded strip could not be written
    #[error("save failed: {0}")]
    Save(String),
}

impl From<std::io::Error> for CompositeError {
    fn from(err: std::io::Error) -> Self {
        CompositeError::Save(err.to_string())
    }
}
