// SPDX-License-Identifier: GPL-3.0-only

//! Photostrip - a four-shot photo booth
//!
//! Four photos are taken on a timer (or picked from disk) and laid out twice,
//! side by side, as two identical strips on a 1050x1500 canvas ready for an
//! L-size print.
//!
//! # Architecture
//!
//! - [`sources`]: where the four photos come from (camera or upload)
//! - [`capture`]: countdown/flash/cooldown state machine and its async driver
//! - [`backends`]: camera acquisition (V4L2, virtual)
//! - [`pipelines`]: snapshot encoding and the strip compositor
//! - [`geometry`]: strip layout and cover-crop math
//! - [`terminal`]: the interactive booth
//! - [`config`], [`storage`]: settings and where exports go

pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod geometry;
pub mod photo;
pub mod pipelines;
pub mod sources;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use capture::{CaptureSession, Phase, SessionDriver, SessionTiming};
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError, CompositeError, SelectionError};
pub use geometry::{LayoutSpec, StripLayout};
pub use photo::{Photo, PhotoSet};
pub use pipelines::strip::{Compositor, RenderOutcome};
pub use sources::SourceOutcome;
