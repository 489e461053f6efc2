// SPDX-License-Identifier: GPL-3.0-only

//! Single-photo pipeline
//!
//! ```text
//! Live frame (RGBA) → Snapshot → JPEG → Photo
//! ```

pub mod capture;
pub mod encoding;

pub use capture::PhotoCapture;
pub use encoding::{EncodedImage, PhotoEncoder};
