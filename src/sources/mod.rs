// SPDX-License-Identifier: GPL-3.0-only

//! Media sources producing the four photos of a strip
//!
//! Both variants end in exactly one [`SourceOutcome`]: the full set, or a
//! request to go back to the entry point. Never both.

pub mod camera;
pub mod upload;

pub use camera::CameraSource;
pub use upload::{SelectionState, UploadSource};

use crate::photo::PhotoSet;

/// Result of running a media source to its end
#[derive(Debug, Clone)]
pub enum SourceOutcome {
    /// Four photos in order, ready for the editor
    Complete(PhotoSet),
    /// The user backed out
    Back,
}

impl SourceOutcome {
    pub fn into_photos(self) -> Option<PhotoSet> {
        match self {
            SourceOutcome::Complete(set) => Some(set),
            SourceOutcome::Back => None,
        }
    }
}
