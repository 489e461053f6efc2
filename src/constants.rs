// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! These are the fixed values of the print layout, the capture timing and the
//! export format. [`crate::config::Config`] takes its defaults from here.

use std::time::Duration;

/// Number of photos in one session (and in one strip)
pub const PHOTOS_PER_SESSION: usize = 4;

/// Output canvas and strip layout
pub mod layout {
    /// Canvas width in pixels (portrait L-size, 89x127mm)
    pub const CANVAS_WIDTH: u32 = 1050;

    /// Canvas height in pixels
    pub const CANVAS_HEIGHT: u32 = 1500;

    /// Outer padding and gap between the two strips
    pub const OUTER_PADDING: f64 = 40.0;

    /// Gap between photos inside a strip
    pub const PHOTO_PADDING: f64 = 20.0;

    /// Photos stacked in one strip
    pub const PHOTOS_PER_STRIP: usize = super::PHOTOS_PER_SESSION;

    /// Strips on the canvas (left and right carry identical content)
    pub const STRIP_COUNT: usize = 2;
}

/// Capture timer values
pub mod timing {
    use super::Duration;

    /// Countdown start value before each photo
    pub const COUNTDOWN_START: u32 = 2;

    /// Length of one countdown step
    pub const TIME_UNIT: Duration = Duration::from_millis(1000);

    /// How long the flash stays visible after a capture
    pub const FLASH_DURATION: Duration = Duration::from_millis(150);

    /// Pause after a capture (freeze-frame stays visible), in time units
    pub const COOLDOWN_UNITS: u32 = 1;

    /// Pause after the last capture before handing off, in time units
    pub const COMPLETION_UNITS: u32 = 1;

    /// Delay before retrying a snapshot when no frame was available
    pub const SNAPSHOT_RETRY: Duration = Duration::from_millis(33);
}

/// Camera acquisition request
pub mod camera {
    /// Preferred capture width
    pub const IDEAL_WIDTH: u32 = 1280;

    /// Preferred capture height
    pub const IDEAL_HEIGHT: u32 = 720;

    /// Number of mmap buffers requested from the driver
    pub const STREAM_BUFFERS: u32 = 4;

    /// Frames buffered between the capture thread and the session
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;

    /// JPEG quality of snapshot payloads
    pub const SNAPSHOT_JPEG_QUALITY: u8 = 92;

    /// Frame interval of the virtual camera
    pub const VIRTUAL_FRAME_INTERVAL: std::time::Duration = std::time::Duration::from_millis(33);
}

/// Exported artifact
pub mod export {
    /// JPEG quality of the exported strip (0-100)
    pub const JPEG_QUALITY: u8 = 90;

    /// Fixed filename of the exported strip
    pub const FILENAME: &str = "photostrip.jpg";

    /// Subdirectory of the pictures directory used when none is configured
    pub const DEFAULT_SUBDIR: &str = "photostrip";
}

/// File formats accepted by the upload path
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application info
pub mod app_info {
    use std::path::Path;

    /// Application version from build.rs (git describe)
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Check if running inside a Flatpak sandbox
    pub fn is_flatpak() -> bool {
        Path::new("/.flatpak-info").exists()
    }
}
