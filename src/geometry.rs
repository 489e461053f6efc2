// SPDX-License-Identifier: GPL-3.0-only

//! Strip layout and cover-crop geometry
//!
//! Pure functions shared by the live preview (to show which part of the
//! frame will be kept) and the compositor (to actually keep it). Both sides
//! must derive the photo aspect ratio from [`compute_strip_layout`] and crop
//! with [`compute_cover_crop`]; any second formula would let the preview and
//! the print drift apart.

use crate::constants::layout;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in canvas or image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Half-open containment: left/top edges inside, right/bottom outside
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Snap to whole pixels (origin and size rounded independently)
    pub fn to_pixels(&self) -> (u32, u32, u32, u32) {
        (
            self.x.round().max(0.0) as u32,
            self.y.round().max(0.0) as u32,
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

/// Declared layout parameters of the output canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSpec {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub outer_padding: f64,
    pub photo_padding: f64,
    pub photos_per_strip: usize,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            canvas_width: layout::CANVAS_WIDTH,
            canvas_height: layout::CANVAS_HEIGHT,
            outer_padding: layout::OUTER_PADDING,
            photo_padding: layout::PHOTO_PADDING,
            photos_per_strip: layout::PHOTOS_PER_STRIP,
        }
    }
}

impl LayoutSpec {
    /// Compute the strip layout for these parameters
    pub fn strip_layout(&self) -> StripLayout {
        compute_strip_layout(
            self.canvas_width as f64,
            self.canvas_height as f64,
            self.outer_padding,
            self.photo_padding,
            self.photos_per_strip,
        )
    }
}

/// Slot positions of the two-strip layout
#[derive(Debug, Clone, PartialEq)]
pub struct StripLayout {
    pub strip_width: f64,
    pub photo_height: f64,
    /// Left edge of the left and the right strip
    pub x_positions: [f64; layout::STRIP_COUNT],
    /// Top edge of each photo slot, shared by both strips
    pub y_positions: Vec<f64>,
}

impl StripLayout {
    /// Aspect ratio of one photo slot (strip width / photo height)
    pub fn photo_aspect_ratio(&self) -> f64 {
        self.strip_width / self.photo_height
    }

    /// Slot rectangle for a strip and a photo index
    pub fn slot(&self, strip: usize, index: usize) -> Rect {
        Rect::new(
            self.x_positions[strip],
            self.y_positions[index],
            self.strip_width,
            self.photo_height,
        )
    }

    /// All slots as `(strip, index, rect)`, left strip first
    pub fn slots(&self) -> impl Iterator<Item = (usize, usize, Rect)> + '_ {
        (0..self.x_positions.len()).flat_map(move |strip| {
            (0..self.y_positions.len()).map(move |index| (strip, index, self.slot(strip, index)))
        })
    }
}

/// Compute the duplicated-strip layout
///
/// Two strips with three horizontal gaps (left edge, middle, right edge);
/// `photos_per_strip` photos stacked vertically with `photo_pad` between
/// them. Degenerate inputs produce degenerate (possibly negative) sizes;
/// [`crate::config::Config::validate`] rejects those before they get here.
pub fn compute_strip_layout(
    canvas_w: f64,
    canvas_h: f64,
    outer_pad: f64,
    photo_pad: f64,
    photos_per_strip: usize,
) -> StripLayout {
    let count = photos_per_strip.max(1) as f64;
    let strip_width = (canvas_w - outer_pad * 3.0) / 2.0;
    let strip_area_height = canvas_h - outer_pad * 2.0;
    let photo_height = (strip_area_height - photo_pad * (count - 1.0)) / count;

    let x_positions = [outer_pad, outer_pad * 2.0 + strip_width];
    let y_positions = (0..photos_per_strip)
        .map(|index| outer_pad + index as f64 * (photo_height + photo_pad))
        .collect();

    StripLayout {
        strip_width,
        photo_height,
        x_positions,
        y_positions,
    }
}

/// Source rectangle of a cover crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverCrop {
    pub sx: f64,
    pub sy: f64,
    pub width: f64,
    pub height: f64,
}

impl CoverCrop {
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.sx, self.sy, self.width, self.height)
    }
}

/// Fill-and-crop an `img_w`x`img_h` image into a `box_w`x`box_h` box
///
/// If the image is relatively wider than the box its width is cropped and
/// the crop is centred horizontally, otherwise its height is cropped and the
/// crop is centred vertically.
pub fn compute_cover_crop(img_w: f64, img_h: f64, box_w: f64, box_h: f64) -> CoverCrop {
    let img_ratio = img_w / img_h;
    let box_ratio = box_w / box_h;

    if img_ratio > box_ratio {
        let height = img_h;
        let width = height * box_ratio;
        CoverCrop {
            sx: (img_w - width) / 2.0,
            sy: 0.0,
            width,
            height,
        }
    } else {
        let width = img_w;
        let height = width / box_ratio;
        CoverCrop {
            sx: 0.0,
            sy: (img_h - height) / 2.0,
            width,
            height,
        }
    }
}

/// Dimmed bars over the live preview marking what the print will discard
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropOverlay {
    /// Bars on the left and right, each `fraction` of the container width
    Sides { fraction: f64 },
    /// Bars on top and bottom, each `fraction` of the container height
    TopBottom { fraction: f64 },
}

impl CropOverlay {
    /// Overlay for a `container_w`x`container_h` preview and a target aspect
    ///
    /// The clear area is the cover crop of the container itself, so it
    /// matches what the compositor keeps from a frame of the same shape.
    pub fn for_container(container_w: f64, container_h: f64, target_aspect: f64) -> Self {
        let crop = compute_cover_crop(container_w, container_h, target_aspect, 1.0);
        if crop.width < container_w {
            CropOverlay::Sides {
                fraction: crop.sx / container_w,
            }
        } else {
            CropOverlay::TopBottom {
                fraction: crop.sy / container_h,
            }
        }
    }

    /// Rectangles to dim inside an area of the given size
    pub fn bars(&self, width: f64, height: f64) -> [Rect; 2] {
        match *self {
            CropOverlay::Sides { fraction } => {
                let bar = width * fraction;
                [
                    Rect::new(0.0, 0.0, bar, height),
                    Rect::new(width - bar, 0.0, bar, height),
                ]
            }
            CropOverlay::TopBottom { fraction } => {
                let bar = height * fraction;
                [
                    Rect::new(0.0, 0.0, width, bar),
                    Rect::new(0.0, height - bar, width, bar),
                ]
            }
        }
    }

    /// Whether a point (relative to the area origin) falls under a bar
    pub fn is_masked(&self, x: f64, y: f64, width: f64, height: f64) -> bool {
        self.bars(width, height).iter().any(|bar| bar.contains(x, y))
    }
}
