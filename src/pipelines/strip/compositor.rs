// SPDX-License-Identifier: GPL-3.0-only

//! Two-strip compositor
//!
//! Each [`Compositor::render`] call claims a new generation before it starts
//! decoding. Only the render holding the newest generation may write the
//! canvas; older ones resolve to [`RenderOutcome::Superseded`] and leave it
//! untouched.

use crate::errors::CompositeError;
use crate::geometry::{LayoutSpec, StripLayout, compute_cover_crop};
use crate::photo::PhotoSet;
use crate::pipelines::photo::encoding::{EncodedImage, PhotoEncoder};
use futures::future::try_join_all;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Result of one render request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The canvas now shows this request's photos
    Drawn,
    /// A newer request (or close) overtook this one; nothing was drawn
    Superseded,
    /// Decoding failed; the previous canvas content is kept
    Failed(CompositeError),
}

/// Owns the output canvas and draws photo sets into it
pub struct Compositor {
    spec: LayoutSpec,
    layout: StripLayout,
    encoder: PhotoEncoder,
    generation: AtomicU64,
    closed: AtomicBool,
    canvas: Mutex<Option<RgbImage>>,
}

impl Compositor {
    pub fn new(spec: LayoutSpec, export_quality: u8) -> Self {
        Self {
            layout: spec.strip_layout(),
            spec,
            encoder: PhotoEncoder::new(export_quality),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            canvas: Mutex::new(None),
        }
    }

    pub fn layout(&self) -> &StripLayout {
        &self.layout
    }

    /// Decode `photos` and draw them, unless a newer render starts meanwhile
    ///
    /// The generation is claimed when this is called, not when the returned
    /// future is first polled.
    pub fn render(&self, photos: PhotoSet) -> impl Future<Output = RenderOutcome> + Send + '_ {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Render requested");

        async move {
            let images = match decode_all(&photos).await {
                Ok(images) => images,
                Err(e) => {
                    if !self.is_current(generation) {
                        debug!(generation, "Stale decode failure discarded");
                        return RenderOutcome::Superseded;
                    }
                    warn!(generation, error = %e, "Decode failed, keeping previous canvas");
                    return RenderOutcome::Failed(e);
                }
            };

            if !self.is_current(generation) {
                debug!(generation, "Stale draw discarded");
                return RenderOutcome::Superseded;
            }

            let spec = self.spec;
            let layout = self.layout.clone();
            let drawn =
                tokio::task::spawn_blocking(move || draw_strips(&spec, &layout, &images)).await;
            let canvas = match drawn {
                Ok(canvas) => canvas,
                Err(e) => {
                    return RenderOutcome::Failed(CompositeError::Encode(format!(
                        "draw task failed: {}",
                        e
                    )));
                }
            };

            // Checked again under the lock: a newer render may have finished first
            let Ok(mut slot) = self.canvas.lock() else {
                return RenderOutcome::Failed(CompositeError::Encode("canvas lock poisoned".into()));
            };
            if !self.is_current(generation) {
                debug!(generation, "Stale draw discarded");
                return RenderOutcome::Superseded;
            }
            *slot = Some(canvas);
            info!(generation, "Strip rendered");
            RenderOutcome::Drawn
        }
    }

    /// Whether at least one render has completed
    pub fn has_drawn(&self) -> bool {
        self.canvas.lock().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Copy of the current canvas
    pub fn canvas(&self) -> Option<RgbImage> {
        self.canvas.lock().ok().and_then(|c| c.clone())
    }

    /// Encode the current canvas
    ///
    /// Returns `Ok(None)` before the first completed render.
    pub fn export(&self) -> Result<Option<EncodedImage>, CompositeError> {
        let Some(canvas) = self.canvas() else {
            debug!("Export requested before first draw, ignoring");
            return Ok(None);
        };
        let encoded = self
            .encoder
            .encode_jpeg(&canvas)
            .map_err(CompositeError::Encode)?;
        info!(size = encoded.data.len(), "Strip exported");
        Ok(Some(encoded))
    }

    /// Tear down: every in-flight render becomes stale
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("Compositor closed");
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Decode all photos in parallel, preserving order
async fn decode_all(photos: &PhotoSet) -> Result<Vec<RgbaImage>, CompositeError> {
    let tasks = photos.iter().cloned().enumerate().map(|(index, photo)| async move {
        tokio::task::spawn_blocking(move || photo.decode())
            .await
            .map_err(|e| CompositeError::Decode {
                index,
                reason: e.to_string(),
            })?
            .map_err(|e| CompositeError::Decode {
                index,
                reason: e.to_string(),
            })
    });
    try_join_all(tasks).await
}

/// One full draw pass: white background, then every slot of both strips
pub fn draw_strips(spec: &LayoutSpec, layout: &StripLayout, images: &[RgbaImage]) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(
        spec.canvas_width,
        spec.canvas_height,
        Rgb([255, 255, 255]),
    );

    for (_strip, index, slot) in layout.slots() {
        let Some(image) = images.get(index) else {
            continue;
        };
        let (x, y, width, height) = slot.to_pixels();
        let photo = cover_fit(image, width, height);
        imageops::replace(&mut canvas, &photo, x as i64, y as i64);
    }

    canvas
}

/// Crop `image` to the box's aspect ratio (centred) and scale it to the box
fn cover_fit(image: &RgbaImage, box_w: u32, box_h: u32) -> RgbImage {
    let crop = compute_cover_crop(
        image.width() as f64,
        image.height() as f64,
        box_w as f64,
        box_h as f64,
    );
    let (sx, sy, mut sw, mut sh) = crop.as_rect().to_pixels();
    sw = sw.min(image.width().saturating_sub(sx)).max(1);
    sh = sh.min(image.height().saturating_sub(sy)).max(1);

    let cropped = imageops::crop_imm(image, sx, sy, sw, sh).to_image();
    let scaled = imageops::resize(&cropped, box_w, box_h, FilterType::Triangle);

    // Transparent pixels are composited over the white background
    RgbImage::from_fn(box_w, box_h, |px, py| {
        let [r, g, b, a] = scaled.get_pixel(px, py).0;
        let blend = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::Photo;

    fn png(width: u32, height: u32, color: [u8; 3]) -> Photo {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Photo::from_encoded(buf)
    }

    fn set_of(color: [u8; 3]) -> PhotoSet {
        PhotoSet::new(vec![
            png(64, 36, color),
            png(36, 64, color),
            png(40, 40, color),
            png(80, 20, color),
        ])
        .unwrap()
    }

    fn compositor() -> Compositor {
        Compositor::new(LayoutSpec::default(), 90)
    }

    fn assert_color(canvas: &RgbImage, x: u32, y: u32, expected: [u8; 3]) {
        let actual = canvas.get_pixel(x, y).0;
        let close = actual
            .iter()
            .zip(expected)
            .all(|(a, e)| (*a as i16 - e as i16).abs() <= 2);
        assert!(close, "pixel ({}, {}) is {:?}, expected {:?}", x, y, actual, expected);
    }

    #[tokio::test]
    async fn draws_both_strips_on_white() {
        let compositor = compositor();
        assert_eq!(compositor.render(set_of([200, 0, 0])).await, RenderOutcome::Drawn);

        let canvas = compositor.canvas().unwrap();
        assert_eq!(canvas.dimensions(), (1050, 1500));
        assert_eq!(canvas.get_pixel(5, 5).0, [255, 255, 255]);
        // Centre of the first slot in each strip
        assert_color(&canvas, 40 + 232, 40 + 170, [200, 0, 0]);
        assert_color(&canvas, 545 + 232, 40 + 170, [200, 0, 0]);
        // Gap between the strips stays white
        assert_eq!(canvas.get_pixel(525, 200).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn drawing_twice_is_pixel_identical() {
        let compositor = compositor();
        let set = set_of([10, 120, 30]);

        compositor.render(set.clone()).await;
        let first = compositor.canvas().unwrap();
        compositor.render(set).await;
        let second = compositor.canvas().unwrap();

        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[tokio::test]
    async fn stale_render_is_suppressed() {
        let compositor = compositor();
        let stale = compositor.render(set_of([255, 0, 0]));
        let fresh = compositor.render(set_of([0, 0, 255]));

        let (stale, fresh) = futures::join!(stale, fresh);
        assert_eq!(stale, RenderOutcome::Superseded);
        assert_eq!(fresh, RenderOutcome::Drawn);
        assert_color(&compositor.canvas().unwrap(), 272, 210, [0, 0, 255]);
    }

    #[tokio::test]
    async fn stale_render_after_newer_finished_does_not_overwrite() {
        let compositor = compositor();
        let stale = compositor.render(set_of([255, 0, 0]));
        assert_eq!(compositor.render(set_of([0, 0, 255])).await, RenderOutcome::Drawn);
        assert_eq!(stale.await, RenderOutcome::Superseded);
        assert_color(&compositor.canvas().unwrap(), 272, 210, [0, 0, 255]);
    }

    #[tokio::test]
    async fn decode_failure_keeps_previous_canvas() {
        let compositor = compositor();
        compositor.render(set_of([0, 200, 0])).await;

        let broken = PhotoSet::new(vec![
            png(8, 8, [0, 0, 0]),
            Photo::from_encoded(vec![0u8, 1, 2, 3]),
            png(8, 8, [0, 0, 0]),
            png(8, 8, [0, 0, 0]),
        ])
        .unwrap();
        let outcome = compositor.render(broken).await;

        assert!(matches!(outcome, RenderOutcome::Failed(CompositeError::Decode { index: 1, .. })));
        assert_color(&compositor.canvas().unwrap(), 272, 210, [0, 200, 0]);
    }

    #[tokio::test]
    async fn close_discards_in_flight_render() {
        let compositor = compositor();
        let pending = compositor.render(set_of([255, 0, 0]));
        compositor.close();
        assert_eq!(pending.await, RenderOutcome::Superseded);
        assert!(!compositor.has_drawn());
    }

    #[test]
    fn export_before_draw_is_a_no_op() {
        assert_eq!(compositor().export().unwrap(), None);
    }

    #[tokio::test]
    async fn export_is_full_size_jpeg() {
        let compositor = compositor();
        compositor.render(set_of([90, 90, 90])).await;

        let encoded = compositor.export().unwrap().unwrap();
        assert_eq!((encoded.width, encoded.height), (1050, 1500));
        assert_eq!(image::guess_format(&encoded.data).unwrap(), image::ImageFormat::Jpeg);
    }
}
