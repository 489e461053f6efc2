// SPDX-License-Identifier: GPL-3.0-only

//! Photo payloads and the four-photo working set

use crate::constants::PHOTOS_PER_SESSION;
use base64::Engine;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One captured or selected photo
///
/// The payload is the encoded image exactly as captured or read from disk.
/// Photos are never mutated once created; the session only appends them or
/// replaces the whole set.
#[derive(Debug, Clone)]
pub struct Photo {
    src: Arc<[u8]>,
    origin_file: Option<PathBuf>,
    captured_at: DateTime<Local>,
}

impl Photo {
    /// Photo from an encoded payload (camera snapshot)
    pub fn from_encoded(src: impl Into<Arc<[u8]>>) -> Self {
        Self {
            src: src.into(),
            origin_file: None,
            captured_at: Local::now(),
        }
    }

    /// Photo read from a user-selected file
    pub fn from_file(src: impl Into<Arc<[u8]>>, origin: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            origin_file: Some(origin.into()),
            captured_at: Local::now(),
        }
    }

    /// Encoded image payload
    pub fn src(&self) -> &[u8] {
        &self.src
    }

    /// Original file, present only for uploads
    pub fn origin_file(&self) -> Option<&Path> {
        self.origin_file.as_deref()
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    /// MIME type guessed from the payload's magic bytes
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.src)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream")
    }

    /// `data:` URI form of the payload
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.src)
        )
    }

    /// Decode the payload into RGBA pixels
    pub fn decode(&self) -> image::ImageResult<image::RgbaImage> {
        Ok(image::load_from_memory(&self.src)?.to_rgba8())
    }
}

/// Exactly four photos in capture/selection order
///
/// This is the hand-off value between the capture stage and the editor
/// stage. Cloning is cheap (payloads are shared).
#[derive(Debug, Clone)]
pub struct PhotoSet {
    photos: Arc<[Photo; PHOTOS_PER_SESSION]>,
}

impl PhotoSet {
    /// Build a set from exactly four photos; returns the input otherwise
    pub fn new(photos: Vec<Photo>) -> Result<Self, Vec<Photo>> {
        let photos: [Photo; PHOTOS_PER_SESSION] = photos.try_into()?;
        Ok(Self {
            photos: Arc::new(photos),
        })
    }

    pub fn photos(&self) -> &[Photo] {
        self.photos.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Photo> {
        self.photos.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn data_uri_uses_detected_mime_type() {
        let photo = Photo::from_encoded(png_bytes());
        let uri = photo.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(photo.origin_file().is_none());
    }

    #[test]
    fn file_photo_keeps_origin() {
        let photo = Photo::from_file(png_bytes(), "/tmp/a.png");
        assert_eq!(photo.origin_file(), Some(Path::new("/tmp/a.png")));
        assert_eq!(photo.decode().unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn photo_set_requires_exactly_four() {
        let photo = Photo::from_encoded(png_bytes());
        assert!(PhotoSet::new(vec![photo.clone(); 3]).is_err());
        assert!(PhotoSet::new(vec![photo.clone(); 5]).is_err());

        let set = PhotoSet::new(vec![photo; 4]).unwrap();
        assert_eq!(set.photos().len(), 4);
    }
}
