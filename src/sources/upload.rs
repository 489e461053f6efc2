// SPDX-License-Identifier: GPL-3.0-only

//! Upload variant: a batch of user-selected files
//!
//! A selection replaces the previous one as a whole. Anything beyond four
//! files is ignored; fewer than four blocks confirmation until the user
//! selects again; an empty selection means "back".

use super::SourceOutcome;
use crate::constants::PHOTOS_PER_SESSION;
use crate::errors::SelectionError;
use crate::photo::{Photo, PhotoSet};
use futures::future::try_join_all;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a selection led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// Four photos loaded, confirmation allowed
    Complete,
    /// Too few photos; re-selection required
    Incomplete { count: usize },
    /// Nothing selected: go back
    Empty,
}

/// Batch file selection
#[derive(Debug, Default)]
pub struct UploadSource {
    photos: Vec<Photo>,
}

impl UploadSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Photos of the current selection
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Replace the current selection with `files`
    ///
    /// The previous batch is discarded before anything is read, so a failed
    /// selection leaves nothing selected.
    pub async fn select(&mut self, files: Vec<PathBuf>) -> Result<SelectionState, SelectionError> {
        self.photos.clear();

        if files.is_empty() {
            info!("Empty selection");
            return Ok(SelectionState::Empty);
        }
        if files.len() > PHOTOS_PER_SESSION {
            debug!(selected = files.len(), "Ignoring files beyond the fourth");
        }

        let reads = files
            .into_iter()
            .take(PHOTOS_PER_SESSION)
            .map(|path| async move { read_photo(&path).await });
        self.photos = try_join_all(reads).await?;

        info!(count = self.photos.len(), "Photos selected");
        Ok(self.state())
    }

    /// Current selection state
    pub fn state(&self) -> SelectionState {
        match self.photos.len() {
            0 => SelectionState::Empty,
            n if n < PHOTOS_PER_SESSION => SelectionState::Incomplete { count: n },
            _ => SelectionState::Complete,
        }
    }

    pub fn can_confirm(&self) -> bool {
        self.state() == SelectionState::Complete
    }

    /// Hand the selection to the editor
    pub fn confirm(&self) -> Result<SourceOutcome, SelectionError> {
        let count = self.photos.len();
        let set = PhotoSet::new(self.photos.clone()).map_err(|_| {
            SelectionError::IncompleteSelection {
                count,
                required: PHOTOS_PER_SESSION,
            }
        })?;
        Ok(SourceOutcome::Complete(set))
    }

    /// Leave the upload stage without photos
    pub fn back(&mut self) -> SourceOutcome {
        self.photos.clear();
        SourceOutcome::Back
    }

    /// One-shot selection: select, then confirm or go back
    pub async fn from_paths(files: Vec<PathBuf>) -> Result<SourceOutcome, SelectionError> {
        let mut source = Self::new();
        match source.select(files).await? {
            SelectionState::Empty => Ok(source.back()),
            _ => source.confirm(),
        }
    }
}

/// Read and sanity-check one selected file
async fn read_photo(path: &Path) -> Result<Photo, SelectionError> {
    let unreadable = |reason: String| SelectionError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| unreadable(e.to_string()))?;

    // Only the header is parsed here; full decoding happens in the compositor
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| unreadable(e.to_string()))?
        .into_dimensions()
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Selected file is not an image");
            unreadable(e.to_string())
        })?;

    debug!(path = %path.display(), width, height, "Photo loaded");
    Ok(Photo::from_file(bytes, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_images(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("photo{}.png", i));
                image::RgbImage::from_pixel(4, 3, image::Rgb([i as u8 * 40, 0, 0]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn four_files_can_be_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_images(dir.path(), 4);
        let mut source = UploadSource::new();

        assert_eq!(source.select(files.clone()).await.unwrap(), SelectionState::Complete);
        let set = source.confirm().unwrap().into_photos().unwrap();
        let origins: Vec<_> = set.iter().map(|p| p.origin_file().unwrap().to_path_buf()).collect();
        assert_eq!(origins, files);
    }

    #[tokio::test]
    async fn two_files_block_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = UploadSource::new();

        let state = source.select(write_images(dir.path(), 2)).await.unwrap();
        assert_eq!(state, SelectionState::Incomplete { count: 2 });
        assert!(!source.can_confirm());
        assert_eq!(
            source.confirm().unwrap_err(),
            SelectionError::IncompleteSelection {
                count: 2,
                required: 4
            }
        );
    }

    #[tokio::test]
    async fn zero_files_go_back() {
        let outcome = UploadSource::from_paths(Vec::new()).await.unwrap();
        assert!(matches!(outcome, SourceOutcome::Back));
    }

    #[tokio::test]
    async fn extra_files_are_truncated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_images(dir.path(), 6);
        let mut source = UploadSource::new();

        assert_eq!(source.select(files.clone()).await.unwrap(), SelectionState::Complete);
        let origins: Vec<_> = source.photos().iter().map(|p| p.origin_file().unwrap()).collect();
        assert_eq!(origins, files[..4].iter().map(|p| p.as_path()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn reselection_replaces_previous_batch() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_images(dir.path(), 4);
        let mut source = UploadSource::new();

        source.select(files[..2].to_vec()).await.unwrap();
        source.select(files[2..].to_vec()).await.unwrap();
        assert_eq!(source.state(), SelectionState::Incomplete { count: 2 });
        assert_eq!(source.photos()[0].origin_file(), Some(files[2].as_path()));
    }

    #[tokio::test]
    async fn unreadable_file_rejects_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = write_images(dir.path(), 3);
        let bogus = dir.path().join("notes.txt");
        std::fs::write(&bogus, b"not an image").unwrap();
        files.push(bogus.clone());

        let mut source = UploadSource::new();
        let err = source.select(files).await.unwrap_err();
        assert!(matches!(err, SelectionError::Unreadable { ref path, .. } if *path == bogus));
        assert!(source.photos().is_empty());
    }
}
