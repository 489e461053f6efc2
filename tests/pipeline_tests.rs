// SPDX-License-Identifier: GPL-3.0-only

//! Upload to export, end to end

use image::{Rgb, RgbImage};
use photostrip::config::ExportSettings;
use photostrip::sources::UploadSource;
use photostrip::{Compositor, LayoutSpec, RenderOutcome, SelectionError, SourceOutcome, storage};
use std::path::{Path, PathBuf};

fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb(color)).save(&path).unwrap();
    path
}

#[tokio::test]
async fn test_upload_compose_and_save() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let files = vec![
        write_png(input.path(), "a.png", 320, 180, [255, 0, 0]),
        write_png(input.path(), "b.png", 180, 320, [0, 255, 0]),
        write_png(input.path(), "c.png", 200, 200, [0, 0, 255]),
        write_png(input.path(), "d.png", 400, 100, [255, 255, 0]),
        // Fifth file is ignored
        write_png(input.path(), "e.png", 50, 50, [0, 0, 0]),
    ];

    let SourceOutcome::Complete(set) = UploadSource::from_paths(files).await.unwrap() else {
        panic!("expected a complete selection");
    };
    assert_eq!(set.photos().len(), 4);

    let compositor = Compositor::new(LayoutSpec::default(), 90);
    assert_eq!(compositor.render(set).await, RenderOutcome::Drawn);

    let canvas = compositor.canvas().unwrap();
    // Left and right strips carry the same pixels
    let layout = compositor.layout().clone();
    let (left_x, _, width, _) = layout.slot(0, 0).to_pixels();
    let (right_x, _, _, _) = layout.slot(1, 0).to_pixels();
    for y in (40..1460).step_by(37) {
        for dx in (0..width).step_by(23) {
            assert_eq!(canvas.get_pixel(left_x + dx, y), canvas.get_pixel(right_x + dx, y));
        }
    }

    let encoded = compositor.export().unwrap().unwrap();
    let settings = ExportSettings {
        output_dir: Some(output.path().join("strips")),
        ..ExportSettings::default()
    };
    let path = storage::save_export(&encoded, &settings).await.unwrap();

    assert_eq!(path, output.path().join("strips").join("photostrip.jpg"));
    let saved = image::open(&path).unwrap();
    assert_eq!((saved.width(), saved.height()), (1050, 1500));
}

#[tokio::test]
async fn test_three_files_are_rejected() {
    let input = tempfile::tempdir().unwrap();
    let files = (0..3)
        .map(|i| write_png(input.path(), &format!("{}.png", i), 10, 10, [1, 2, 3]))
        .collect();

    let result = UploadSource::from_paths(files).await;
    assert!(matches!(
        result,
        Err(SelectionError::IncompleteSelection { count: 3, required: 4 })
    ));
}

#[tokio::test]
async fn test_no_files_goes_back() {
    let outcome = UploadSource::from_paths(Vec::new()).await.unwrap();
    assert!(matches!(outcome, SourceOutcome::Back));
}
