// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the strip layout and cover-crop math

use photostrip::geometry::{LayoutSpec, compute_cover_crop, compute_strip_layout};

const EPS: f64 = 1e-9;

#[test]
fn test_default_layout_values() {
    let strip = LayoutSpec::default().strip_layout();

    assert!((strip.strip_width - 465.0).abs() < EPS);
    assert!((strip.photo_height - 340.0).abs() < EPS);
    assert_eq!(strip.x_positions, [40.0, 545.0]);
    assert_eq!(strip.y_positions, vec![40.0, 400.0, 760.0, 1120.0]);
}

#[test]
fn test_layout_fills_canvas_exactly() {
    for (w, h, outer, inner) in [
        (1050.0, 1500.0, 40.0, 20.0),
        (800.0, 1200.0, 10.0, 5.0),
        (2100.0, 3000.0, 80.0, 40.0),
        (1000.0, 1000.0, 0.0, 0.0),
    ] {
        let strip = compute_strip_layout(w, h, outer, inner, 4);

        // Right strip ends one outer padding before the right edge
        let right_edge = strip.x_positions[1] + strip.strip_width;
        assert!((right_edge + outer - w).abs() < EPS, "{}x{}", w, h);

        // Last photo ends one outer padding before the bottom edge
        let bottom = strip.y_positions[3] + strip.photo_height;
        assert!((bottom + outer - h).abs() < EPS, "{}x{}", w, h);

        // Consecutive slots are one photo plus one gap apart
        for pair in strip.y_positions.windows(2) {
            assert!((pair[1] - pair[0] - strip.photo_height - inner).abs() < EPS);
        }
    }
}

#[test]
fn test_both_strips_share_rows() {
    let strip = LayoutSpec::default().strip_layout();
    for index in 0..4 {
        let left = strip.slot(0, index);
        let right = strip.slot(1, index);
        assert_eq!(left.y, right.y);
        assert_eq!(left.width, right.width);
        assert_eq!(left.height, right.height);
    }
    assert_eq!(strip.slots().count(), 8);
}

#[test]
fn test_cover_crop_stays_inside_and_matches_box_ratio() {
    let images = [(1280.0, 720.0), (720.0, 1280.0), (640.0, 640.0), (4000.0, 1000.0), (3.0, 7.0)];
    let boxes = [(465.0, 340.0), (100.0, 100.0), (340.0, 465.0), (1.0, 5.0)];

    for (img_w, img_h) in images {
        for (box_w, box_h) in boxes {
            let crop = compute_cover_crop(img_w, img_h, box_w, box_h);

            assert!(crop.sx >= -EPS && crop.sy >= -EPS);
            assert!(crop.sx + crop.width <= img_w + 1e-6);
            assert!(crop.sy + crop.height <= img_h + 1e-6);

            let ratio = crop.width / crop.height;
            assert!((ratio - box_w / box_h).abs() < 1e-6);

            // Cropped along one axis only, centred on the other
            let full_width = (crop.width - img_w).abs() < 1e-6;
            let full_height = (crop.height - img_h).abs() < 1e-6;
            assert!(full_width || full_height);
            if full_height {
                assert!((crop.sx * 2.0 + crop.width - img_w).abs() < 1e-6);
            } else {
                assert!((crop.sy * 2.0 + crop.height - img_h).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn test_cover_crop_wide_camera_frame() {
    // 1280x720 into a 465x340 slot: full height, sides trimmed
    let crop = compute_cover_crop(1280.0, 720.0, 465.0, 340.0);
    assert_eq!(crop.sy, 0.0);
    assert!((crop.height - 720.0).abs() < EPS);
    assert!((crop.width - 720.0 * 465.0 / 340.0).abs() < 1e-6);
}
