// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for raw V4L2 buffers
//!
//! Capture devices deliver either compressed MJPEG or packed YUV 4:2:2.
//! Everything downstream works on tightly packed RGBA.

/// Convert packed 4:2:2 (YUYV or UYVY ordering) to RGBA
///
/// YUYV: Y0 U Y1 V, UYVY: U Y0 V Y1 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients.
fn packed_422_to_rgba(data: &[u8], width: u32, height: u32, luma_first: bool) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let (y0, u, y1, v) = if luma_first {
            (chunk[0], chunk[1], chunk[2], chunk[3])
        } else {
            (chunk[1], chunk[0], chunk[3], chunk[2])
        };

        for y in [y0, y1] {
            let (r, g, b) = yuv_to_rgb(y, u, v);
            rgba.extend_from_slice(&[r, g, b, 255]);

            if rgba.len() >= pixel_count * 4 {
                break;
            }
        }
        if rgba.len() >= pixel_count * 4 {
            break;
        }
    }

    // Short buffers (truncated frame) are padded with black
    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Convert YUYV (YUV 4:2:2) to RGBA
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, true)
}

/// Convert UYVY (YUV 4:2:2) to RGBA
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, false)
}

/// Decode an MJPEG buffer to RGBA
pub fn mjpeg_to_rgba(data: &[u8]) -> Result<(u32, u32, Vec<u8>), String> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| format!("MJPEG decode failed: {}", e))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, rgba.into_raw()))
}

/// Flip an RGBA buffer horizontally in place
pub fn mirror_rgba_in_place(data: &mut [u8], width: u32) {
    if width == 0 {
        return;
    }
    let row_len = width as usize * 4;
    for row in data.chunks_exact_mut(row_len) {
        let (mut left, mut right) = (0usize, width as usize - 1);
        while left < right {
            for c in 0..4 {
                row.swap(left * 4 + c, right * 4 + c);
            }
            left += 1;
            right -= 1;
        }
    }
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}
