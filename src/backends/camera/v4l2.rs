// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 webcam backend
//!
//! Opens `/dev/video*` capture devices directly. MJPEG is preferred because
//! USB webcams deliver it at full resolution; packed YUV is the fallback.

use super::format_converters::{
    mirror_rgba_in_place, mjpeg_to_rgba, uyvy_to_rgba, yuyv_to_rgba,
};
use super::types::*;
use super::{CameraBackend, CameraStream, CaptureLoopController, LoopAction};
use crate::constants::{app_info, camera};
use crate::errors::CameraError;
use futures::channel::mpsc;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Where video device nodes live
const DEVICE_DIR: &str = "/dev";

/// Consecutive dequeue failures before the capture thread gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 30;

/// Pixel layouts we know how to convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    Mjpeg,
    Yuyv,
    Uyvy,
}

impl WireFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"MJPG" => Some(Self::Mjpeg),
            b"YUYV" => Some(Self::Yuyv),
            b"UYVY" => Some(Self::Uyvy),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn is_available(&self) -> bool {
        Path::new(DEVICE_DIR).is_dir()
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let scan = scan_devices(Path::new(DEVICE_DIR), inspect_node);
        debug!(count = scan.devices.len(), nodes = scan.nodes, "Enumerated V4L2 cameras");
        scan.devices
    }

    fn acquire(&self, request: &StreamRequest) -> Result<CameraStream, CameraError> {
        let devices = scan_devices(Path::new(DEVICE_DIR), inspect_node)
            .into_devices(app_info::is_flatpak())?;
        let device = devices.get(request.device_index).cloned().ok_or_else(|| {
            CameraError::AcquisitionFailure(format!("no camera at index {}", request.device_index))
        })?;

        let (sender, receiver) = mpsc::channel(camera::FRAME_CHANNEL_CAPACITY);
        let path = device.path.clone();
        let (width, height, mirror) = (request.ideal_width, request.ideal_height, request.mirror);

        let (controller, format) = CaptureLoopController::spawn_opened(
            "v4l2-capture",
            move || open_stream(&path, width, height),
            {
                let mut sender = sender;
                let mut errors = 0u32;
                move |state: &mut OpenStream| {
                    let frame = match next_frame(state, mirror) {
                        Ok(frame) => {
                            errors = 0;
                            frame
                        }
                        Err(e) => {
                            errors += 1;
                            warn!(error = %e, errors, "Failed to capture frame");
                            return if errors >= MAX_CONSECUTIVE_ERRORS {
                                LoopAction::Stop
                            } else {
                                LoopAction::Continue
                            };
                        }
                    };
                    match sender.try_send(frame) {
                        Err(e) if e.is_disconnected() => LoopAction::Stop,
                        // Full: the consumer is behind, drop this frame
                        _ => LoopAction::Continue,
                    }
                }
            },
        )?;

        info!(device = %device.name, format = %format, "V4L2 camera streaming");
        Ok(CameraStream::new(device, format, receiver, controller))
    }
}

/// Result of looking at every `video*` node in a directory
#[derive(Debug, Default)]
struct DeviceScan {
    devices: Vec<CameraDevice>,
    /// Number of `video*` nodes found, usable or not
    nodes: usize,
    /// Open failure to report when nothing is usable; access errors win
    open_error: Option<io::Error>,
}

impl DeviceScan {
    fn record_error(&mut self, err: io::Error) {
        let keep_existing = self.open_error.as_ref().is_some_and(is_access_error);
        if !keep_existing {
            self.open_error = Some(err);
        }
    }

    /// Usable devices, or the reason there are none
    fn into_devices(self, sandboxed: bool) -> Result<Vec<CameraDevice>, CameraError> {
        if !self.devices.is_empty() {
            return Ok(self.devices);
        }
        if let Some(err) = self.open_error {
            warn!(error = %err, "No camera could be opened");
            return Err(classify_errno(
                err.raw_os_error(),
                err.kind(),
                sandboxed,
                err.to_string(),
            ));
        }
        // A sandbox without device access hides /dev/video* entirely
        Err(if sandboxed && self.nodes == 0 {
            CameraError::InsecureContext
        } else {
            CameraError::CapabilityUnavailable
        })
    }
}

/// Scan `dir` for `video*` nodes, keeping the capture devices
fn scan_devices<F>(dir: &Path, inspect: F) -> DeviceScan
where
    F: Fn(&Path) -> io::Result<Option<CameraDevice>>,
{
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("video"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut scan = DeviceScan {
        nodes: paths.len(),
        ..DeviceScan::default()
    };
    for path in paths {
        match inspect(&path) {
            Ok(Some(device)) => scan.devices.push(device),
            Ok(None) => {}
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot open video node");
                scan.record_error(e);
            }
        }
    }
    scan
}

/// Open one node and describe it if it is a capture device
fn inspect_node(path: &Path) -> io::Result<Option<CameraDevice>> {
    let dev = Device::with_path(path)?;
    let Ok(caps) = dev.query_caps() else {
        return Ok(None);
    };
    if !caps
        .capabilities
        .contains(v4l::capability::Flags::VIDEO_CAPTURE)
    {
        return Ok(None);
    }
    // Metadata nodes advertise capture but list no formats
    if dev.enum_formats().map(|f| f.is_empty()).unwrap_or(true) {
        return Ok(None);
    }

    Ok(Some(CameraDevice {
        name: caps.card,
        path: path.to_string_lossy().to_string(),
        driver: Some(caps.driver),
    }))
}

fn is_access_error(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::EACCES) | Some(libc::EPERM))
        || err.kind() == io::ErrorKind::PermissionDenied
}

struct OpenStream {
    stream: Stream<'static>,
    width: u32,
    height: u32,
    wire: WireFormat,
}

fn open_stream(
    path: &str,
    width: u32,
    height: u32,
) -> Result<(OpenStream, CameraFormat), CameraError> {
    let dev = Device::with_path(path).map_err(classify_open_error)?;

    let mut actual = dev
        .set_format(&Format::new(width, height, FourCC::new(b"MJPG")))
        .map_err(classify_open_error)?;
    if WireFormat::from_fourcc(actual.fourcc) != Some(WireFormat::Mjpeg) {
        debug!(fourcc = ?actual.fourcc, "MJPEG not accepted, trying YUYV");
        actual = dev
            .set_format(&Format::new(width, height, FourCC::new(b"YUYV")))
            .map_err(classify_open_error)?;
    }

    let wire = WireFormat::from_fourcc(actual.fourcc).ok_or_else(|| {
        CameraError::AcquisitionFailure(format!("unsupported pixel format {}", actual.fourcc))
    })?;

    let stream = Stream::with_buffers(&dev, Type::VideoCapture, camera::STREAM_BUFFERS)
        .map_err(classify_open_error)?;

    info!(
        width = actual.width,
        height = actual.height,
        fourcc = %actual.fourcc,
        "V4L2 format configured"
    );

    let format = CameraFormat {
        width: actual.width,
        height: actual.height,
        pixel_format: actual.fourcc.to_string(),
    };
    Ok((
        OpenStream {
            stream,
            width: actual.width,
            height: actual.height,
            wire,
        },
        format,
    ))
}

fn next_frame(state: &mut OpenStream, mirror: bool) -> Result<CameraFrame, String> {
    let (buf, meta) = state.stream.next().map_err(|e| e.to_string())?;
    let used = (meta.bytesused as usize).min(buf.len());
    let data = &buf[..used];

    let (width, height, mut rgba) = match state.wire {
        WireFormat::Mjpeg => mjpeg_to_rgba(data)?,
        WireFormat::Yuyv => (
            state.width,
            state.height,
            yuyv_to_rgba(data, state.width, state.height),
        ),
        WireFormat::Uyvy => (
            state.width,
            state.height,
            uyvy_to_rgba(data, state.width, state.height),
        ),
    };
    if mirror {
        mirror_rgba_in_place(&mut rgba, width);
    }

    CameraFrame::from_rgba(width, height, rgba).ok_or_else(|| "frame size mismatch".to_string())
}

/// Map an open/configure failure onto the user-facing categories
pub fn classify_open_error(err: io::Error) -> CameraError {
    classify_errno(
        err.raw_os_error(),
        err.kind(),
        app_info::is_flatpak(),
        err.to_string(),
    )
}

fn classify_errno(
    errno: Option<i32>,
    kind: io::ErrorKind,
    sandboxed: bool,
    detail: String,
) -> CameraError {
    match errno {
        Some(libc::EACCES) | Some(libc::EPERM) if sandboxed => CameraError::InsecureContext,
        Some(libc::EACCES) | Some(libc::EPERM) => CameraError::PermissionDenied,
        Some(libc::ENOENT) | Some(libc::ENODEV) | Some(libc::ENXIO) if sandboxed => {
            CameraError::InsecureContext
        }
        _ if kind == io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
        _ => CameraError::AcquisitionFailure(detail),
    }
}
