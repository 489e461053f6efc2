// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! The backend layer hides how frames are obtained, so the capture session
//! only ever sees a [`camera::CameraStream`] of RGBA frames:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │           Capture session / Booth           │
//! └────────────────────┬────────────────────────┘
//!                      │ CameraStream
//! ┌────────────────────┴────────────────────────┐
//! │               Camera backends               │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │    V4L2     │    │ Virtual camera   │    │
//! │  │  (/dev/*)   │    │ (still / test)   │    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod camera;
