// SPDX-License-Identifier: GPL-3.0-only

//! Photo strip pipeline
//!
//! ```text
//! PhotoSet ──▶ parallel decode ──▶ cover crop + scale ──▶ 1050x1500 canvas
//!                                                              │
//!                                               export (JPEG 90) ──▶ file
//! ```

pub mod compositor;

pub use compositor::{Compositor, RenderOutcome, draw_strips};
