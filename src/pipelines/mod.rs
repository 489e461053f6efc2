// SPDX-License-Identifier: GPL-3.0-only

//! Image pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │ Photo (JPEG) │
//! │   (RGBA)     │     │  - Snapshot       │     │              │
//! └──────────────┘     └───────────────────┘     └──────┬───────┘
//!                                                       │ x4
//!                      ┌───────────────────┐     ┌──────▼───────┐
//!   photostrip.jpg ◀── │  Strip Pipeline   │ ◀── │   PhotoSet   │
//!                      │  - Decode, crop   │     │              │
//!                      │  - Draw, export   │     │              │
//!                      └───────────────────┘     └──────────────┘
//! ```
//!
//! CPU-heavy steps (decoding, drawing, encoding) run on the blocking pool so
//! the booth keeps refreshing while they work.

pub mod photo;
pub mod strip;
