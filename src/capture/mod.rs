// SPDX-License-Identifier: GPL-3.0-only

//! Camera-mode acquisition of four photos
//!
//! [`state`] holds the pure timer state machine, [`session`] runs it against
//! a live camera stream.

pub mod session;
pub mod state;

pub use session::{CaptureView, SessionControl, SessionDriver, SessionHandle, SessionOutcome};
pub use state::{CaptureSession, Phase, SessionCommand, SessionMessage, SessionTiming};
