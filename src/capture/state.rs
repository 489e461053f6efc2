// SPDX-License-Identifier: GPL-3.0-only

//! Capture timer state machine
//!
//! One authoritative [`Phase`] plus a pure [`CaptureSession::update`] that
//! consumes a [`SessionMessage`] and returns the [`SessionCommand`]s the
//! driver must carry out. Timers never touch state directly: they only
//! deliver messages, and a message that does not fit the current phase is
//! dropped.
//!
//! ```text
//! Idle ─Start─▶ Countdown(n) ─Tick…─▶ Capturing ─Snapshot─▶ Cooldown
//!                    ▲                                         │
//!                    └──────────── fewer than 4 ◀──────────────┤
//!                                                              ▼
//!                          HandedOff ◀─CompletionElapsed─ SessionComplete
//!
//! any non-terminal phase ─Cancel─▶ Cancelled
//! ```

use crate::backends::camera::types::CameraFrame;
use crate::constants::{PHOTOS_PER_SESSION, timing};
use crate::errors::CameraError;
use crate::photo::{Photo, PhotoSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timer values of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Countdown start value before each photo
    pub countdown_start: u32,
    /// Length of one countdown step
    pub time_unit: Duration,
    /// How long the flash stays visible
    pub flash: Duration,
    /// Pause after each capture, in time units
    pub cooldown_units: u32,
    /// Pause between the last cooldown and hand-off, in time units
    pub completion_units: u32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            countdown_start: timing::COUNTDOWN_START,
            time_unit: timing::TIME_UNIT,
            flash: timing::FLASH_DURATION,
            cooldown_units: timing::COOLDOWN_UNITS,
            completion_units: timing::COMPLETION_UNITS,
        }
    }
}

impl SessionTiming {
    /// Simulated time from Start to hand-off when nothing goes wrong
    pub fn total_duration(&self) -> Duration {
        let per_photo = self.time_unit * (self.countdown_start + self.cooldown_units);
        per_photo * PHOTOS_PER_SESSION as u32 + self.time_unit * self.completion_units
    }

    fn cooldown(&self) -> Duration {
        self.time_unit * self.cooldown_units
    }

    fn completion(&self) -> Duration {
        self.time_unit * self.completion_units
    }
}

/// Current phase of the acquisition run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Live preview, waiting for the user to start
    #[default]
    Idle,
    /// Counting down to the next capture; the value is what the user sees
    Countdown(u32),
    /// Waiting for the snapshot of the current live frame
    Capturing,
    /// Freeze-frame visible, pausing before the next countdown
    Cooldown,
    /// Four photos taken, final pause before hand-off
    SessionComplete,
    /// Photos delivered to the next stage
    HandedOff,
    /// Aborted by the user; nothing is delivered
    Cancelled,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::HandedOff | Phase::Cancelled)
    }

    /// Whether a run is in progress (Start was accepted and not finished)
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Phase::Countdown(_) | Phase::Capturing | Phase::Cooldown | Phase::SessionComplete
        )
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// First playable frame arrived
    CameraReady,
    /// The stream could not be acquired or died before the first frame
    CameraFailed(CameraError),
    /// User pressed start
    Start,
    /// One countdown step elapsed
    Tick,
    /// Snapshot of the live frame is ready
    Snapshot {
        photo: Photo,
        frame: Arc<CameraFrame>,
    },
    /// No frame (or an unencodable one) was available
    SnapshotFailed(String),
    /// Time to retry a failed snapshot
    RetrySnapshot,
    /// Flash pulse with this sequence number is over
    FlashElapsed(u32),
    CooldownElapsed,
    CompletionElapsed,
    /// User cancelled or the stage was torn down
    Cancel,
}

/// Effects requested by the state machine
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Deliver `message` after `after`
    Schedule {
        after: Duration,
        message: SessionMessage,
    },
    /// Encode the current live frame and reply with Snapshot/SnapshotFailed
    TakeSnapshot,
    /// Stop the camera stream
    ReleaseStream,
    /// Hand the photos to the next stage
    Finish(PhotoSet),
    /// Return to the caller without photos
    Back,
}

/// Ephemeral state of one four-photo acquisition run
#[derive(Debug, Clone)]
pub struct CaptureSession {
    timing: SessionTiming,
    phase: Phase,
    photos: Vec<Photo>,
    flash_active: bool,
    freeze_frame: Option<Arc<CameraFrame>>,
    camera_ready: bool,
    error: Option<CameraError>,
    flashes: u32,
    freeze_updates: u32,
}

impl CaptureSession {
    pub fn new(timing: SessionTiming) -> Self {
        Self {
            timing,
            phase: Phase::Idle,
            photos: Vec::with_capacity(PHOTOS_PER_SESSION),
            flash_active: false,
            freeze_frame: None,
            camera_ready: false,
            error: None,
            flashes: 0,
            freeze_updates: 0,
        }
    }

    pub fn timing(&self) -> &SessionTiming {
        &self.timing
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Visible countdown value, `None` outside Countdown
    pub fn countdown(&self) -> Option<u32> {
        match self.phase {
            Phase::Countdown(n) => Some(n),
            _ => None,
        }
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn flash_active(&self) -> bool {
        self.flash_active
    }

    /// Last captured frame, masking the live feed between shots
    pub fn freeze_frame(&self) -> Option<&Arc<CameraFrame>> {
        self.freeze_frame.as_ref()
    }

    pub fn camera_ready(&self) -> bool {
        self.camera_ready
    }

    pub fn error(&self) -> Option<&CameraError> {
        self.error.as_ref()
    }

    /// Number of flash pulses triggered so far
    pub fn flashes(&self) -> u32 {
        self.flashes
    }

    /// Number of times the freeze-frame was replaced by a new capture
    pub fn freeze_updates(&self) -> u32 {
        self.freeze_updates
    }

    /// Whether Start would be accepted now
    pub fn can_start(&self) -> bool {
        self.phase == Phase::Idle && self.camera_ready && self.error.is_none()
    }

    /// Apply one message
    pub fn update(&mut self, message: SessionMessage) -> Vec<SessionCommand> {
        if self.phase.is_terminal() {
            debug!(phase = ?self.phase, ?message, "Session finished, ignoring message");
            return Vec::new();
        }

        match message {
            SessionMessage::CameraReady => self.handle_camera_ready(),
            SessionMessage::CameraFailed(err) => self.handle_camera_failed(err),
            SessionMessage::Start => self.handle_start(),
            SessionMessage::Tick => self.handle_tick(),
            SessionMessage::Snapshot { photo, frame } => self.handle_snapshot(photo, frame),
            SessionMessage::SnapshotFailed(reason) => self.handle_snapshot_failed(reason),
            SessionMessage::RetrySnapshot => self.handle_retry_snapshot(),
            SessionMessage::FlashElapsed(seq) => self.handle_flash_elapsed(seq),
            SessionMessage::CooldownElapsed => self.handle_cooldown_elapsed(),
            SessionMessage::CompletionElapsed => self.handle_completion_elapsed(),
            SessionMessage::Cancel => self.handle_cancel(),
        }
    }

    fn handle_camera_ready(&mut self) -> Vec<SessionCommand> {
        if !self.camera_ready {
            info!("Camera ready");
            self.camera_ready = true;
        }
        Vec::new()
    }

    fn handle_camera_failed(&mut self, err: CameraError) -> Vec<SessionCommand> {
        // All four photos are in, only the hand-off delay is left
        if self.phase == Phase::SessionComplete {
            warn!(error = %err, "Camera stopped after the last capture");
            return vec![SessionCommand::ReleaseStream];
        }
        if self.phase.is_running() {
            warn!(
                error = %err,
                captured = self.photos.len(),
                "Camera failed during a run, discarding photos"
            );
            self.photos.clear();
            self.freeze_frame = None;
            self.flash_active = false;
        } else {
            warn!(error = %err, "Camera unavailable");
        }
        // Pending timers find Idle and do nothing
        self.phase = Phase::Idle;
        self.camera_ready = false;
        self.error = Some(err);
        vec![SessionCommand::ReleaseStream]
    }

    fn handle_start(&mut self) -> Vec<SessionCommand> {
        if !self.can_start() {
            debug!(phase = ?self.phase, ready = self.camera_ready, "Start ignored");
            return Vec::new();
        }
        info!("Capture session started");
        self.begin_countdown()
    }

    fn begin_countdown(&mut self) -> Vec<SessionCommand> {
        self.freeze_frame = None;
        let start = self.timing.countdown_start;
        if start == 0 {
            self.phase = Phase::Capturing;
            return vec![SessionCommand::TakeSnapshot];
        }
        self.phase = Phase::Countdown(start);
        debug!(remaining = start, "Countdown started");
        vec![self.schedule(self.timing.time_unit, SessionMessage::Tick)]
    }

    fn handle_tick(&mut self) -> Vec<SessionCommand> {
        let Phase::Countdown(remaining) = self.phase else {
            debug!(phase = ?self.phase, "Stale countdown tick");
            return Vec::new();
        };

        if remaining <= 1 {
            info!(photo = self.photos.len() + 1, "Countdown complete - capturing");
            self.phase = Phase::Capturing;
            vec![SessionCommand::TakeSnapshot]
        } else {
            self.phase = Phase::Countdown(remaining - 1);
            debug!(remaining = remaining - 1, "Countdown tick");
            vec![self.schedule(self.timing.time_unit, SessionMessage::Tick)]
        }
    }

    fn handle_snapshot(&mut self, photo: Photo, frame: Arc<CameraFrame>) -> Vec<SessionCommand> {
        if self.phase != Phase::Capturing || self.photos.len() >= PHOTOS_PER_SESSION {
            debug!(phase = ?self.phase, "Unexpected snapshot discarded");
            return Vec::new();
        }

        self.photos.push(photo);
        self.freeze_frame = Some(frame);
        self.freeze_updates += 1;
        self.flash_active = true;
        self.flashes += 1;
        self.phase = Phase::Cooldown;
        info!(count = self.photos.len(), "Photo captured");

        vec![
            self.schedule(self.timing.flash, SessionMessage::FlashElapsed(self.flashes)),
            self.schedule(self.timing.cooldown(), SessionMessage::CooldownElapsed),
        ]
    }

    fn handle_snapshot_failed(&mut self, reason: String) -> Vec<SessionCommand> {
        if self.phase != Phase::Capturing {
            return Vec::new();
        }
        warn!(%reason, "Snapshot failed, retrying");
        vec![self.schedule(timing::SNAPSHOT_RETRY, SessionMessage::RetrySnapshot)]
    }

    fn handle_retry_snapshot(&mut self) -> Vec<SessionCommand> {
        if self.phase != Phase::Capturing {
            return Vec::new();
        }
        vec![SessionCommand::TakeSnapshot]
    }

    fn handle_flash_elapsed(&mut self, seq: u32) -> Vec<SessionCommand> {
        // A pulse from an earlier capture must not cut a newer one short
        if seq == self.flashes {
            self.flash_active = false;
        }
        Vec::new()
    }

    fn handle_cooldown_elapsed(&mut self) -> Vec<SessionCommand> {
        if self.phase != Phase::Cooldown {
            return Vec::new();
        }
        if self.photos.len() >= PHOTOS_PER_SESSION {
            info!("All photos captured");
            self.phase = Phase::SessionComplete;
            vec![self.schedule(self.timing.completion(), SessionMessage::CompletionElapsed)]
        } else {
            self.begin_countdown()
        }
    }

    fn handle_completion_elapsed(&mut self) -> Vec<SessionCommand> {
        if self.phase != Phase::SessionComplete {
            return Vec::new();
        }
        match PhotoSet::new(std::mem::take(&mut self.photos)) {
            Ok(set) => {
                info!("Handing off photo set");
                self.phase = Phase::HandedOff;
                self.flash_active = false;
                vec![SessionCommand::ReleaseStream, SessionCommand::Finish(set)]
            }
            Err(photos) => {
                // Unreachable through update; keep the photos and stay put
                warn!(count = photos.len(), "Completion without a full set");
                self.photos = photos;
                Vec::new()
            }
        }
    }

    fn handle_cancel(&mut self) -> Vec<SessionCommand> {
        info!(phase = ?self.phase, captured = self.photos.len(), "Capture session cancelled");
        self.phase = Phase::Cancelled;
        self.photos.clear();
        self.freeze_frame = None;
        self.flash_active = false;
        vec![SessionCommand::ReleaseStream, SessionCommand::Back]
    }

    fn schedule(&self, after: Duration, message: SessionMessage) -> SessionCommand {
        SessionCommand::Schedule { after, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Arc<CameraFrame> {
        Arc::new(CameraFrame::from_rgba(2, 2, vec![0; 16]).unwrap())
    }

    fn snapshot() -> SessionMessage {
        SessionMessage::Snapshot {
            photo: Photo::from_encoded(vec![1u8, 2, 3]),
            frame: frame(),
        }
    }

    fn ready_session() -> CaptureSession {
        let mut session = CaptureSession::new(SessionTiming::default());
        session.update(SessionMessage::CameraReady);
        session
    }

    fn scheduled(commands: &[SessionCommand]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|c| match c {
                SessionCommand::Schedule { message, .. } => Some(format!("{:?}", message)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_requires_ready_camera() {
        let mut session = CaptureSession::new(SessionTiming::default());
        assert!(session.update(SessionMessage::Start).is_empty());
        assert_eq!(session.phase(), Phase::Idle);

        session.update(SessionMessage::CameraReady);
        let commands = session.update(SessionMessage::Start);
        assert_eq!(session.phase(), Phase::Countdown(2));
        assert_eq!(scheduled(&commands), vec!["Tick"]);
    }

    #[test]
    fn camera_failure_keeps_session_idle() {
        let mut session = CaptureSession::new(SessionTiming::default());
        let commands = session.update(SessionMessage::CameraFailed(CameraError::PermissionDenied));
        assert!(matches!(commands[..], [SessionCommand::ReleaseStream]));
        assert_eq!(session.error(), Some(&CameraError::PermissionDenied));

        session.update(SessionMessage::CameraReady);
        assert!(session.update(SessionMessage::Start).is_empty());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn camera_failure_mid_run_aborts_to_idle_with_error() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        session.update(SessionMessage::Tick);
        session.update(SessionMessage::Tick);
        session.update(snapshot());

        let lost = CameraError::AcquisitionFailure("stream ended".into());
        let commands = session.update(SessionMessage::CameraFailed(lost.clone()));
        assert!(matches!(commands[..], [SessionCommand::ReleaseStream]));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.error(), Some(&lost));
        assert!(!session.camera_ready());
        assert!(session.photos().is_empty());
        assert!(session.freeze_frame().is_none());

        // Timers from the aborted run change nothing
        assert!(session.update(SessionMessage::CooldownElapsed).is_empty());
        assert!(session.update(SessionMessage::Tick).is_empty());
        assert!(session.update(SessionMessage::Start).is_empty());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn camera_failure_after_last_capture_still_hands_off() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        for _ in 0..PHOTOS_PER_SESSION {
            session.update(SessionMessage::Tick);
            session.update(SessionMessage::Tick);
            session.update(snapshot());
            session.update(SessionMessage::CooldownElapsed);
        }
        session.update(SessionMessage::CameraFailed(CameraError::AcquisitionFailure(
            "unplugged".into(),
        )));
        assert_eq!(session.phase(), Phase::SessionComplete);

        let commands = session.update(SessionMessage::CompletionElapsed);
        assert!(matches!(
            commands[..],
            [SessionCommand::ReleaseStream, SessionCommand::Finish(_)]
        ));
    }

    #[test]
    fn countdown_reaches_capture_after_start_value_ticks() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        session.update(SessionMessage::Tick);
        assert_eq!(session.countdown(), Some(1));
        let commands = session.update(SessionMessage::Tick);
        assert_eq!(session.phase(), Phase::Capturing);
        assert!(matches!(commands[..], [SessionCommand::TakeSnapshot]));
    }

    #[test]
    fn capture_sets_flash_freeze_frame_and_appends() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        session.update(SessionMessage::Tick);
        session.update(SessionMessage::Tick);
        let commands = session.update(snapshot());

        assert_eq!(session.phase(), Phase::Cooldown);
        assert_eq!(session.photos().len(), 1);
        assert!(session.flash_active());
        assert!(session.freeze_frame().is_some());
        assert_eq!(scheduled(&commands), vec!["FlashElapsed(1)", "CooldownElapsed"]);

        session.update(SessionMessage::FlashElapsed(1));
        assert!(!session.flash_active());
    }

    #[test]
    fn restarting_countdown_clears_freeze_frame() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        session.update(SessionMessage::Tick);
        session.update(SessionMessage::Tick);
        session.update(snapshot());
        session.update(SessionMessage::CooldownElapsed);

        assert_eq!(session.phase(), Phase::Countdown(2));
        assert!(session.freeze_frame().is_none());
    }

    #[test]
    fn full_run_hands_off_four_photos() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        for _ in 0..PHOTOS_PER_SESSION {
            session.update(SessionMessage::Tick);
            session.update(SessionMessage::Tick);
            session.update(snapshot());
            session.update(SessionMessage::CooldownElapsed);
        }
        assert_eq!(session.phase(), Phase::SessionComplete);

        let commands = session.update(SessionMessage::CompletionElapsed);
        assert_eq!(session.phase(), Phase::HandedOff);
        assert!(matches!(
            commands[..],
            [SessionCommand::ReleaseStream, SessionCommand::Finish(_)]
        ));
        assert_eq!(session.flashes(), 4);
        assert_eq!(session.freeze_updates(), 4);
    }

    #[test]
    fn snapshot_outside_capturing_is_ignored() {
        let mut session = ready_session();
        assert!(session.update(snapshot()).is_empty());
        session.update(SessionMessage::Start);
        assert!(session.update(snapshot()).is_empty());
        assert!(session.photos().is_empty());
    }

    #[test]
    fn cancel_is_absorbing() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        session.update(SessionMessage::Tick);

        let commands = session.update(SessionMessage::Cancel);
        assert!(matches!(
            commands[..],
            [SessionCommand::ReleaseStream, SessionCommand::Back]
        ));
        assert_eq!(session.phase(), Phase::Cancelled);

        assert!(session.update(SessionMessage::Tick).is_empty());
        assert!(session.update(snapshot()).is_empty());
        assert!(session.update(SessionMessage::Cancel).is_empty());
        assert!(session.photos().is_empty());
    }

    #[test]
    fn stale_flash_does_not_clear_newer_flash() {
        let timing = SessionTiming {
            time_unit: Duration::from_millis(10),
            ..SessionTiming::default()
        };
        let mut session = CaptureSession::new(timing);
        session.update(SessionMessage::CameraReady);
        session.update(SessionMessage::Start);
        for _ in 0..2 {
            session.update(SessionMessage::Tick);
            session.update(SessionMessage::Tick);
            session.update(snapshot());
            session.update(SessionMessage::CooldownElapsed);
        }
        assert_eq!(session.flashes(), 2);
        session.update(SessionMessage::FlashElapsed(1));
        assert!(session.flash_active());
        session.update(SessionMessage::FlashElapsed(2));
        assert!(!session.flash_active());
    }

    #[test]
    fn failed_snapshot_schedules_retry() {
        let mut session = ready_session();
        session.update(SessionMessage::Start);
        session.update(SessionMessage::Tick);
        session.update(SessionMessage::Tick);

        let commands = session.update(SessionMessage::SnapshotFailed("no frame".into()));
        assert_eq!(scheduled(&commands), vec!["RetrySnapshot"]);
        let commands = session.update(SessionMessage::RetrySnapshot);
        assert!(matches!(commands[..], [SessionCommand::TakeSnapshot]));
    }

    #[test]
    fn zero_countdown_captures_immediately() {
        let timing = SessionTiming {
            countdown_start: 0,
            ..SessionTiming::default()
        };
        let mut session = CaptureSession::new(timing);
        session.update(SessionMessage::CameraReady);
        let commands = session.update(SessionMessage::Start);
        assert_eq!(session.phase(), Phase::Capturing);
        assert!(matches!(commands[..], [SessionCommand::TakeSnapshot]));
    }

    #[test]
    fn default_total_is_thirteen_units() {
        assert_eq!(
            SessionTiming::default().total_duration(),
            timing::TIME_UNIT * 13
        );
    }
}
