// SPDX-License-Identifier: GPL-3.0-only

//! Async driver for a capture session
//!
//! Owns the camera stream for the lifetime of the run, turns
//! [`SessionCommand::Schedule`] into timers and publishes a [`CaptureView`]
//! for the UI after every change. All state changes go through
//! [`CaptureSession::update`] on this one task, so a timer that fires after
//! cancellation has nothing left to mutate: the timers are dropped together
//! with the driver.

use super::state::{CaptureSession, Phase, SessionCommand, SessionMessage, SessionTiming};
use crate::backends::camera::CameraStream;
use crate::backends::camera::types::CameraFrame;
use crate::errors::CameraError;
use crate::photo::PhotoSet;
use crate::pipelines::photo::capture::PhotoCapture;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// User input forwarded to a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    Start,
    Cancel,
}

/// How a session ended
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Completed(PhotoSet),
    Cancelled,
}

/// Snapshot of everything the capture stage displays
#[derive(Debug, Clone, Default)]
pub struct CaptureView {
    pub phase: Phase,
    pub countdown: Option<u32>,
    pub photos_taken: usize,
    pub flash_active: bool,
    pub freeze_frame: Option<Arc<CameraFrame>>,
    pub live_frame: Option<Arc<CameraFrame>>,
    pub camera_ready: bool,
    pub error: Option<CameraError>,
    pub stream_open: bool,
    pub flashes: u32,
    pub freeze_updates: u32,
}

impl CaptureView {
    /// Frame to show: the freeze-frame masks the live feed while present
    pub fn display_frame(&self) -> Option<&Arc<CameraFrame>> {
        self.freeze_frame.as_ref().or(self.live_frame.as_ref())
    }
}

enum Event {
    Timer(SessionMessage),
    Control(Option<SessionControl>),
    Frame(Option<CameraFrame>),
}

/// Handle used by the UI to drive a session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    control: mpsc::UnboundedSender<SessionControl>,
    view: watch::Receiver<CaptureView>,
}

impl SessionHandle {
    pub fn start(&self) {
        let _ = self.control.send(SessionControl::Start);
    }

    pub fn cancel(&self) {
        let _ = self.control.send(SessionControl::Cancel);
    }

    pub fn view(&self) -> watch::Receiver<CaptureView> {
        self.view.clone()
    }
}

/// Drives one [`CaptureSession`] against one camera stream
pub struct SessionDriver {
    session: CaptureSession,
    stream: Option<CameraStream>,
    latest_frame: Option<Arc<CameraFrame>>,
    timers: FuturesUnordered<BoxFuture<'static, SessionMessage>>,
    control: mpsc::UnboundedReceiver<SessionControl>,
    view: watch::Sender<CaptureView>,
    outcome: Option<SessionOutcome>,
}

impl SessionDriver {
    /// Create a driver and the handle that controls it
    pub fn new(timing: SessionTiming) -> (Self, SessionHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(CaptureView::default());
        let driver = Self {
            session: CaptureSession::new(timing),
            stream: None,
            latest_frame: None,
            timers: FuturesUnordered::new(),
            control: control_rx,
            view: view_tx,
            outcome: None,
        };
        let handle = SessionHandle {
            control: control_tx,
            view: view_rx,
        };
        (driver, handle)
    }

    /// Run until the photos are handed off or the session is cancelled
    ///
    /// `stream` is the result of acquiring the camera. A failed acquisition
    /// leaves the session idle with the error on display until the user
    /// cancels. The stream is released on every exit path.
    pub async fn run(mut self, stream: Result<CameraStream, CameraError>) -> SessionOutcome {
        match stream {
            Ok(stream) => self.stream = Some(stream),
            Err(err) => self.dispatch(SessionMessage::CameraFailed(err)),
        }
        self.publish();

        while self.outcome.is_none() {
            let event = tokio::select! {
                Some(message) = self.timers.next() => Event::Timer(message),
                control = self.control.recv() => Event::Control(control),
                frame = next_frame(&mut self.stream) => Event::Frame(frame),
            };

            match event {
                Event::Timer(message) => self.dispatch(message),
                Event::Control(Some(SessionControl::Start)) => self.dispatch(SessionMessage::Start),
                // A dropped handle is a teardown
                Event::Control(Some(SessionControl::Cancel)) | Event::Control(None) => {
                    self.dispatch(SessionMessage::Cancel)
                }
                Event::Frame(Some(frame)) => self.on_frame(frame),
                Event::Frame(None) => self.on_stream_ended(),
            }
            self.publish();
        }

        self.release_stream();
        self.publish();
        self.outcome.take().unwrap_or(SessionOutcome::Cancelled)
    }

    fn on_frame(&mut self, frame: CameraFrame) {
        self.latest_frame = Some(Arc::new(frame));
        if !self.session.camera_ready() {
            self.dispatch(SessionMessage::CameraReady);
        }
    }

    fn on_stream_ended(&mut self) {
        warn!(had_frames = self.latest_frame.is_some(), "Camera stream ended");
        self.release_stream();
        // The last frame is frozen in time, never capture it again
        self.latest_frame = None;
        let reason = if self.session.camera_ready() {
            "camera stopped delivering frames"
        } else {
            "camera stopped before delivering a frame"
        };
        self.dispatch(SessionMessage::CameraFailed(CameraError::AcquisitionFailure(
            reason.to_string(),
        )));
    }

    /// Feed a message and carry out the resulting commands
    fn dispatch(&mut self, message: SessionMessage) {
        let mut pending = VecDeque::from([message]);
        while let Some(message) = pending.pop_front() {
            for command in self.session.update(message) {
                match command {
                    SessionCommand::Schedule { after, message } => {
                        self.timers.push(Box::pin(async move {
                            tokio::time::sleep(after).await;
                            message
                        }));
                    }
                    SessionCommand::TakeSnapshot => pending.push_back(self.take_snapshot()),
                    SessionCommand::ReleaseStream => self.release_stream(),
                    SessionCommand::Finish(set) => {
                        self.outcome = Some(SessionOutcome::Completed(set));
                    }
                    SessionCommand::Back => {
                        self.timers.clear();
                        self.outcome = Some(SessionOutcome::Cancelled);
                    }
                }
            }
        }
    }

    fn take_snapshot(&self) -> SessionMessage {
        let Some(frame) = self.latest_frame.clone() else {
            return SessionMessage::SnapshotFailed("no frame available".to_string());
        };
        match PhotoCapture::snapshot(&frame) {
            Ok(photo) => SessionMessage::Snapshot { photo, frame },
            Err(e) => SessionMessage::SnapshotFailed(e),
        }
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            info!(device = %stream.device().name, "Releasing camera");
            stream.release();
        }
    }

    fn publish(&self) {
        let session = &self.session;
        let view = CaptureView {
            phase: session.phase(),
            countdown: session.countdown(),
            photos_taken: session.photos().len(),
            flash_active: session.flash_active(),
            freeze_frame: session.freeze_frame().cloned(),
            live_frame: self.latest_frame.clone(),
            camera_ready: session.camera_ready(),
            error: session.error().cloned(),
            stream_open: self.stream.is_some(),
            flashes: session.flashes(),
            freeze_updates: session.freeze_updates(),
        };
        self.view.send_replace(view);
    }
}

async fn next_frame(stream: &mut Option<CameraStream>) -> Option<CameraFrame> {
    match stream {
        Some(stream) => stream.frames().next().await,
        None => std::future::pending().await,
    }
}
