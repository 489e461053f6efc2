// SPDX-License-Identifier: GPL-3.0-only

//! Thread lifecycle management for capture loops
//!
//! Every camera stream is fed by one capture thread. The controller owns that
//! thread: stopping it (explicitly or by dropping the controller) is how a
//! stream's hardware is released.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// ```ignore
/// let (controller, format) = CaptureLoopController::spawn_opened(
///     "v4l2-capture",
///     move || open_device(&path).map(|stream| (stream, format)),
///     move |stream| forward_next_frame(stream),
/// )?;
///
/// // Later, stop the loop and release the device
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a capture loop that needs no per-thread resources
    pub fn start<F>(name: &str, loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_handle = Self::spawn_loop(name, Arc::clone(&stop_signal), loop_fn);

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Open resources on the capture thread, then loop over them
    ///
    /// `open_fn` runs on the new thread so that device handles never cross
    /// threads. This call blocks until it has finished: on success the
    /// running controller and the `info` value from `open_fn` are returned,
    /// on failure the thread has already exited and its error is returned.
    pub fn spawn_opened<S, T, E, I, F>(
        name: &str,
        open_fn: I,
        mut loop_fn: F,
    ) -> Result<(Self, T), E>
    where
        S: 'static,
        T: Send + 'static,
        E: From<String> + Send + 'static,
        I: FnOnce() -> Result<(S, T), E> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop_signal);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<T, E>>(1);
        let name_clone = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            let mut state = match open_fn() {
                Ok((state, info)) => {
                    let _ = ready_tx.send(Ok(info));
                    state
                }
                Err(e) => {
                    warn!(name = %name_clone, "Capture loop failed to open its source");
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while !stop_clone.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }
            }

            info!(name = %name_clone, "Capture loop thread exiting");
        });

        let mut controller = Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        };

        match ready_rx.recv() {
            Ok(Ok(info)) => Ok((controller, info)),
            Ok(Err(e)) => {
                controller.join();
                Err(e)
            }
            Err(_) => {
                controller.join();
                Err(E::from(format!("{} thread exited during start", name)))
            }
        }
    }

    fn spawn_loop<F>(name: &str, stop_signal: Arc<AtomicBool>, mut loop_fn: F) -> JoinHandle<()>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let name = name.to_string();
        info!(name = %name, "Starting capture loop");

        thread::spawn(move || {
            while !stop_signal.load(Ordering::SeqCst) {
                if loop_fn() == LoopAction::Stop {
                    debug!(name = %name, "Loop requested stop");
                    break;
                }
            }
            info!(name = %name, "Capture loop thread exiting");
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            if counter_clone.fetch_add(1, Ordering::SeqCst) >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn stop_signal_ends_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(30));
        controller.stop();
        assert!(!controller.is_running());
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn opened_state_reaches_loop() {
        let result = Arc::new(AtomicU32::new(0));
        let result_clone = Arc::clone(&result);

        let (mut controller, info) = CaptureLoopController::spawn_opened(
            "test-open",
            || Ok::<_, String>((42u32, "ready")),
            move |state| {
                result_clone.store(*state, Ordering::SeqCst);
                LoopAction::Stop
            },
        )
        .unwrap();

        controller.join();
        assert_eq!(info, "ready");
        assert_eq!(result.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn open_failure_is_returned_and_loop_never_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let result = CaptureLoopController::spawn_opened(
            "test-fail-open",
            || Err::<((), ()), _>("busy".to_string()),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );

        assert_eq!(result.err(), Some("busy".to_string()));
        assert!(!ran.load(Ordering::SeqCst));
    }
}
