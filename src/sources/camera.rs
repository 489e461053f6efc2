// SPDX-License-Identifier: GPL-3.0-only

//! Camera variant: countdown-gated captures from the live feed

use super::SourceOutcome;
use crate::backends::camera::types::StreamRequest;
use crate::backends::camera::{CameraBackend, CameraStream};
use crate::capture::{SessionDriver, SessionHandle, SessionOutcome, SessionTiming};
use crate::errors::CameraError;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Camera acquisition plus one capture session
pub struct CameraSource {
    backend: Arc<dyn CameraBackend>,
    request: StreamRequest,
    timing: SessionTiming,
}

impl CameraSource {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        request: StreamRequest,
        timing: SessionTiming,
    ) -> Self {
        Self {
            backend,
            request,
            timing,
        }
    }

    /// Enter camera mode
    ///
    /// Returns the handle the UI uses to start/cancel and the future that
    /// resolves when the session ends. The camera is opened inside that
    /// future, so the preview can show a loading state meanwhile.
    pub fn begin(self) -> (SessionHandle, impl Future<Output = SourceOutcome> + Send + 'static) {
        let (driver, handle) = SessionDriver::new(self.timing);
        let backend = self.backend;
        let request = self.request;

        let run = async move {
            let stream = acquire(backend, request).await;
            match driver.run(stream).await {
                SessionOutcome::Completed(set) => SourceOutcome::Complete(set),
                SessionOutcome::Cancelled => SourceOutcome::Back,
            }
        };
        (handle, run)
    }
}

/// Open the camera on the blocking pool
async fn acquire(
    backend: Arc<dyn CameraBackend>,
    request: StreamRequest,
) -> Result<CameraStream, CameraError> {
    info!(backend = %backend.backend_type(), device = request.device_index, "Acquiring camera");
    let result = tokio::task::spawn_blocking(move || backend.acquire(&request))
        .await
        .map_err(|e| CameraError::AcquisitionFailure(format!("camera task failed: {}", e)))?;

    if let Err(err) = &result {
        warn!(error = %err, "Camera acquisition failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::virtual_camera::VirtualCameraBackend;

    #[tokio::test(start_paused = true)]
    async fn camera_source_completes_with_four_photos() {
        let request = StreamRequest {
            ideal_width: 32,
            ideal_height: 18,
            ..StreamRequest::default()
        };
        let source = CameraSource::new(
            Arc::new(VirtualCameraBackend::test_pattern()),
            request,
            SessionTiming::default(),
        );
        let (handle, run) = source.begin();
        let task = tokio::spawn(run);

        let mut view = handle.view();
        view.wait_for(|v| v.camera_ready).await.unwrap();
        handle.start();

        let set = task.await.unwrap().into_photos().unwrap();
        assert_eq!(set.photos().len(), 4);
        assert!(set.iter().all(|p| p.origin_file().is_none()));
    }

    #[tokio::test]
    async fn unavailable_camera_goes_back_on_cancel() {
        let source = CameraSource::new(
            Arc::new(VirtualCameraBackend::from_image("/nonexistent.png")),
            StreamRequest::default(),
            SessionTiming::default(),
        );
        let (handle, run) = source.begin();
        let task = tokio::spawn(run);

        let mut view = handle.view();
        view.wait_for(|v| v.error.is_some()).await.unwrap();
        handle.cancel();
        assert!(matches!(task.await.unwrap(), SourceOutcome::Back));
    }
}
