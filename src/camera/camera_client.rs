use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::camera::{CaptureDevice, CapturedImage};
use crate::common::FrameLedger;
use crate::error::{PipelineError, SessionError};
use crate::pipeline::FrameGate;

/// Runs a capture device on its own thread and pushes every captured image into
/// the session's frame gate.
pub struct CameraClient {
    cancel_token: CancellationToken,
    capture_thread: Option<std::thread::JoinHandle<()>>,
}

impl CameraClient {
    /// Opens `device` on the calling thread, so a bind failure is reported here,
    /// then starts the capture loop.
    pub fn start<D: CaptureDevice>(
        mut device: D,
        gate: FrameGate,
        ledger: Arc<FrameLedger>,
        frame_interval: Duration,
    ) -> Result<Self, SessionError> {
        device.open().map_err(|source| SessionError::Bind {
            device: device.name().to_string(),
            source,
        })?;

        let cancel_token = CancellationToken::new();
        let mut camera = Camera {
            device,
            gate,
            ledger,
            frame_interval,
            id: Uuid::new_v4(),
        };
        let token = cancel_token.clone();
        let capture_thread = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || camera.run(token))
            .map_err(SessionError::Spawn)?;

        Ok(Self {
            cancel_token,
            capture_thread: Some(capture_thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Cancels capture and joins the thread on the calling thread. Used where no
    /// runtime is available to wait on, such as `Drop`.
    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(thread) = self.capture_thread.take() {
            if thread.join().is_err() {
                tracing::error!("Camera capture thread panicked");
            }
        }
    }

    /// Cancels capture and waits up to `grace` for the capture thread to exit,
    /// without blocking the runtime. A thread stuck inside the device is
    /// detached and `false` is returned.
    pub async fn shutdown(&mut self, grace: Duration) -> bool {
        self.cancel_token.cancel();
        let Some(thread) = self.capture_thread.take() else {
            return true;
        };

        match tokio::time::timeout(grace, tokio::task::spawn_blocking(move || thread.join())).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(_))) => {
                tracing::error!("Camera capture thread panicked");
                true
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to join camera capture thread: {}", e);
                false
            }
            Err(_) => {
                tracing::warn!(?grace, "Camera capture thread did not stop in time, detaching");
                false
            }
        }
    }
}

impl Drop for CameraClient {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Camera<D> {
    device: D,
    gate: FrameGate,
    ledger: Arc<FrameLedger>,
    frame_interval: Duration,
    id: Uuid,
}

impl<D: CaptureDevice> Camera<D> {
    /// Hands one capture to the gate. Returns `false` once the gate no longer
    /// accepts frames.
    fn process_capture(&mut self, captured: CapturedImage) -> bool {
        let frame = self.ledger.issue(captured.image, captured.rotation);
        match self.gate.push(frame) {
            Ok(()) => true,
            Err(PipelineError::GateClosed) => {
                tracing::info!("Frame gate closed, stopping capture loop");
                false
            }
            Err(e) => {
                tracing::error!("Failed to hand off frame: {}", e);
                true
            }
        }
    }

    fn run(&mut self, cancel_token: CancellationToken) {
        tracing::info!(
            "Camera '{}' capturing, with unique id: {}",
            self.device.name(),
            self.id
        );

        while !cancel_token.is_cancelled() {
            match self.device.capture() {
                Ok(Some(captured)) => {
                    if !self.process_capture(captured) {
                        break;
                    }
                }
                Ok(None) => {
                    // Nothing ready this tick.
                }
                Err(e) => {
                    tracing::error!("Camera capture failed, stopping capture loop: {}", e);
                    break;
                }
            }
            std::thread::sleep(self.frame_interval);
        }

        self.device.close();
        tracing::info!(
            "Camera '{}' stopped, with unique id: {}",
            self.device.name(),
            self.id
        );
    }
}
