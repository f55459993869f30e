use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::camera::{CameraClient, CaptureDevice};
use crate::common::FrameLedger;
use crate::config::Configuration;
use crate::decoder::{BarcodeFormat, CodeDecoder, DecoderAdapter};
use crate::error::SessionError;
use crate::pipeline::gate::{self, BackpressureStrategy, FrameGate};
use crate::pipeline::{PipelineStats, ScanAnalyzer, StatsSnapshot};
use crate::presentation::ScanEvent;

/// One bound lifetime of camera, scan worker and decoder.
pub struct PipelineSession {
    id: Uuid,
    camera: CameraClient,
    gate: FrameGate,
    adapter: Arc<DecoderAdapter>,
    worker: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    ledger: Arc<FrameLedger>,
    stats: Arc<PipelineStats>,
    teardown_grace: Duration,
    stopped: bool,
}

impl PipelineSession {
    pub fn builder(configuration: Configuration) -> SessionBuilder {
        SessionBuilder::new(configuration)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn ledger(&self) -> &Arc<FrameLedger> {
        &self.ledger
    }

    /// Tears the session down: frame production stops first, then the worker is
    /// cancelled, in-flight decodes get the grace period to settle, and finally
    /// the decoder is closed. Each wait is bounded by the teardown grace period.
    /// Calling this again is a no-op.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!(session = %self.id, "Stopping scan session");

        self.gate.close();
        if !self.camera.shutdown(self.teardown_grace).await {
            warn!(session = %self.id, "Camera did not release in time");
        }

        self.cancel_token.cancel();
        if let Some(mut worker) = self.worker.take() {
            if tokio::time::timeout(self.teardown_grace, &mut worker)
                .await
                .is_err()
            {
                warn!(session = %self.id, "Scan worker did not stop in time, aborting");
                worker.abort();
            }
        }

        if !self.adapter.drain(self.teardown_grace).await {
            warn!(
                session = %self.id,
                in_flight = self.adapter.in_flight(),
                "Abandoning decodes still in flight"
            );
        }
        self.adapter.close();

        info!(
            session = %self.id,
            stats = ?self.stats.snapshot(),
            outstanding_frames = self.ledger.outstanding(),
            "Scan session stopped"
        );
    }
}

impl Drop for PipelineSession {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        self.gate.close();
        self.camera.stop();
        self.cancel_token.cancel();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.adapter.close();
    }
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub struct SessionBuilder {
    configuration: Configuration,
}

impl SessionBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }

    // Sets the capture cadence, this will override the default configuration.
    pub fn frame_interval(mut self, frame_interval: Duration) -> Self {
        self.configuration.frame_interval_ms = whole_millis(frame_interval);
        self
    }

    // Sets the gate's backpressure strategy, this will override the default configuration.
    pub fn backpressure(mut self, backpressure: BackpressureStrategy) -> Self {
        self.configuration.backpressure = backpressure;
        self
    }

    // Restricts decoding to one symbology, this will override the default configuration.
    pub fn format(mut self, format: BarcodeFormat) -> Self {
        self.configuration.format = format;
        self
    }

    // Adjusts the presentation channel size, this will override the default configuration.
    pub fn event_buffer_size(mut self, event_buffer_size: usize) -> Self {
        self.configuration.event_buffer_size = event_buffer_size;
        self
    }

    // Sets the bounded teardown wait, this will override the default configuration.
    pub fn teardown_grace(mut self, teardown_grace: Duration) -> Self {
        self.configuration.teardown_grace_ms = whole_millis(teardown_grace);
        self
    }

    /// Binds `device` and starts the pipeline. Returns the session together with
    /// the receiving end of the presentation channel, which should be drained on
    /// the presentation context. Must be called from within a tokio runtime.
    ///
    /// The session owns `decoder` from here on: it is closed when the session
    /// stops, or right away if the camera cannot be bound.
    pub fn start<D: CaptureDevice>(
        self,
        device: D,
        decoder: Arc<dyn CodeDecoder>,
    ) -> Result<(PipelineSession, mpsc::Receiver<ScanEvent>), SessionError> {
        let configuration = self.configuration;
        let id = Uuid::new_v4();
        let ledger = FrameLedger::new();
        let stats = Arc::new(PipelineStats::new());
        let adapter = Arc::new(DecoderAdapter::new(decoder, configuration.format));
        let (gate, frames) = gate::channel(configuration.backpressure, stats.clone());

        let camera = match CameraClient::start(
            device,
            gate.clone(),
            ledger.clone(),
            configuration.frame_interval(),
        ) {
            Ok(camera) => camera,
            Err(e) => {
                tracing::error!(session = %id, "Failed to start scan session: {}", e);
                adapter.close();
                return Err(e);
            }
        };

        let (events_tx, events_rx) = mpsc::channel(configuration.event_buffer_size.max(1));
        let cancel_token = CancellationToken::new();
        let analyzer = ScanAnalyzer::new(adapter.clone(), events_tx, stats.clone());
        let worker = tokio::spawn(analyzer.run(frames, cancel_token.clone()));

        info!(
            session = %id,
            backpressure = ?configuration.backpressure,
            format = ?configuration.format,
            "Scan session started"
        );

        let session = PipelineSession {
            id,
            camera,
            gate,
            adapter,
            worker: Some(worker),
            cancel_token,
            ledger,
            stats,
            teardown_grace: configuration.teardown_grace(),
            stopped: false,
        };
        Ok((session, events_rx))
    }
}
