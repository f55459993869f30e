use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::Frame;
use crate::decoder::{DecodeOutcome, DecodeRequest, DecoderAdapter};
use crate::error::PipelineError;
use crate::pipeline::gate::FrameReceiver;
use crate::pipeline::scan_state::ScanState;
use crate::pipeline::stats::PipelineStats;
use crate::presentation::ScanEvent;

/// The single-flight core of a scan session.
///
/// One analyzer runs on one worker task and is the only writer of its
/// [`ScanState`]. Each frame is submitted to the decoder with a completion hook
/// that owns the frame; the hook releases the frame and hands the outcome back to
/// this task, which applies it and forwards any state change to the
/// presentation channel.
pub struct ScanAnalyzer {
    adapter: Arc<DecoderAdapter>,
    state: ScanState,
    events: mpsc::Sender<ScanEvent>,
    stats: Arc<PipelineStats>,
}

impl ScanAnalyzer {
    pub fn new(
        adapter: Arc<DecoderAdapter>,
        events: mpsc::Sender<ScanEvent>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            adapter,
            state: ScanState::default(),
            events,
            stats,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Processes one frame to completion: the frame has been released and every
    /// resulting event handed off by the time this returns.
    pub async fn on_frame(&mut self, frame: Frame) -> Result<(), PipelineError> {
        let sequence = frame.sequence();
        let Some(image) = frame.image().cloned() else {
            debug!(sequence, "Dropping frame without image data");
            self.stats.record_malformed();
            frame.release();
            return Ok(());
        };

        let request = DecodeRequest::new(image, frame.rotation(), sequence, self.adapter.format());
        let (settled_tx, settled_rx) = oneshot::channel();
        let started = Instant::now();
        self.adapter.submit(request, move |outcome| {
            frame.release();
            let _ = settled_tx.send(outcome);
        });

        let outcome = settled_rx
            .await
            .map_err(|_| PipelineError::SettlementLost(sequence))?;
        self.stats
            .record_decode(matches!(outcome, DecodeOutcome::Success(_)), started.elapsed());
        self.apply(sequence, outcome).await
    }

    async fn apply(&mut self, sequence: u64, outcome: DecodeOutcome) -> Result<(), PipelineError> {
        match outcome {
            DecodeOutcome::Success(codes) => {
                debug!(sequence, results = codes.len(), "Frame decoded");
                for code in &codes {
                    if let Some(event) = self.state.observe(code) {
                        info!(sequence, label = ?self.state.label(), "Scan result changed");
                        self.publish(event).await?;
                        self.stats.record_update();
                    }
                }
            }
            DecodeOutcome::Failure(err) => {
                warn!(sequence, "Failed to decode frame: {}", err);
                self.publish(ScanEvent::ScanFailed {
                    reason: err.to_string(),
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn publish(&self, event: ScanEvent) -> Result<(), PipelineError> {
        self.events
            .send(event)
            .await
            .map_err(|_| PipelineError::PresentationClosed)
    }

    /// Worker loop: takes one frame at a time from the gate until the gate closes,
    /// the presentation side goes away, or `cancel_token` fires. A decode still in
    /// flight at cancellation is abandoned; its hook still releases the frame.
    pub async fn run(mut self, mut frames: FrameReceiver, cancel_token: CancellationToken) {
        info!("Scan worker started");
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    debug!("Abandoning in-flight decode on shutdown");
                    break;
                }
                result = self.on_frame(frame) => match result {
                    Ok(()) => {}
                    Err(PipelineError::PresentationClosed) => {
                        warn!("Presentation channel closed, stopping scan worker");
                        break;
                    }
                    Err(e) => tracing::error!("Scan worker error: {}", e),
                },
            }
        }
        frames.close();
        info!(state = ?self.state, "Scan worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FrameLedger, Rotation};
    use crate::decoder::{BarcodeFormat, DecodedCode, ValueType};
    use crate::error::DecodeError;
    use crate::pipeline::gate::{self, BackpressureStrategy};
    use crate::test_support::{labels, test_image, ScriptedDecoder};
    use std::time::Duration;

    fn analyzer(
        decoder: ScriptedDecoder,
    ) -> (ScanAnalyzer, mpsc::Receiver<ScanEvent>, Arc<PipelineStats>) {
        let (tx, rx) = mpsc::channel(32);
        let stats = Arc::new(PipelineStats::new());
        let adapter = Arc::new(DecoderAdapter::new(Arc::new(decoder), BarcodeFormat::QrCode));
        (ScanAnalyzer::new(adapter, tx, stats.clone()), rx, stats)
    }

    fn drain(rx: &mut mpsc::Receiver<ScanEvent>) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_duplicate_payloads_across_frames_emit_once() {
        let ledger = FrameLedger::new();
        let (mut analyzer, mut rx, _) =
            analyzer(ScriptedDecoder::from_payloads(&["A", "A", "B", "B", "B", "C"]));

        for _ in 0..6 {
            let frame = ledger.issue(Some(test_image()), Rotation::Deg0);
            analyzer.on_frame(frame).await.unwrap();
        }

        assert_eq!(labels(&drain(&mut rx)), vec!["A", "B", "C"]);
        assert_eq!(ledger.issued(), 6);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_released_without_decoding() {
        let ledger = FrameLedger::new();
        let decoder = ScriptedDecoder::new(|_| Ok(vec![DecodedCode::new("A", ValueType::Text)]));
        let (mut analyzer, mut rx, stats) = analyzer(decoder);

        analyzer
            .on_frame(ledger.issue(None, Rotation::Deg0))
            .await
            .unwrap();

        assert!(drain(&mut rx).is_empty());
        assert_eq!(ledger.outstanding(), 0);
        assert_eq!(stats.snapshot().frames_malformed, 1);
        assert_eq!(analyzer.state(), &ScanState::Empty);
    }

    #[tokio::test]
    async fn test_failure_emits_notice_and_keeps_state() {
        let ledger = FrameLedger::new();
        let decoder = ScriptedDecoder::new(|sequence| match sequence {
            1 => Ok(vec![DecodedCode::new("A", ValueType::Text)]),
            _ => Err(DecodeError::Failed("lens covered".to_string())),
        });
        let (mut analyzer, mut rx, stats) = analyzer(decoder);

        for _ in 0..2 {
            let frame = ledger.issue(Some(test_image()), Rotation::Deg0);
            analyzer.on_frame(frame).await.unwrap();
        }

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            ScanEvent::ScanFailed {
                reason: "Decoder failed: lens covered".to_string()
            }
        );
        assert_eq!(analyzer.state().label(), Some("A"));
        assert_eq!(ledger.outstanding(), 0);
        assert_eq!(stats.snapshot().decodes_failed, 1);
    }

    #[tokio::test]
    async fn test_results_apply_in_decoder_order() {
        let ledger = FrameLedger::new();
        let decoder = ScriptedDecoder::new(|_| {
            Ok(vec![
                DecodedCode::new("first", ValueType::Text),
                DecodedCode::new("", ValueType::Text),
                DecodedCode::new("https://last.example", ValueType::Url),
            ])
        });
        let (mut analyzer, mut rx, _) = analyzer(decoder);

        analyzer
            .on_frame(ledger.issue(Some(test_image()), Rotation::Deg0))
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(labels(&events), vec!["first", "https://last.example"]);
        assert_eq!(
            events[1],
            ScanEvent::ScanUpdated {
                label: "https://last.example".to_string(),
                is_actionable: true,
            }
        );
        assert_eq!(analyzer.state().label(), Some("https://last.example"));
    }

    #[tokio::test]
    async fn test_closed_presentation_is_reported() {
        let ledger = FrameLedger::new();
        let (mut analyzer, rx, _) = analyzer(ScriptedDecoder::from_payloads(&["A"]));
        drop(rx);

        let result = analyzer
            .on_frame(ledger.issue(Some(test_image()), Rotation::Deg0))
            .await;

        assert_eq!(result, Err(PipelineError::PresentationClosed));
        assert_eq!(ledger.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_run_emits_in_delivery_order() {
        let ledger = FrameLedger::new();
        let (analyzer, mut rx, stats) = analyzer(ScriptedDecoder::from_payloads(&["X", "Y", "Z"]));
        let (gate, receiver) = gate::channel(BackpressureStrategy::BlockProducer, stats);
        let cancel_token = CancellationToken::new();
        let worker = tokio::spawn(analyzer.run(receiver, cancel_token.clone()));

        let producer_ledger = ledger.clone();
        let producer = std::thread::spawn(move || {
            for _ in 0..3 {
                gate.push(producer_ledger.issue(Some(test_image()), Rotation::Deg0))
                    .unwrap();
            }
            gate
        });

        let events = crate::test_support::collect_events(&mut rx, 3, Duration::from_secs(2)).await;
        assert_eq!(labels(&events), vec!["X", "Y", "Z"]);

        let gate = producer.join().unwrap();
        gate.close();
        worker.await.unwrap();
        assert_eq!(ledger.outstanding(), 0);
    }
}
