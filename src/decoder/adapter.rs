use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tower::limit::ConcurrencyLimit;
use tower::{ServiceBuilder, ServiceExt};
use tracing::{debug, info, warn};

use crate::decoder::{BarcodeFormat, CodeDecoder, DecodeOutcome, DecodeRequest, DecodeService};
use crate::error::DecodeError;

/// Session-scoped wrapper around the decode capability.
///
/// Every call to [`DecoderAdapter::submit`] settles exactly once: the completion
/// hook is an `FnOnce` that runs on success, failure, decoder panic, or when the
/// adapter is already closed. The adapter never sees the frame, only the shared
/// image handle inside the request, which is dropped when the decode settles.
pub struct DecoderAdapter {
    service: ConcurrencyLimit<DecodeService>,
    decoder: Arc<dyn CodeDecoder>,
    format: BarcodeFormat,
    in_flight: Arc<watch::Sender<usize>>,
    closed: AtomicBool,
}

impl DecoderAdapter {
    pub fn new(decoder: Arc<dyn CodeDecoder>, format: BarcodeFormat) -> Self {
        let service = ServiceBuilder::new()
            .concurrency_limit(1)
            .service(DecodeService::new(decoder.clone(), format));
        let (in_flight, _) = watch::channel(0);
        info!(decoder = decoder.name(), ?format, "Decoder initialized");
        Self {
            service,
            decoder,
            format,
            in_flight: Arc::new(in_flight),
            closed: AtomicBool::new(false),
        }
    }

    pub fn format(&self) -> BarcodeFormat {
        self.format
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Starts decoding `request` on the runtime and reports the outcome through
    /// `on_settled`. Must be called from within a tokio runtime.
    pub fn submit<F>(&self, request: DecodeRequest, on_settled: F)
    where
        F: FnOnce(DecodeOutcome) + Send + 'static,
    {
        if self.is_closed() {
            debug!(sequence = request.sequence, "Rejecting submission to closed decoder");
            on_settled(DecodeOutcome::Failure(DecodeError::Closed));
            return;
        }

        let service = self.service.clone();
        let in_flight = self.in_flight.clone();
        let sequence = request.sequence;
        in_flight.send_modify(|count| *count += 1);

        tokio::spawn(async move {
            // The decode runs in its own task so a panicking decoder still settles.
            let outcome = match tokio::spawn(service.oneshot(request)).await {
                Ok(Ok(codes)) => DecodeOutcome::Success(codes),
                Ok(Err(err)) => DecodeOutcome::Failure(err),
                Err(join_error) => {
                    warn!(sequence, "Decode task did not complete: {}", join_error);
                    DecodeOutcome::Failure(DecodeError::Aborted(join_error.to_string()))
                }
            };
            on_settled(outcome);
            in_flight.send_modify(|count| *count = count.saturating_sub(1));
        });
    }

    /// Waits up to `grace` for every submitted decode to settle.
    /// Returns `false` if some were still running when the grace period ran out.
    pub async fn drain(&self, grace: Duration) -> bool {
        let mut settled = self.in_flight.subscribe();
        let drained = matches!(
            tokio::time::timeout(grace, settled.wait_for(|count| *count == 0)).await,
            Ok(Ok(_))
        );
        drained
    }

    /// Closes the underlying decoder. Only the first call has an effect.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.decoder.close();
        info!(decoder = self.decoder.name(), "Decoder closed");
        true
    }
}
