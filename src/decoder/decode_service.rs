use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use crate::decoder::{BarcodeFormat, CodeDecoder, DecodeRequest, DecodedCode};
use crate::error::DecodeError;

/// Presents a [`CodeDecoder`] as a tower service restricted to one symbology.
/// Results of any other format are discarded and every result is stamped with the
/// sequence number of the frame it came from.
#[derive(Clone)]
pub struct DecodeService {
    inner: Arc<dyn CodeDecoder>,
    format: BarcodeFormat,
}

impl DecodeService {
    pub fn new(inner: Arc<dyn CodeDecoder>, format: BarcodeFormat) -> Self {
        Self { inner, format }
    }
}

impl Service<DecodeRequest> for DecodeService {
    type Response = Vec<DecodedCode>;
    type Error = DecodeError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: DecodeRequest) -> Self::Future {
        let inner = self.inner.clone();
        let format = self.format;
        let sequence = request.sequence;
        request.format = format;
        tracing::trace!(sequence, rotation = request.rotation.degrees(), ?format, "Decoding frame");

        Box::pin(async move {
            let codes = inner.decode(request).await?;
            Ok(codes
                .into_iter()
                .filter(|code| code.format == format)
                .map(|code| code.with_sequence(sequence))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Rotation;
    use crate::decoder::ValueType;
    use crate::test_support::{test_image, ScriptedDecoder};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_decode_service_keeps_only_configured_format() {
        let decoder = ScriptedDecoder::new(|_| {
            Ok(vec![
                DecodedCode::new("qr", ValueType::Text),
                DecodedCode::new("ean", ValueType::Product).with_format(BarcodeFormat::Ean13),
            ])
        });
        let service = DecodeService::new(Arc::new(decoder), BarcodeFormat::QrCode);
        let request = DecodeRequest::new(
            Arc::new(test_image()),
            Rotation::Deg0,
            7,
            BarcodeFormat::Ean13,
        );

        let codes = service.oneshot(request).await.unwrap();

        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].payload(), Some("qr"));
        assert_eq!(codes[0].sequence, 7);
    }

    #[tokio::test]
    async fn test_decode_service_propagates_failure() {
        let decoder = ScriptedDecoder::new(|_| Err(DecodeError::Failed("blurry".to_string())));
        let service = DecodeService::new(Arc::new(decoder), BarcodeFormat::QrCode);
        let request =
            DecodeRequest::new(Arc::new(test_image()), Rotation::Deg0, 1, BarcodeFormat::QrCode);

        let result = service.oneshot(request).await;

        assert_eq!(result, Err(DecodeError::Failed("blurry".to_string())));
    }
}
