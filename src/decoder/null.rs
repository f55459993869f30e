use crate::decoder::{CodeDecoder, DecodeRequest, DecodedCode};
use crate::error::DecodeError;
use async_trait::async_trait;

/// Decoder that never finds a code. Lets a session run end to end without a
/// decoding backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDecoder;

#[async_trait]
impl CodeDecoder for NullDecoder {
    async fn decode(&self, request: DecodeRequest) -> Result<Vec<DecodedCode>, DecodeError> {
        tracing::trace!(sequence = request.sequence, "Null decoder skipped frame");
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
