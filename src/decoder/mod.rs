pub mod adapter;
pub mod decode_service;
pub mod null;
pub mod types;

pub use adapter::DecoderAdapter;
pub use decode_service::DecodeService;
pub use null::NullDecoder;
pub use types::{BarcodeFormat, DecodeOutcome, DecodeRequest, DecodedCode, ValueType};

use crate::error::DecodeError;
use async_trait::async_trait;

/// The opaque decode capability: maps one image to zero or more labeled results.
#[async_trait]
pub trait CodeDecoder: Send + Sync {
    async fn decode(&self, request: DecodeRequest) -> Result<Vec<DecodedCode>, DecodeError>;

    /// Releases decoder resources. Called once, at session end.
    fn close(&self) {}

    fn name(&self) -> &'static str;
}
