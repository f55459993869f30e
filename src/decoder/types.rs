use crate::common::Rotation;
use crate::error::DecodeError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Symbologies a decoder can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    #[default]
    QrCode,
    Aztec,
    DataMatrix,
    Pdf417,
    Code128,
    Code39,
    Code93,
    Codabar,
    Ean13,
    Ean8,
    Itf,
    UpcA,
    UpcE,
}

/// Semantic type of a decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Unknown,
    ContactInfo,
    Email,
    Isbn,
    Phone,
    Product,
    Sms,
    Text,
    Url,
    Wifi,
    Geo,
    CalendarEvent,
    DriverLicense,
}

impl ValueType {
    /// Only navigable links can be acted upon by the presentation layer.
    pub fn is_actionable(self) -> bool {
        matches!(self, ValueType::Url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub raw_value: Option<String>,
    pub value_type: ValueType,
    pub format: BarcodeFormat,
    pub sequence: u64,
}

impl DecodedCode {
    pub fn new(raw_value: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            raw_value: Some(raw_value.into()),
            value_type,
            format: BarcodeFormat::default(),
            sequence: 0,
        }
    }

    /// A result the decoder located but could not read a payload from.
    pub fn unreadable(value_type: ValueType) -> Self {
        Self {
            raw_value: None,
            value_type,
            format: BarcodeFormat::default(),
            sequence: 0,
        }
    }

    pub fn with_format(mut self, format: BarcodeFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// The payload, if present and non-empty.
    pub fn payload(&self) -> Option<&str> {
        self.raw_value.as_deref().filter(|value| !value.is_empty())
    }
}

/// Everything a decoder needs from a frame. Carries a shared handle to the pixels,
/// never the frame itself.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub image: Arc<DynamicImage>,
    pub rotation: Rotation,
    pub sequence: u64,
    pub format: BarcodeFormat,
}

impl DecodeRequest {
    pub fn new(
        image: Arc<DynamicImage>,
        rotation: Rotation,
        sequence: u64,
        format: BarcodeFormat,
    ) -> Self {
        Self {
            image,
            rotation,
            sequence,
            format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Success(Vec<DecodedCode>),
    Failure(DecodeError),
}
