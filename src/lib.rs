pub mod camera;
pub mod common;
pub mod config;
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod presentation;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::error::{AppError, CameraError, DecodeError, PipelineError, SessionError};

pub use crate::camera::{CaptureDevice, CapturedImage, SyntheticCamera};
pub use crate::common::{Frame, FrameLedger, Rotation};
pub use crate::config::Configuration;
pub use crate::decoder::{BarcodeFormat, CodeDecoder, DecodeRequest, DecodedCode, NullDecoder, ValueType};
pub use crate::presentation::{PresentationSink, ScanEvent, ScanView};
pub use crate::session::{PipelineSession, SessionBuilder};
