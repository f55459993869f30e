pub mod camera_client;
pub mod synthetic;

pub use camera_client::CameraClient;
pub use synthetic::SyntheticCamera;

use crate::common::Rotation;
use crate::error::CameraError;
use image::DynamicImage;

/// One image read from a capture device. `image` is `None` when the device
/// delivered a buffer without usable pixel data.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub image: Option<DynamicImage>,
    pub rotation: Rotation,
}

/// A source of camera images, driven from the capture thread.
pub trait CaptureDevice: Send + 'static {
    fn open(&mut self) -> Result<(), CameraError>;

    /// Reads the next image. `Ok(None)` means nothing was ready this tick.
    fn capture(&mut self) -> Result<Option<CapturedImage>, CameraError>;

    fn close(&mut self) {}

    fn name(&self) -> &str;
}
