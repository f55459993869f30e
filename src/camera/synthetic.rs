use image::{DynamicImage, ImageBuffer, Luma};

use crate::camera::{CaptureDevice, CapturedImage};
use crate::common::Rotation;
use crate::error::CameraError;

/// Capture device that renders a moving gradient instead of reading a sensor.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    tick: u32,
    open: bool,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
            open: false,
        }
    }

    fn render(&self) -> DynamicImage {
        let offset = self.tick;
        DynamicImage::ImageLuma8(ImageBuffer::<Luma<u8>, Vec<u8>>::from_fn(
            self.width,
            self.height,
            |x, y| Luma([(x.wrapping_add(y).wrapping_add(offset) % 256) as u8]),
        ))
    }
}

impl CaptureDevice for SyntheticCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::Unavailable(format!(
                "invalid resolution {}x{}",
                self.width, self.height
            )));
        }
        self.open = true;
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<CapturedImage>, CameraError> {
        if !self.open {
            return Err(CameraError::Capture("device is not open".to_string()));
        }
        let image = self.render();
        self.tick = self.tick.wrapping_add(1);
        Ok(Some(CapturedImage {
            image: Some(image),
            rotation: Rotation::Deg0,
        }))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
