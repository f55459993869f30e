//! Scripted collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, Luma};
use tokio::sync::{mpsc, Semaphore};

use crate::camera::{CaptureDevice, CapturedImage};
use crate::common::Rotation;
use crate::decoder::{CodeDecoder, DecodeRequest, DecodedCode, ValueType};
use crate::error::{CameraError, DecodeError};
use crate::presentation::ScanEvent;

pub fn test_image() -> DynamicImage {
    DynamicImage::ImageLuma8(ImageBuffer::<Luma<u8>, Vec<u8>>::from_pixel(
        4,
        4,
        Luma([200]),
    ))
}

type Script = Box<dyn Fn(u64) -> Result<Vec<DecodedCode>, DecodeError> + Send + Sync>;

pub struct ScriptedDecoder {
    script: Script,
    delay: Duration,
    hold: Option<Arc<Semaphore>>,
    panic_on: Option<u64>,
    calls: Mutex<Vec<u64>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedDecoder {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(u64) -> Result<Vec<DecodedCode>, DecodeError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            hold: None,
            panic_on: None,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Frame `n` decodes to `payloads[n - 1]` as plain text; later frames find nothing.
    pub fn from_payloads(payloads: &[&str]) -> Self {
        let payloads: Vec<String> = payloads.iter().map(|p| p.to_string()).collect();
        Self::new(move |sequence| {
            Ok(payloads
                .get(sequence as usize - 1)
                .map(|payload| vec![DecodedCode::new(payload.clone(), ValueType::Text)])
                .unwrap_or_default())
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every decode waits for one permit from `hold` before answering.
    pub fn with_hold(mut self, hold: Arc<Semaphore>) -> Self {
        self.hold = Some(hold);
        self
    }

    pub fn panicking_on(mut self, sequence: u64) -> Self {
        self.panic_on = Some(sequence);
        self
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeDecoder for ScriptedDecoder {
    async fn decode(&self, request: DecodeRequest) -> Result<Vec<DecodedCode>, DecodeError> {
        self.calls.lock().unwrap().push(request.sequence);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            hold.acquire().await.unwrap().forget();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on == Some(request.sequence) {
            panic!("scripted decoder panic on frame {}", request.sequence);
        }
        (self.script)(request.sequence)
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Capture device that replays a fixed list of frames (`None` = malformed), then
/// either repeats a valid frame forever or reports that nothing is ready.
pub struct ScriptedCamera {
    frames: VecDeque<Option<DynamicImage>>,
    endless: bool,
    capture_delay: Duration,
    open_error: Option<CameraError>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedCamera {
    pub fn with_frames(count: usize) -> Self {
        Self::from_script((0..count).map(|_| Some(test_image())).collect())
    }

    pub fn from_script(frames: Vec<Option<DynamicImage>>) -> Self {
        Self {
            frames: frames.into(),
            endless: false,
            capture_delay: Duration::ZERO,
            open_error: None,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::from_script(Vec::new())
        }
    }

    pub fn failing(error: CameraError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::from_script(Vec::new())
        }
    }

    /// Every capture blocks the capture thread for `delay`, like a slow sensor read.
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }
}

impl CaptureDevice for ScriptedCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        match self.open_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn capture(&mut self) -> Result<Option<CapturedImage>, CameraError> {
        if !self.capture_delay.is_zero() {
            std::thread::sleep(self.capture_delay);
        }
        let image = match self.frames.pop_front() {
            Some(image) => image,
            None if self.endless => Some(test_image()),
            None => return Ok(None),
        };
        Ok(Some(CapturedImage {
            image,
            rotation: Rotation::Deg90,
        }))
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Receives events until `count` have arrived or `timeout` elapses.
pub async fn collect_events(
    events: &mut mpsc::Receiver<ScanEvent>,
    count: usize,
    timeout: Duration,
) -> Vec<ScanEvent> {
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while collected.len() < count {
            match events.recv().await {
                Some(event) => collected.push(event),
                None => break,
            }
        }
    })
    .await;
    collected
}

pub fn labels(events: &[ScanEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::ScanUpdated { label, .. } => Some(label.clone()),
            ScanEvent::ScanFailed { .. } => None,
        })
        .collect()
}
