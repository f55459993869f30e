use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Clockwise rotation that must be applied to a frame's pixels to make it upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Issues frames for one session and accounts for every release.
#[derive(Debug, Default)]
pub struct FrameLedger {
    next_sequence: AtomicU64,
    issued: AtomicU64,
    released: AtomicU64,
}

impl FrameLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a frame with the next acquisition sequence number (starting at 1).
    /// A frame without an image is still issued and must still be released.
    pub fn issue(self: &Arc<Self>, image: Option<DynamicImage>, rotation: Rotation) -> Frame {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.issued.fetch_add(1, Ordering::AcqRel);
        Frame {
            sequence,
            rotation,
            captured_at: Utc::now(),
            image: image.map(Arc::new),
            lease: Some(Arc::clone(self)),
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Acquire)
    }

    pub fn outstanding(&self) -> u64 {
        self.issued().saturating_sub(self.released())
    }

    fn record_release(&self, sequence: u64) {
        self.released.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(sequence, "Frame released");
    }
}

/// One captured camera image. Frames are owned by exactly one stage at a time and
/// return their lease to the [`FrameLedger`] exactly once, either through
/// [`Frame::release`] or when dropped.
pub struct Frame {
    sequence: u64,
    rotation: Rotation,
    captured_at: DateTime<Utc>,
    image: Option<Arc<DynamicImage>>,
    lease: Option<Arc<FrameLedger>>,
}

impl Frame {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> Option<&Arc<DynamicImage>> {
        self.image.as_ref()
    }

    pub fn release(mut self) {
        self.return_lease();
    }

    fn return_lease(&mut self) {
        if let Some(ledger) = self.lease.take() {
            ledger.record_release(self.sequence);
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.return_lease();
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("rotation", &self.rotation)
            .field("captured_at", &self.captured_at)
            .field(
                "image",
                &self.image.as_ref().map(|image| (image.width(), image.height())),
            )
            .finish()
    }
}
