//! Latest-only hand-off between the capture thread and the scan worker.
//!
//! The gate holds at most one pending frame. A frame that the consumer has taken
//! is in flight and out of the gate's reach; only the pending one can be
//! superseded. Delivered frames are strictly increasing by sequence number.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::debug;

use crate::common::Frame;
use crate::error::PipelineError;
use crate::pipeline::stats::PipelineStats;

/// What the gate does when a frame arrives while another is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressureStrategy {
    /// Replace the pending frame and release it unprocessed.
    #[default]
    KeepOnlyLatest,
    /// Block the producer until the consumer takes the pending frame.
    BlockProducer,
}

struct Slot {
    pending: Option<Frame>,
    last_sequence: Option<u64>,
    closed: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    frame_ready: Notify,
    slot_free: Condvar,
    strategy: BackpressureStrategy,
    stats: Arc<PipelineStats>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        let pending = {
            let mut slot = self.lock();
            if slot.closed {
                return;
            }
            slot.closed = true;
            slot.pending.take()
        };
        if let Some(frame) = pending {
            debug!(sequence = frame.sequence(), "Releasing pending frame on close");
            self.stats.record_dropped();
            frame.release();
        }
        self.frame_ready.notify_one();
        self.slot_free.notify_all();
    }
}

pub fn channel(
    strategy: BackpressureStrategy,
    stats: Arc<PipelineStats>,
) -> (FrameGate, FrameReceiver) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            pending: None,
            last_sequence: None,
            closed: false,
        }),
        frame_ready: Notify::new(),
        slot_free: Condvar::new(),
        strategy,
        stats,
    });
    (
        FrameGate {
            shared: shared.clone(),
        },
        FrameReceiver { shared },
    )
}

/// Producer side of the gate.
#[derive(Clone)]
pub struct FrameGate {
    shared: Arc<Shared>,
}

impl FrameGate {
    /// Offers a frame to the consumer. With [`BackpressureStrategy::BlockProducer`]
    /// this blocks the calling thread, so it must not be called from async code.
    pub fn push(&self, frame: Frame) -> Result<(), PipelineError> {
        let mut slot = self.shared.lock();
        if self.shared.strategy == BackpressureStrategy::BlockProducer {
            while slot.pending.is_some() && !slot.closed {
                slot = self
                    .shared
                    .slot_free
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }

        if slot.closed {
            drop(slot);
            frame.release();
            return Err(PipelineError::GateClosed);
        }

        if slot
            .last_sequence
            .is_some_and(|last| frame.sequence() <= last)
        {
            drop(slot);
            debug!(sequence = frame.sequence(), "Dropping out-of-order frame");
            self.shared.stats.record_dropped();
            frame.release();
            return Ok(());
        }

        slot.last_sequence = Some(frame.sequence());
        let superseded = slot.pending.replace(frame);
        drop(slot);

        if let Some(stale) = superseded {
            debug!(sequence = stale.sequence(), "Superseded pending frame");
            self.shared.stats.record_dropped();
            stale.release();
        }
        self.shared.frame_ready.notify_one();
        Ok(())
    }

    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

/// Consumer side of the gate. There is exactly one per session.
pub struct FrameReceiver {
    shared: Arc<Shared>,
}

impl FrameReceiver {
    /// Takes the pending frame, waiting for one if necessary.
    /// Returns `None` once the gate is closed.
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            {
                let mut slot = self.shared.lock();
                if let Some(frame) = slot.pending.take() {
                    drop(slot);
                    self.shared.slot_free.notify_one();
                    self.shared.stats.record_delivered();
                    return Some(frame);
                }
                if slot.closed {
                    return None;
                }
            }
            self.shared.frame_ready.notified().await;
        }
    }

    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.shared.close();
    }
}
