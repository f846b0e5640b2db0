use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tracing::trace;

use crate::lifecycle::{deliver, run_blocking, wait_period, Cycle, Lifecycle, LoopContext};
use crate::{
    Channel, ChannelError, ChannelIntervals, DetectionEvent, Detector, Frame, InferenceChannel,
    IntervalHandle,
};

/// Single-slot mailbox that keeps only the newest frame.
#[derive(Default)]
struct FrameSlot {
    latest: Mutex<Option<Frame>>,
    ready: Notify,
    dropped: AtomicU64,
}

impl FrameSlot {
    fn put(&self, frame: Frame) {
        let replaced = self
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(frame);
        if replaced.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
    }

    async fn take(&self) -> Frame {
        loop {
            if let Some(frame) = self
                .latest
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            {
                return frame;
            }
            self.ready.notified().await;
        }
    }
}

/// Push-driven camera loop.
///
/// The capture side calls [`push_frame`](Self::push_frame) at its own
/// cadence. The worker takes the newest frame, runs the detector, then holds
/// off for the rest of the current period before taking another. Frames
/// pushed in the meantime overwrite each other, which sheds load down to
/// one inference per period.
pub struct VisionChannel {
    lifecycle: Lifecycle,
    detector: Arc<Mutex<Box<dyn Detector<Frame>>>>,
    slot: Arc<FrameSlot>,
    reporter: mpsc::Sender<DetectionEvent>,
}

impl VisionChannel {
    /// Create a stopped channel throttled at the idle period.
    pub fn new(
        intervals: ChannelIntervals,
        detector: impl Detector<Frame> + 'static,
        reporter: mpsc::Sender<DetectionEvent>,
    ) -> Self {
        let detector: Box<dyn Detector<Frame>> = Box::new(detector);
        Self {
            lifecycle: Lifecycle::new(Channel::Vision, intervals.idle()),
            detector: Arc::new(Mutex::new(detector)),
            slot: Arc::new(FrameSlot::default()),
            reporter,
        }
    }

    /// Offer a frame. Never blocks; replaces any frame still waiting.
    pub fn push_frame(&self, frame: Frame) {
        self.slot.put(frame);
    }

    /// Frames overwritten before the worker got to them.
    pub fn dropped_frames(&self) -> u64 {
        self.slot.dropped.load(Ordering::Relaxed)
    }
}

async fn run(
    mut ctx: LoopContext,
    detector: Arc<Mutex<Box<dyn Detector<Frame>>>>,
    slot: Arc<FrameSlot>,
    reporter: mpsc::Sender<DetectionEvent>,
) {
    let mut last_start: Option<Instant> = None;
    loop {
        let frame = tokio::select! {
            biased;
            _ = ctx.shutdown.wait() => break,
            frame = slot.take() => frame,
        };
        let started = Instant::now();
        if let Some(prev) = last_start.replace(started) {
            let fps = 1.0 / started.duration_since(prev).as_secs_f32().max(f32::EPSILON);
            trace!(fps, "vision frame rate");
        }
        let timestamp = Utc::now();
        let job = {
            let detector = detector.clone();
            move || {
                detector
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .infer(&frame)
            }
        };
        let event = match run_blocking(ctx.channel, &mut ctx.shutdown, job).await {
            Cycle::Done(inference) => DetectionEvent::new(ctx.channel, inference, timestamp),
            Cycle::Failed => DetectionEvent::failed(ctx.channel, timestamp),
            Cycle::Stopped => break,
        };
        if !deliver(&reporter, event, &mut ctx.shutdown, &ctx.cycles).await {
            break;
        }
        if !wait_period(started, &mut ctx.interval, &mut ctx.shutdown).await {
            break;
        }
    }
}

#[async_trait]
impl InferenceChannel for VisionChannel {
    fn channel(&self) -> Channel {
        self.lifecycle.channel()
    }

    fn start(&self) -> Result<(), ChannelError> {
        let detector = self.detector.clone();
        let slot = self.slot.clone();
        let reporter = self.reporter.clone();
        self.lifecycle.start(move |ctx| run(ctx, detector, slot, reporter))
    }

    async fn stop(&self) {
        self.lifecycle.stop().await;
    }

    fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    fn interval_handle(&self) -> IntervalHandle {
        self.lifecycle.interval().clone()
    }

    fn cycles(&self) -> u64 {
        self.lifecycle.cycles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slot_keeps_latest() {
        let slot = FrameSlot::default();
        slot.put(Frame::new(1, 1, vec![1u8]));
        slot.put(Frame::new(2, 2, vec![2u8]));
        slot.put(Frame::new(3, 3, vec![3u8]));
        let frame = slot.take().await;
        assert_eq!(frame.width, 3);
        assert_eq!(slot.dropped.load(Ordering::Relaxed), 2);
    }
}
