use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

use crate::lifecycle::{deliver, run_blocking, wait_period, Cycle, Lifecycle, LoopContext};
use crate::{
    AudioClip, Channel, ChannelError, ChannelIntervals, DetectionEvent, Detector, Inference,
    InferenceChannel, IntervalHandle, Microphone,
};

struct Model {
    microphone: Box<dyn Microphone>,
    detector: Box<dyn Detector<AudioClip>>,
}

impl Model {
    fn classify(&mut self) -> anyhow::Result<Inference> {
        let clip = self.microphone.record()?;
        self.detector.infer(&clip)
    }
}

/// Timer-driven audio loop.
///
/// Every period the microphone is read and the clip classified on tokio's
/// blocking pool. Cycles are fixed-rate from their start time and never
/// overlap: a slow classification simply delays the next cycle.
pub struct AudioChannel {
    lifecycle: Lifecycle,
    model: Arc<Mutex<Model>>,
    reporter: mpsc::Sender<DetectionEvent>,
}

impl AudioChannel {
    /// Create a stopped channel scheduled at the idle period.
    pub fn new(
        intervals: ChannelIntervals,
        microphone: impl Microphone + 'static,
        detector: impl Detector<AudioClip> + 'static,
        reporter: mpsc::Sender<DetectionEvent>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(Channel::Audio, intervals.idle()),
            model: Arc::new(Mutex::new(Model {
                microphone: Box::new(microphone),
                detector: Box::new(detector),
            })),
            reporter,
        }
    }
}

async fn run(
    mut ctx: LoopContext,
    model: Arc<Mutex<Model>>,
    reporter: mpsc::Sender<DetectionEvent>,
) {
    loop {
        let started = Instant::now();
        let timestamp = Utc::now();
        let job = {
            let model = model.clone();
            move || {
                model
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .classify()
            }
        };
        let event = match run_blocking(ctx.channel, &mut ctx.shutdown, job).await {
            Cycle::Done(inference) => DetectionEvent::new(ctx.channel, inference, timestamp),
            Cycle::Failed => DetectionEvent::failed(ctx.channel, timestamp),
            Cycle::Stopped => break,
        };
        trace!(score = event.score, presence = event.presence, "audio cycle");
        if !deliver(&reporter, event, &mut ctx.shutdown, &ctx.cycles).await {
            break;
        }
        if !wait_period(started, &mut ctx.interval, &mut ctx.shutdown).await {
            break;
        }
    }
}

#[async_trait]
impl InferenceChannel for AudioChannel {
    fn channel(&self) -> Channel {
        self.lifecycle.channel()
    }

    fn start(&self) -> Result<(), ChannelError> {
        let model = self.model.clone();
        let reporter = self.reporter.clone();
        self.lifecycle.start(move |ctx| run(ctx, model, reporter))
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
