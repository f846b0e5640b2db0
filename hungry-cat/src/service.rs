use fusion::{BroadcastSink, CompositeState, Coordinator, FusionEngine};
use sensor::{
    AudioChannel, Channel, ChannelError, DetectionEvent, Frame, InferenceChannel, Microphone,
    RateController, VisionChannel,
};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{AudioClassifier, CatDetector, Config, MeowDetector, ObjectDetector};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("service was stopped and cannot be restarted")]
    Stopped,
}

enum State {
    Created(Coordinator, mpsc::Receiver<DetectionEvent>),
    Running {
        stop: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Both sensor channels, their rate controllers and the coordinator.
///
/// `start` brings everything up; `pause`/`resume` only touch the channels so
/// flags and rates survive; `stop` tears the service down for good.
pub struct HungryCatService {
    audio: Arc<AudioChannel>,
    vision: Arc<VisionChannel>,
    audio_rate: Arc<RateController>,
    vision_rate: Arc<RateController>,
    fusion: Arc<FusionEngine>,
    sink: BroadcastSink,
    state: Mutex<State>,
}

impl HungryCatService {
    pub fn new(
        config: &Config,
        microphone: impl Microphone + 'static,
        classifier: impl AudioClassifier + 'static,
        detector: impl ObjectDetector + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.event_capacity.max(1));
        let audio = Arc::new(AudioChannel::new(
            config.intervals.audio,
            microphone,
            MeowDetector::new(classifier, config.audio_threshold),
            tx.clone(),
        ));
        let vision = Arc::new(VisionChannel::new(
            config.intervals.vision,
            CatDetector::new(detector, config.vision_label.clone()),
            tx,
        ));
        let audio_rate = Arc::new(RateController::new(
            Channel::Audio,
            config.intervals.audio,
            audio.interval_handle(),
        ));
        let vision_rate = Arc::new(RateController::new(
            Channel::Vision,
            config.intervals.vision,
            vision.interval_handle(),
        ));
        let fusion = Arc::new(FusionEngine::new(config.stale_after()));
        let sink = BroadcastSink::new(config.event_capacity);
        let coordinator = Coordinator::new(
            fusion.clone(),
            vision_rate.clone(),
            audio_rate.clone(),
            Arc::new(sink.clone()),
        );
        Self {
            audio,
            vision,
            audio_rate,
            vision_rate,
            fusion,
            sink,
            state: Mutex::new(State::Created(coordinator, rx)),
        }
    }

    /// Start the coordinator and both channels. Idempotent while running.
    pub fn start(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, State::Stopped) {
            return Err(ServiceError::Stopped);
        }
        // channels fail loudly outside a runtime, before anything is spawned
        self.audio.start()?;
        self.vision.start()?;
        *state = match std::mem::replace(&mut *state, State::Stopped) {
            State::Created(coordinator, events) => {
                let (stop, stop_rx) = oneshot::channel();
                let task = tokio::spawn(coordinator.run(events, stop_rx));
                info!("hungry cat service started");
                State::Running { stop, task }
            }
            running => running,
        };
        Ok(())
    }

    /// Stop both channels, then the coordinator. No event reaches
    /// subscribers after this returns.
    pub async fn stop(&self) {
        self.pause().await;
        let previous = std::mem::replace(
            &mut *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            State::Stopped,
        );
        if let State::Running { stop, task } = previous {
            let _ = stop.send(());
            if let Err(e) = task.await {
                warn!("coordinator ended abnormally: {e}");
            }
            info!("hungry cat service stopped");
        }
    }

    /// Stop sampling without losing flags or rates.
    pub async fn pause(&self) {
        self.audio.stop().await;
        self.vision.stop().await;
    }

    /// Restart both channels after [`pause`](Self::pause).
    pub fn resume(&self) -> Result<(), ServiceError> {
        self.start()
    }

    /// Hand a captured frame to the vision channel.
    pub fn push_frame(&self, frame: Frame) {
        self.vision.push_frame(frame);
    }

    /// Subscribe to composite transitions.
    pub fn subscribe_composite(&self) -> broadcast::Receiver<CompositeState> {
        self.sink.subscribe_composite()
    }

    /// Subscribe to raw per-channel detections.
    pub fn subscribe_detections(&self) -> broadcast::Receiver<DetectionEvent> {
        self.sink.subscribe_detections()
    }

    pub fn snapshot(&self) -> CompositeState {
        self.fusion.snapshot()
    }

    pub fn audio(&self) -> &Arc<AudioChannel> {
        &self.audio
    }

    pub fn vision(&self) -> &Arc<VisionChannel> {
        &self.vision
    }

    pub fn rate(&self, channel: Channel) -> &RateController {
        match channel {
            Channel::Vision => &self.vision_rate,
            Channel::Audio => &self.audio_rate,
        }
    }
}
