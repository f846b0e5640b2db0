use chrono::Utc;
use sensor::{Channel, DetectionEvent, RateController};
use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::{CompositeState, EventSink, FusionEngine};

/// Single owner of the flags and both rate controllers.
///
/// Channels only publish [`DetectionEvent`]s; the coordinator applies them
/// one at a time: update the flag, boost or idle both channels, then notify
/// the sink.
pub struct Coordinator {
    fusion: Arc<FusionEngine>,
    vision: Arc<RateController>,
    audio: Arc<RateController>,
    sink: Arc<dyn EventSink>,
}

impl Coordinator {
    pub fn new(
        fusion: Arc<FusionEngine>,
        vision: Arc<RateController>,
        audio: Arc<RateController>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            fusion,
            vision,
            audio,
            sink,
        }
    }

    pub fn fusion(&self) -> &FusionEngine {
        &self.fusion
    }

    pub fn rate(&self, channel: Channel) -> &RateController {
        match channel {
            Channel::Vision => &self.vision,
            Channel::Audio => &self.audio,
        }
    }

    /// Apply one event. Returns the composite state if it changed.
    pub fn handle(&self, event: &DetectionEvent) -> Option<CompositeState> {
        let transition = self.fusion.update(event);
        // activity on either sensor speeds up both; absence on either slows both
        for rate in [&self.vision, &self.audio] {
            if event.presence {
                rate.boost();
            } else {
                rate.idle();
            }
        }
        if event.presence {
            debug!(channel = %event.channel, score = event.score, "presence detected");
        }
        self.sink.detection(event);
        if let Some(state) = transition {
            self.notify(&state);
        }
        transition
    }

    fn notify(&self, state: &CompositeState) {
        info!(
            hungry = state.hungry,
            vision = state.vision,
            audio = state.audio,
            "composite state changed"
        );
        self.sink.composite_state_changed(state);
    }

    fn expire(&self) {
        if let Some(state) = self.fusion.expire(Utc::now()) {
            self.notify(&state);
        }
    }

    /// Consume events until `stop` fires or every reporter is dropped.
    ///
    /// Events already queued when stopping are still applied.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<DetectionEvent>,
        mut stop: oneshot::Receiver<()>,
    ) {
        let mut staleness = self.fusion.stale_after().map(|window| {
            let mut ticker = time::interval((window / 2).max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        loop {
            tokio::select! {
                _ = &mut stop => {
                    while let Ok(event) = events.try_recv() {
                        self.handle(&event);
                    }
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle(&event);
                    }
                    None => break,
                },
                _ = tick(&mut staleness) => self.expire(),
            }
        }
        debug!("coordinator stopped");
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending().await,
    }
}
