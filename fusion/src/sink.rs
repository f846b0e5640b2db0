use sensor::DetectionEvent;
use tokio::sync::broadcast;

use crate::CompositeState;

/// Receiver of fusion output, typically a UI or notification layer.
pub trait EventSink: Send + Sync {
    /// Called once per transition of the composite state.
    fn composite_state_changed(&self, state: &CompositeState);

    /// Raw per-channel result, for diagnostic display.
    fn detection(&self, _event: &DetectionEvent) {}
}

/// Fire-and-forget fan-out to any number of subscribers.
///
/// Composite transitions and raw detections travel on separate broadcast
/// channels, so a burst of detections cannot push a transition out of a slow
/// subscriber's buffer. Sending never blocks the coordinator.
#[derive(Clone)]
pub struct BroadcastSink {
    composite: broadcast::Sender<CompositeState>,
    detections: broadcast::Sender<DetectionEvent>,
}

impl BroadcastSink {
    /// Default broadcast capacity.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Both channels get `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        let (composite, _) = broadcast::channel(capacity.max(1));
        let (detections, _) = broadcast::channel(capacity.max(1));
        Self {
            composite,
            detections,
        }
    }

    /// Subscribe to future composite transitions.
    pub fn subscribe_composite(&self) -> broadcast::Receiver<CompositeState> {
        self.composite.subscribe()
    }

    /// Subscribe to future raw detections.
    pub fn subscribe_detections(&self) -> broadcast::Receiver<DetectionEvent> {
        self.detections.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EventSink for BroadcastSink {
    fn composite_state_changed(&self, state: &CompositeState) {
        let _ = self.composite.send(*state);
    }

    fn detection(&self, event: &DetectionEvent) {
        let _ = self.detections.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor::Channel;

    #[tokio::test]
    async fn fans_out_to_subscribers() {
        let sink = BroadcastSink::default();
        let mut a = sink.subscribe_composite();
        let mut b = sink.subscribe_composite();
        let state = CompositeState {
            hungry: true,
            vision: true,
            audio: true,
        };
        sink.composite_state_changed(&state);
        assert_eq!(a.recv().await.unwrap(), state);
        assert_eq!(b.recv().await.unwrap(), state);
    }

    #[test]
    fn send_without_subscribers_is_ignored() {
        let sink = BroadcastSink::new(1);
        sink.detection(&DetectionEvent::now(Channel::Audio, true, 0.9));
        sink.composite_state_changed(&CompositeState::default());
    }

    #[tokio::test]
    async fn detection_burst_keeps_composite_transition() {
        let sink = BroadcastSink::new(4);
        let mut composite = sink.subscribe_composite();
        let mut detections = sink.subscribe_detections();
        let state = CompositeState {
            hungry: true,
            vision: true,
            audio: true,
        };
        sink.composite_state_changed(&state);
        for _ in 0..100 {
            sink.detection(&DetectionEvent::now(Channel::Vision, true, 0.9));
        }
        assert_eq!(composite.recv().await.unwrap(), state);
        assert!(matches!(
            detections.recv().await,
            Err(broadcast::error::RecvError::Lagged(96))
        ));
        assert_eq!(detections.recv().await.unwrap().channel, Channel::Vision);
    }
}
