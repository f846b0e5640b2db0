use fusion::{CompositeState, Coordinator, EventSink, FusionEngine};
use sensor::{
    Channel, DetectionEvent, Inference, IntervalHandle, IntervalTable, RateController, RateMode,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<CompositeState>>,
    detections: Mutex<Vec<DetectionEvent>>,
}

impl Recorder {
    fn states(&self) -> Vec<CompositeState> {
        self.states.lock().unwrap().clone()
    }
}

impl EventSink for Recorder {
    fn composite_state_changed(&self, state: &CompositeState) {
        self.states.lock().unwrap().push(*state);
    }

    fn detection(&self, event: &DetectionEvent) {
        self.detections.lock().unwrap().push(event.clone());
    }
}

struct Rig {
    coordinator: Coordinator,
    sink: Arc<Recorder>,
    vision: IntervalHandle,
    audio: IntervalHandle,
}

fn rig(stale_after: Option<Duration>) -> Rig {
    let table = IntervalTable::default();
    let vision = IntervalHandle::new(Duration::ZERO);
    let audio = IntervalHandle::new(Duration::ZERO);
    let sink = Arc::new(Recorder::default());
    let coordinator = Coordinator::new(
        Arc::new(FusionEngine::new(stale_after)),
        Arc::new(RateController::new(Channel::Vision, table.vision, vision.clone())),
        Arc::new(RateController::new(Channel::Audio, table.audio, audio.clone())),
        sink.clone(),
    );
    Rig {
        coordinator,
        sink,
        vision,
        audio,
    }
}

/// Audio event scored against the 0.3 meow threshold.
fn meow(score: f32) -> DetectionEvent {
    let inference = Inference::from_score(score, 0.3);
    DetectionEvent::now(Channel::Audio, inference.presence, inference.score)
}

fn cat(presence: bool) -> DetectionEvent {
    DetectionEvent::now(Channel::Vision, presence, if presence { 0.8 } else { 0.0 })
}

#[test]
fn meow_without_cat_boosts_both_but_is_not_hungry() {
    let rig = rig(None);
    rig.coordinator.handle(&cat(false));
    assert_eq!(rig.coordinator.handle(&meow(0.9)), None);
    assert!(!rig.coordinator.fusion().snapshot().hungry);
    assert_eq!(rig.audio.get(), Duration::from_millis(50));
    assert_eq!(rig.vision.get(), Duration::from_millis(200));
    assert_eq!(rig.coordinator.rate(Channel::Vision).mode(), RateMode::Boosted);
    assert!(rig.sink.states().is_empty());
}

#[test]
fn cat_after_meow_turns_hungry_once() {
    let rig = rig(None);
    rig.coordinator.handle(&cat(false));
    rig.coordinator.handle(&meow(0.9));
    let state = rig.coordinator.handle(&cat(true)).expect("transition");
    assert!(state.hungry);
    rig.coordinator.handle(&cat(true));
    rig.coordinator.handle(&meow(0.7));
    assert_eq!(
        rig.sink.states(),
        vec![CompositeState {
            hungry: true,
            vision: true,
            audio: true
        }]
    );
}

#[test]
fn silence_idles_both_and_clears_hunger() {
    let rig = rig(None);
    rig.coordinator.handle(&meow(0.9));
    rig.coordinator.handle(&cat(true));
    let state = rig.coordinator.handle(&meow(0.1)).expect("transition");
    assert!(!state.hungry);
    assert!(state.vision);
    assert_eq!(rig.audio.get(), Duration::from_secs(1));
    assert_eq!(rig.vision.get(), Duration::from_secs(1));
    assert_eq!(rig.sink.states().len(), 2);
    assert!(rig.coordinator.fusion().flag(Channel::Vision).presence);
}

#[test]
fn every_detection_reaches_the_sink() {
    let rig = rig(None);
    rig.coordinator.handle(&meow(0.9));
    rig.coordinator.handle(&meow(0.9));
    rig.coordinator.handle(&cat(false));
    assert_eq!(rig.sink.detections.lock().unwrap().len(), 3);
}

#[test]
fn vision_presence_boosts_audio() {
    let rig = rig(None);
    rig.coordinator.handle(&cat(true));
    assert_eq!(rig.coordinator.rate(Channel::Audio).mode(), RateMode::Boosted);
    rig.coordinator.handle(&cat(false));
    assert_eq!(rig.coordinator.rate(Channel::Audio).mode(), RateMode::Idle);
}

#[tokio::test]
async fn run_applies_queued_events_before_stopping() {
    let rig = rig(None);
    let sink = rig.sink.clone();
    let (tx, rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = oneshot::channel();
    tx.send(meow(0.9)).await.unwrap();
    tx.send(cat(true)).await.unwrap();
    stop_tx.send(()).unwrap();
    rig.coordinator.run(rx, stop_rx).await;
    assert_eq!(sink.states().len(), 1);
    assert!(sink.states()[0].hungry);
}

#[tokio::test]
async fn run_ends_when_reporters_drop() {
    let rig = rig(None);
    let (tx, rx) = mpsc::channel(8);
    let (_stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(rig.coordinator.run(rx, stop_rx));
    tx.send(meow(0.9)).await.unwrap();
    drop(tx);
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("coordinator ended")
        .unwrap();
}

#[tokio::test]
async fn stale_flags_expire_while_running() {
    let rig = rig(Some(Duration::from_millis(50)));
    let sink = rig.sink.clone();
    let (tx, rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(rig.coordinator.run(rx, stop_rx));
    tx.send(meow(0.9)).await.unwrap();
    tx.send(cat(true)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_tx.send(()).unwrap();
    task.await.unwrap();
    let states = sink.states();
    assert_eq!(states.len(), 2, "{states:?}");
    assert!(states[0].hungry);
    assert!(!states[1].hungry);
}
