use anyhow::anyhow;
use sensor::{
    Channel, ChannelIntervals, Detection, Frame, Inference, InferenceChannel, VisionChannel,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn frame() -> Frame {
    Frame::new(4, 4, vec![0u8; 64])
}

fn sees_cat(_: &Frame) -> anyhow::Result<Inference> {
    let found = vec![Detection::new("cat", 0.8)];
    Ok(Inference::from_labels(&found, "cat"))
}

#[tokio::test]
async fn waits_for_frames() {
    let (tx, mut rx) = mpsc::channel(8);
    let vision = VisionChannel::new(ChannelIntervals::new(20, 10), sees_cat, tx);
    vision.start().unwrap();
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    vision.push_frame(frame());
    let event = rx.recv().await.unwrap();
    assert_eq!(event.channel, Channel::Vision);
    assert!(event.presence);
    assert_eq!(event.score, 0.8);
    vision.stop().await;
}

#[tokio::test]
async fn frame_pushed_before_start_is_kept() {
    let (tx, mut rx) = mpsc::channel(8);
    let vision = VisionChannel::new(ChannelIntervals::new(20, 10), sees_cat, tx);
    vision.push_frame(frame());
    vision.push_frame(frame());
    vision.start().unwrap();
    rx.recv().await.unwrap();
    assert_eq!(vision.dropped_frames(), 1);
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    vision.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn throttles_fast_capture() {
    let (tx, mut rx) = mpsc::channel(64);
    let vision = Arc::new(VisionChannel::new(
        ChannelIntervals::new(100, 100),
        sees_cat,
        tx,
    ));
    vision.start().unwrap();
    let camera = {
        let vision = vision.clone();
        tokio::spawn(async move {
            for _ in 0..100 {
                vision.push_frame(frame());
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };
    camera.await.unwrap();
    vision.stop().await;
    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    // ~500ms of capture at one inference per 100ms
    assert!((3..=10).contains(&count), "unexpected cycle count {count}");
    assert!(vision.dropped_frames() > 50);
}

#[tokio::test]
async fn detector_error_reports_absence() {
    let (tx, mut rx) = mpsc::channel(8);
    let vision = VisionChannel::new(
        ChannelIntervals::new(20, 10),
        |_: &Frame| -> anyhow::Result<Inference> { Err(anyhow!("no model")) },
        tx,
    );
    vision.start().unwrap();
    vision.push_frame(frame());
    let event = rx.recv().await.unwrap();
    assert!(!event.presence);
    vision.push_frame(frame());
    assert!(!rx.recv().await.unwrap().presence);
    vision.stop().await;
}

#[tokio::test]
async fn stop_silences_channel() {
    let (tx, mut rx) = mpsc::channel(8);
    let vision = VisionChannel::new(ChannelIntervals::new(20, 10), sees_cat, tx);
    vision.start().unwrap();
    vision.push_frame(frame());
    rx.recv().await.unwrap();
    vision.stop().await;
    vision.push_frame(frame());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
    assert!(!vision.is_running());
}
