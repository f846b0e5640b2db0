//! Boundary with the opaque models and capture devices.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What a detector reports for one input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Inference {
    pub presence: bool,
    pub score: f32,
}

impl Inference {
    /// Presence when `score` is strictly above `threshold`.
    ///
    /// ```
    /// use sensor::Inference;
    /// assert!(Inference::from_score(0.9, 0.3).presence);
    /// assert!(!Inference::from_score(0.3, 0.3).presence);
    /// ```
    pub fn from_score(score: f32, threshold: f32) -> Self {
        Self {
            presence: score > threshold,
            score,
        }
    }

    /// Presence when any detection carries `label`; the score is the best
    /// matching detection's.
    pub fn from_labels(detections: &[Detection], label: &str) -> Self {
        let best = detections
            .iter()
            .filter(|d| d.label == label)
            .map(|d| d.score)
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))));
        Self {
            presence: best.is_some(),
            score: best.unwrap_or(0.0),
        }
    }
}

/// One labelled box from an object detector.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub score: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Opaque inference model for inputs of type `I`.
///
/// Calls may block for a long time and may fail; either way the channel
/// keeps running.
pub trait Detector<I>: Send {
    fn infer(&mut self, input: &I) -> anyhow::Result<Inference>;
}

impl<I, F> Detector<I> for F
where
    F: FnMut(&I) -> anyhow::Result<Inference> + Send,
{
    fn infer(&mut self, input: &I) -> anyhow::Result<Inference> {
        self(input)
    }
}

/// Pull source of audio for the periodic channel.
pub trait Microphone: Send {
    /// Read the next clip, blocking until enough samples are buffered.
    fn record(&mut self) -> anyhow::Result<AudioClip>;
}

/// Mono audio samples ready for classification.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// A camera frame delivered by the capture pipeline.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: u16,
    /// RGBA8888 pixels
    pub pixels: Arc<[u8]>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            rotation_degrees: 0,
            pixels: pixels.into(),
            captured_at: Utc::now(),
        }
    }
}
