//! Adapters from raw model output to presence decisions.

use sensor::{AudioClip, Detection, Detector, Frame, Inference};

/// Sound classifier returning the score of the "meow" class.
pub trait AudioClassifier: Send {
    fn meow_score(&mut self, clip: &AudioClip) -> anyhow::Result<f32>;
}

/// Object detector returning labelled boxes for a frame.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Vec<Detection>>;
}

/// Meowing when the classifier score exceeds `threshold`.
pub struct MeowDetector<C> {
    classifier: C,
    threshold: f32,
}

impl<C: AudioClassifier> MeowDetector<C> {
    pub fn new(classifier: C, threshold: f32) -> Self {
        Self {
            classifier,
            threshold,
        }
    }
}

impl<C: AudioClassifier> Detector<AudioClip> for MeowDetector<C> {
    fn infer(&mut self, clip: &AudioClip) -> anyhow::Result<Inference> {
        let score = self.classifier.meow_score(clip)?;
        Ok(Inference::from_score(score, self.threshold))
    }
}

/// A cat is present when any detection carries `label`.
pub struct CatDetector<D> {
    detector: D,
    label: String,
}

impl<D: ObjectDetector> CatDetector<D> {
    pub fn new(detector: D, label: impl Into<String>) -> Self {
        Self {
            detector,
            label: label.into(),
        }
    }
}

impl<D: ObjectDetector> Detector<Frame> for CatDetector<D> {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<Inference> {
        let found = self.detector.detect(frame)?;
        Ok(Inference::from_labels(&found, &self.label))
    }
}
