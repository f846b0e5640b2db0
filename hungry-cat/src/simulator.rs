//! Synthetic sensors and models for running without hardware.

use rand::Rng;
use sensor::{AudioClip, Detection, Frame, Microphone, VisionChannel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

use crate::{AudioClassifier, ObjectDetector};

/// Microphone producing low-level noise clips.
#[derive(Clone, Debug)]
pub struct SimulatedMicrophone {
    pub sample_rate: u32,
    pub clip_len: usize,
}

impl Default for SimulatedMicrophone {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            clip_len: 15_600,
        }
    }
}

impl Microphone for SimulatedMicrophone {
    fn record(&mut self) -> anyhow::Result<AudioClip> {
        let mut rng = rand::thread_rng();
        let samples = (0..self.clip_len)
            .map(|_| rng.gen_range(-0.01f32..0.01))
            .collect();
        Ok(AudioClip {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}

/// Classifier that hears a meow with the given probability.
#[derive(Clone, Debug)]
pub struct RandomClassifier {
    pub meow_probability: f64,
}

impl RandomClassifier {
    pub fn new(meow_probability: f64) -> Self {
        Self {
            meow_probability: meow_probability.clamp(0.0, 1.0),
        }
    }
}

impl AudioClassifier for RandomClassifier {
    fn meow_score(&mut self, _clip: &AudioClip) -> anyhow::Result<f32> {
        let mut rng = rand::thread_rng();
        Ok(if rng.gen_bool(self.meow_probability) {
            rng.gen_range(0.5..1.0)
        } else {
            rng.gen_range(0.0..0.2)
        })
    }
}

/// Object detector that sees a cat with the given probability.
#[derive(Clone, Debug)]
pub struct RandomObjectDetector {
    pub cat_probability: f64,
}

impl RandomObjectDetector {
    pub fn new(cat_probability: f64) -> Self {
        Self {
            cat_probability: cat_probability.clamp(0.0, 1.0),
        }
    }
}

impl ObjectDetector for RandomObjectDetector {
    fn detect(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Detection>> {
        let mut rng = rand::thread_rng();
        let mut found = Vec::new();
        if rng.gen_bool(self.cat_probability) {
            found.push(Detection::new("cat", rng.gen_range(0.5..1.0)));
        }
        if rng.gen_bool(0.1) {
            found.push(Detection::new("person", rng.gen_range(0.3..1.0)));
        }
        Ok(found)
    }
}

/// Capture thread pushing blank frames at a fixed rate, standing in for a
/// camera pipeline with keep-latest delivery.
pub struct SimulatedCamera {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SimulatedCamera {
    pub const WIDTH: u32 = 64;
    pub const HEIGHT: u32 = 48;

    pub fn spawn(vision: Arc<VisionChannel>, fps: u32) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let period = Duration::from_secs(1) / fps.max(1);
        let thread = {
            let running = running.clone();
            std::thread::spawn(move || {
                info!(fps, "simulated camera started");
                let pixels: Arc<[u8]> = vec![0u8; (Self::WIDTH * Self::HEIGHT * 4) as usize].into();
                while running.load(Ordering::Relaxed) {
                    vision.push_frame(Frame::new(Self::WIDTH, Self::HEIGHT, pixels.clone()));
                    std::thread::sleep(period);
                }
            })
        };
        Self {
            running,
            thread: Some(thread),
        }
    }

    /// Stop capturing and join the thread.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        self.halt();
    }
}
