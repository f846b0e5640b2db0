//! Sensor channels for the hungry-cat detector.
//!
//! Each channel wraps an opaque detector, runs it at a rate chosen by its
//! [`RateController`], and streams [`DetectionEvent`]s through an async
//! channel to whoever fuses them.

pub mod audio;
pub mod channel;
pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod interval;
mod lifecycle;
pub mod rate;
pub mod vision;

pub use audio::AudioChannel;
pub use channel::{Channel, RateMode};
pub use config::{ChannelIntervals, IntervalTable};
pub use detector::{AudioClip, Detection, Detector, Frame, Inference, Microphone};
pub use error::{ChannelError, ConfigError};
pub use event::DetectionEvent;
pub use interval::IntervalHandle;
pub use rate::RateController;
pub use vision::VisionChannel;

use async_trait::async_trait;
use std::time::Duration;

/// Common surface of both inference loops.
#[async_trait]
pub trait InferenceChannel: Send + Sync {
    /// Which sensor this loop belongs to.
    fn channel(&self) -> Channel;

    /// Begin the loop. Calling it on a running channel does nothing.
    fn start(&self) -> Result<(), ChannelError>;

    /// Cancel the loop and wait for it to wind down. No event is reported
    /// after this returns.
    async fn stop(&self);

    /// Whether the loop task is currently installed.
    fn is_running(&self) -> bool;

    /// Handle used by a [`RateController`] to reschedule this channel.
    fn interval_handle(&self) -> IntervalHandle;

    /// Change the period used from the next scheduling decision on.
    fn set_interval(&self, interval: Duration) {
        self.interval_handle().set(interval);
    }

    /// Period currently in effect.
    fn interval(&self) -> Duration {
        self.interval_handle().get()
    }

    /// Number of completed inference cycles since construction.
    fn cycles(&self) -> u64;
}
