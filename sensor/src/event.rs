use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Channel, Inference};

/// Result of one inference cycle on one channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Channel that produced the result
    pub channel: Channel,
    /// Whether the target was detected this cycle
    pub presence: bool,
    /// Raw detector score backing `presence`
    pub score: f32,
    /// When the inference was invoked
    pub timestamp: DateTime<Utc>,
}

impl DetectionEvent {
    /// Wrap a detector result stamped with the invocation time.
    pub fn new(channel: Channel, inference: Inference, timestamp: DateTime<Utc>) -> Self {
        Self {
            channel,
            presence: inference.presence,
            score: inference.score,
            timestamp,
        }
    }

    /// Negative event reported when a cycle fails.
    pub fn failed(channel: Channel, timestamp: DateTime<Utc>) -> Self {
        Self {
            channel,
            presence: false,
            score: 0.0,
            timestamp,
        }
    }

    /// Event stamped with the current time.
    pub fn now(channel: Channel, presence: bool, score: f32) -> Self {
        Self {
            channel,
            presence,
            score,
            timestamp: Utc::now(),
        }
    }
}
