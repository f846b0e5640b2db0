use serde::{Deserialize, Serialize};
use std::fmt;

/// One sensor pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Vision,
    Audio,
}

impl Channel {
    /// Both channels, vision first.
    pub const ALL: [Channel; 2] = [Channel::Vision, Channel::Audio];

    /// The channel on the other side of the cross-trigger.
    pub fn other(self) -> Channel {
        match self {
            Channel::Vision => Channel::Audio,
            Channel::Audio => Channel::Vision,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Vision => f.write_str("vision"),
            Channel::Audio => f.write_str("audio"),
        }
    }
}

/// Inference rate of a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateMode {
    #[default]
    Idle,
    Boosted,
}
