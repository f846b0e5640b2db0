use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Channel, ConfigError, RateMode};

/// Idle and boosted periods of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelIntervals {
    pub idle_ms: u64,
    pub boosted_ms: u64,
}

impl ChannelIntervals {
    pub const fn new(idle_ms: u64, boosted_ms: u64) -> Self {
        Self { idle_ms, boosted_ms }
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn boosted(&self) -> Duration {
        Duration::from_millis(self.boosted_ms)
    }

    pub fn for_mode(&self, mode: RateMode) -> Duration {
        match mode {
            RateMode::Idle => self.idle(),
            RateMode::Boosted => self.boosted(),
        }
    }

    fn validate(&self, channel: Channel) -> Result<(), ConfigError> {
        if self.idle_ms == 0 || self.boosted_ms == 0 {
            return Err(ConfigError::ZeroInterval { channel });
        }
        if self.boosted_ms > self.idle_ms {
            return Err(ConfigError::InvalidInterval {
                channel,
                idle_ms: self.idle_ms,
                boosted_ms: self.boosted_ms,
            });
        }
        Ok(())
    }
}

/// Static interval table `{channel: {idle_ms, boosted_ms}}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalTable {
    pub vision: ChannelIntervals,
    pub audio: ChannelIntervals,
}

impl IntervalTable {
    pub const VISION: ChannelIntervals = ChannelIntervals::new(1000, 200);
    pub const AUDIO: ChannelIntervals = ChannelIntervals::new(1000, 50);

    pub fn get(&self, channel: Channel) -> ChannelIntervals {
        match channel {
            Channel::Vision => self.vision,
            Channel::Audio => self.audio,
        }
    }

    /// Reject zero periods and boosted periods slower than idle ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            self.get(channel).validate(channel)?;
        }
        Ok(())
    }
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            vision: Self::VISION,
            audio: Self::AUDIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_table() {
        let t = IntervalTable::default();
        assert_eq!(t.get(Channel::Audio).boosted(), Duration::from_millis(50));
        assert_eq!(t.get(Channel::Vision).boosted(), Duration::from_millis(200));
        assert_eq!(t.get(Channel::Vision).for_mode(RateMode::Idle), Duration::from_secs(1));
        assert!(t.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let t: IntervalTable =
            serde_json::from_str(r#"{"audio":{"idle_ms":500,"boosted_ms":25}}"#).unwrap();
        assert_eq!(t.audio, ChannelIntervals::new(500, 25));
        assert_eq!(t.vision, IntervalTable::VISION);
    }

    #[test]
    fn rejects_inverted_intervals() {
        let t = IntervalTable {
            vision: ChannelIntervals::new(100, 200),
            ..Default::default()
        };
        assert_eq!(
            t.validate(),
            Err(ConfigError::InvalidInterval {
                channel: Channel::Vision,
                idle_ms: 100,
                boosted_ms: 200
            })
        );
    }

    #[test]
    fn rejects_zero() {
        let t = IntervalTable {
            audio: ChannelIntervals::new(1000, 0),
            ..Default::default()
        };
        assert_eq!(
            t.validate(),
            Err(ConfigError::ZeroInterval {
                channel: Channel::Audio
            })
        );
    }
}
