use thiserror::Error;

use crate::Channel;

/// Failures starting a channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0} channel cannot start outside a tokio runtime")]
    NoRuntime(Channel),
}

/// Rejected interval configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{channel} interval must be non-zero")]
    ZeroInterval { channel: Channel },
    #[error("{channel} boosted interval {boosted_ms}ms exceeds idle interval {idle_ms}ms")]
    InvalidInterval {
        channel: Channel,
        idle_ms: u64,
        boosted_ms: u64,
    },
}
