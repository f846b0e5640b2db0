use sensor::IntervalTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Problems loading or validating [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Interval(#[from] sensor::ConfigError),
    #[error("audio threshold {0} is outside 0.0..=1.0")]
    Threshold(f32),
    #[error("vision label must not be empty")]
    EmptyLabel,
    #[error("stale window {stale_after_ms}ms must exceed the slowest idle interval {min_ms}ms")]
    StaleWindow { stale_after_ms: u64, min_ms: u64 },
}

/// Service configuration, usually loaded from a JSON file.
///
/// Every field is optional in the file; missing ones take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub intervals: IntervalTable,
    /// Meow score above which audio counts as presence
    pub audio_threshold: f32,
    /// Object label that counts as presence on the camera
    pub vision_label: String,
    /// Treat a channel flag older than this as absent. Unset keeps flags
    /// until overwritten.
    pub stale_after_ms: Option<u64>,
    /// Capacity of the detection queue and the subscriber broadcasts
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intervals: IntervalTable::default(),
            audio_threshold: 0.3,
            vision_label: "cat".into(),
            stale_after_ms: None,
            event_capacity: 16,
        }
    }
}

impl Config {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.intervals.validate()?;
        if !(0.0..=1.0).contains(&self.audio_threshold) {
            return Err(ConfigError::Threshold(self.audio_threshold));
        }
        if self.vision_label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel);
        }
        // an idle channel reports once per idle period; a shorter window
        // would expire its flag between reports
        if let Some(stale_after_ms) = self.stale_after_ms {
            let min_ms = self.intervals.vision.idle_ms.max(self.intervals.audio.idle_ms);
            if stale_after_ms <= min_ms {
                return Err(ConfigError::StaleWindow {
                    stale_after_ms,
                    min_ms,
                });
            }
        }
        Ok(())
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_ms.map(Duration::from_millis)
    }
}
