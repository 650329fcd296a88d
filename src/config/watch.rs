use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Watch driver tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Capacity of each watcher's notification channel
    ///
    /// A watch fire only needs one pending refresh per watcher: when the
    /// channel is full the refresh already queued will observe the newest
    /// child set, so extra notifications are dropped.
    ///
    /// **Default**: 16
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl WatchConfig {
    /// Validates watch configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.event_buffer_size must be greater than 0".into(),
            )));
        }

        if self.event_buffer_size > 1024 {
            warn!(
                "watch.event_buffer_size ({}) is very large; one pending refresh per watcher is enough",
                self.event_buffer_size
            );
        }

        Ok(())
    }
}

const fn default_event_buffer_size() -> usize {
    16
}
