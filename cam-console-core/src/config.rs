use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;

/// Configuration for the camera console engine.
///
/// All intervals are in milliseconds so the struct round-trips cleanly
/// through the JSON config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the camera server
    pub base_url: String,
    /// Debounce window for continuous-range controls (color sliders)
    pub continuous_debounce_ms: u64,
    /// Debounce window for discrete/occasional controls (quality, FPS limit)
    pub discrete_debounce_ms: u64,
    /// Optional ceiling on how long a group's dispatch can keep being pushed
    /// back by further edits; `None` allows unbounded restarts
    pub debounce_max_wait_ms: Option<u64>,
    /// Per-dispatch request timeout; expiry is classified as a network error
    pub dispatch_timeout_ms: u64,
    /// Period of the authoritative camera-identity poll
    pub identity_poll_ms: u64,
    /// Period of the lightweight status probe
    pub status_poll_ms: u64,
    /// Delay before the first stream reload after a failure
    pub stream_retry_base_ms: u64,
    /// Cap on the stream reload delay under repeated failures
    pub stream_retry_max_ms: u64,
    /// How long after a successful camera switch poller corrections to the
    /// active camera are suppressed; 0 disables suppression
    pub switch_grace_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            continuous_debounce_ms: 500,
            discrete_debounce_ms: 1000,
            debounce_max_wait_ms: None,
            dispatch_timeout_ms: 10_000,
            identity_poll_ms: 10_000,
            status_poll_ms: 5_000,
            stream_retry_base_ms: 3_000,
            stream_retry_max_ms: 30_000,
            switch_grace_ms: 3_000,
        }
    }
}

impl ConsoleConfig {
    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if self.base_url.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig("base_url is empty".to_string()));
        }
        if self.dispatch_timeout_ms == 0 {
            return Err(ConsoleError::InvalidConfig(
                "dispatch_timeout_ms must be nonzero".to_string(),
            ));
        }
        if self.identity_poll_ms == 0 || self.status_poll_ms == 0 {
            return Err(ConsoleError::InvalidConfig(
                "poll intervals must be nonzero".to_string(),
            ));
        }
        if self.stream_retry_base_ms == 0 {
            return Err(ConsoleError::InvalidConfig(
                "stream_retry_base_ms must be nonzero".to_string(),
            ));
        }
        if self.stream_retry_max_ms < self.stream_retry_base_ms {
            return Err(ConsoleError::InvalidConfig(
                "stream_retry_max_ms must be >= stream_retry_base_ms".to_string(),
            ));
        }
        if let Some(max_wait) = self.debounce_max_wait_ms {
            if max_wait < self.continuous_debounce_ms || max_wait < self.discrete_debounce_ms {
                return Err(ConsoleError::InvalidConfig(
                    "debounce_max_wait_ms must be >= both debounce windows".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn continuous_debounce(&self) -> Duration {
        Duration::from_millis(self.continuous_debounce_ms)
    }

    pub fn discrete_debounce(&self) -> Duration {
        Duration::from_millis(self.discrete_debounce_ms)
    }

    pub fn debounce_max_wait(&self) -> Option<Duration> {
        self.debounce_max_wait_ms.map(Duration::from_millis)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn identity_poll(&self) -> Duration {
        Duration::from_millis(self.identity_poll_ms)
    }

    pub fn status_poll(&self) -> Duration {
        Duration::from_millis(self.status_poll_ms)
    }

    pub fn stream_retry_base(&self) -> Duration {
        Duration::from_millis(self.stream_retry_base_ms)
    }

    pub fn stream_retry_max(&self) -> Duration {
        Duration::from_millis(self.stream_retry_max_ms)
    }

    pub fn switch_grace(&self) -> Duration {
        Duration::from_millis(self.switch_grace_ms)
    }
}
