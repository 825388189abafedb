use std::time::Duration;

use crate::DetectorError;

/// How long to wait after startup before sending or expecting heartbeats.
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(5);
/// How often heartbeats are sent to every neighbor.
pub const DEFAULT_BEAT_INTERVAL: Duration = Duration::from_secs(1);
/// How long a neighbor may stay silent before it is suspected.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Timing settings for the failure detector.
pub struct DetectorConfig {
    /// Gives every peer's transport time to bind before heartbeats start.
    pub start_delay: Duration,
    /// The time between two heartbeats to the same neighbor.
    pub beat_interval: Duration,
    /// The silence after which a neighbor is reported.
    ///
    /// This is also the interval neighbors are checked at.
    pub timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            start_delay: DEFAULT_START_DELAY,
            beat_interval: DEFAULT_BEAT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DetectorConfig {
    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }

    pub fn with_beat_interval(mut self, beat_interval: Duration) -> Self {
        self.beat_interval = beat_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the timeout tolerates at least one lost heartbeat.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.beat_interval.is_zero() {
            return Err(DetectorError::ZeroDuration("beat interval"));
        }

        if self.timeout.is_zero() {
            return Err(DetectorError::ZeroDuration("timeout"));
        }

        if self.timeout < self.beat_interval * 2 {
            return Err(DetectorError::TimeoutTooShort {
                timeout: self.timeout,
                beat_interval: self.beat_interval,
            });
        }

        Ok(())
    }
}
