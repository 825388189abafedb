use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    #[error(
        "Timeout duration ({timeout:?}) must be at least twice the beat interval ({beat_interval:?})"
    )]
    /// The timeout would not tolerate a single lost heartbeat.
    TimeoutTooShort {
        timeout: Duration,
        beat_interval: Duration,
    },

    #[error("The {0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("At least one neighbor is required")]
    NoNeighbors,
}
