//! # Pulsecake Detector
//! A heartbeat based failure detector.
//!
//! Each node sends a small heartbeat to all of its neighbors every beat interval
//! and reports any neighbor it has not heard from within the timeout duration.
//! Detection is continuous: a reported neighbor is reported again after every
//! further timeout of silence, and stops being reported as soon as anything is
//! received from it.
//!
//! This is not a consensus protocol, suspicions are local and approximate.

#[macro_use]
extern crate tracing;

mod config;
mod detector;
mod error;
mod neighbors;
mod network;
mod statistics;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    DetectorConfig,
    DEFAULT_BEAT_INTERVAL,
    DEFAULT_START_DELAY,
    DEFAULT_TIMEOUT,
};
pub use detector::{FailureDetector, Suspicion, HEARTBEAT_PAYLOAD, SUSPICION_BUFFER};
pub use error::DetectorError;
pub use neighbors::NeighborTable;
pub use network::Network;
pub use statistics::DetectorStatistics;
