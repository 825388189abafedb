use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the failure detector.
pub struct DetectorStatistics(Arc<DetectorStatisticsInner>);

impl Deref for DetectorStatistics {
    type Target = DetectorStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct DetectorStatisticsInner {
    /// The number of heartbeats successfully handed to the network.
    pub(crate) heartbeats_sent: Counter,
    /// The number of heartbeats which could not be sent.
    pub(crate) heartbeat_failures: Counter,
    /// The number of inbound messages from any sender.
    pub(crate) messages_received: Counter,
    /// The number of failure reports emitted.
    pub(crate) suspicions_reported: Counter,
    /// The number of failure reports dropped because nobody read them.
    pub(crate) suspicions_dropped: Counter,
}

impl DetectorStatisticsInner {
    /// The number of heartbeats successfully handed to the network.
    pub fn heartbeats_sent(&self) -> u64 {
        self.heartbeats_sent.load(Ordering::Relaxed)
    }

    /// The number of heartbeats which could not be sent.
    pub fn heartbeat_failures(&self) -> u64 {
        self.heartbeat_failures.load(Ordering::Relaxed)
    }

    /// The number of inbound messages from any sender.
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// The number of failure reports emitted.
    pub fn suspicions_reported(&self) -> u64 {
        self.suspicions_reported.load(Ordering::Relaxed)
    }

    /// The number of failure reports dropped because nobody read them.
    pub fn suspicions_dropped(&self) -> u64 {
        self.suspicions_dropped.load(Ordering::Relaxed)
    }
}
