use std::fmt::{Display, Formatter};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::{DetectorConfig, DetectorError, DetectorStatistics, NeighborTable, Network};

/// How many unread failure reports are kept before new ones are dropped.
pub const SUSPICION_BUFFER: usize = 1024;

/// The payload sent to every neighbor on each beat.
pub static HEARTBEAT_PAYLOAD: &[u8] = b"heartbeat";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A neighbor has not been heard from for at least the timeout duration.
pub struct Suspicion {
    /// The ID of the silent neighbor.
    pub neighbor: String,
    /// How long the neighbor had been silent when it was reported.
    pub silent_for: Duration,
}

impl Display for Suspicion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed", self.neighbor)
    }
}

/// A running heartbeat failure detector.
///
/// After the configured start delay the detector sends a heartbeat to every
/// neighbor each beat interval and checks every timeout whether any neighbor
/// has gone quiet. Any message from a neighbor counts as a sign of life.
///
/// Suspicions are best-effort: a congested but healthy neighbor can be
/// reported, and a reported neighbor is considered alive again as soon as it
/// is heard from.
pub struct FailureDetector {
    neighbors: Vec<String>,
    statistics: DetectorStatistics,
    suspicions: flume::Receiver<Suspicion>,
    handle: JoinHandle<()>,
}

impl FailureDetector {
    /// Validates the config and spawns the detector tasks.
    ///
    /// Duplicate neighbors are only monitored once.
    pub fn start<N>(
        network: Arc<N>,
        neighbors: impl IntoIterator<Item = impl Into<String>>,
        config: DetectorConfig,
    ) -> Result<Self, DetectorError>
    where
        N: Network,
    {
        config.validate()?;

        let mut neighbors = neighbors.into_iter().map(Into::into).collect::<Vec<String>>();
        neighbors.sort();
        neighbors.dedup();
        if neighbors.is_empty() {
            return Err(DetectorError::NoNeighbors);
        }

        let statistics = DetectorStatistics::default();
        let (tx, rx) = flume::bounded(SUSPICION_BUFFER);

        info!(
            id = %network.id(),
            neighbors = %neighbors.join(", "),
            start_delay = ?config.start_delay,
            beat_interval = ?config.beat_interval,
            timeout = ?config.timeout,
            "Starting failure detector."
        );

        let handle = tokio::spawn(run_detector(
            network,
            neighbors.clone(),
            config,
            statistics.clone(),
            tx,
        ));

        Ok(Self {
            neighbors,
            statistics,
            suspicions: rx,
            handle,
        })
    }

    #[inline]
    /// The neighbors being monitored.
    pub fn neighbors(&self) -> &[String] {
        &self.neighbors
    }

    #[inline]
    /// Gets the live detector statistics.
    pub fn statistics(&self) -> DetectorStatistics {
        self.statistics.clone()
    }

    /// The stream of failure reports.
    ///
    /// At most [SUSPICION_BUFFER] unread reports are kept, later ones are
    /// dropped and counted in [DetectorStatistics] until the stream is drained.
    pub fn suspicions(&self) -> flume::Receiver<Suspicion> {
        self.suspicions.clone()
    }

    /// Waits for the next failure report.
    ///
    /// Returns `None` once the detector has been shut down.
    pub async fn next_suspicion(&self) -> Option<Suspicion> {
        self.suspicions.recv_async().await.ok()
    }

    /// Stops sending heartbeats and checking neighbors.
    ///
    /// Heartbeats which are already in flight are left to complete.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for FailureDetector {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Waits out the start delay, then runs the beat, receive and check loops.
///
/// The loops live in a [JoinSet] so aborting this task stops all of them.
async fn run_detector<N: Network>(
    network: Arc<N>,
    neighbors: Vec<String>,
    config: DetectorConfig,
    statistics: DetectorStatistics,
    suspicions: flume::Sender<Suspicion>,
) {
    tokio::time::sleep(config.start_delay).await;

    let start = Instant::now();
    let table = Arc::new(NeighborTable::new(neighbors.clone(), start));

    let mut tasks = JoinSet::new();
    tasks.spawn(beat_loop(
        network.clone(),
        neighbors,
        config.beat_interval,
        statistics.clone(),
    ));
    tasks.spawn(receive_loop(network.clone(), table.clone(), statistics.clone()));
    tasks.spawn(check_loop(
        network.id().to_string(),
        table,
        start,
        config.timeout,
        statistics,
        suspicions,
    ));

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                error!(id = %network.id(), error = ?e, "Failure detector task panicked.");
            }
        }
    }
}

/// Sends a heartbeat to every neighbor each beat interval.
///
/// Every send runs in its own task so a slow or hung neighbor never delays the
/// others. Failed sends are counted and dropped, never retried.
async fn beat_loop<N: Network>(
    network: Arc<N>,
    neighbors: Vec<String>,
    beat_interval: Duration,
    statistics: DetectorStatistics,
) {
    let payload = Bytes::from_static(HEARTBEAT_PAYLOAD);
    let mut interval = tokio::time::interval(beat_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        for neighbor in neighbors.iter() {
            let network = network.clone();
            let neighbor = neighbor.clone();
            let payload = payload.clone();
            let statistics = statistics.clone();

            tokio::spawn(async move {
                match network.send(&neighbor, payload).await {
                    Ok(()) => {
                        statistics.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
                    },
                    Err(e) => {
                        statistics.heartbeat_failures.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            id = %network.id(),
                            neighbor = %neighbor,
                            error = %e,
                            "Failed to send heartbeat."
                        );
                    },
                }
            });
        }
    }
}

/// Marks the sender of every inbound message as alive.
async fn receive_loop<N: Network>(
    network: Arc<N>,
    table: Arc<NeighborTable>,
    statistics: DetectorStatistics,
) {
    let inbox = network.receiver();
    while let Ok(msg) = inbox.recv_async().await {
        statistics.messages_received.fetch_add(1, Ordering::Relaxed);

        if !table.record(&msg.sender, Instant::now()) {
            trace!(
                id = %network.id(),
                sender = %msg.sender,
                "Ignoring message from a node which is not a neighbor."
            );
        }
    }

    warn!(id = %network.id(), "Inbound message stream ended, no more heartbeats will be received.");
}

/// Reports every neighbor which has been silent for at least `timeout`.
async fn check_loop(
    id: String,
    table: Arc<NeighborTable>,
    start: Instant,
    timeout: Duration,
    statistics: DetectorStatistics,
    suspicions: flume::Sender<Suspicion>,
) {
    let mut interval = tokio::time::interval_at(start + timeout, timeout);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The scheduled tick, not the wake up time, keeps checks `timeout` apart.
        let now = interval.tick().await;

        for (neighbor, silent_for) in table.expire(now, timeout) {
            statistics.suspicions_reported.fetch_add(1, Ordering::Relaxed);
            warn!(
                id = %id,
                neighbor = %neighbor,
                silent_for = ?silent_for,
                "Neighbor is suspected to have failed."
            );

            let suspicion = Suspicion {
                neighbor,
                silent_for,
            };
            if let Err(flume::TrySendError::Full(suspicion)) = suspicions.try_send(suspicion) {
                statistics.suspicions_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    id = %id,
                    neighbor = %suspicion.neighbor,
                    "Suspicion stream is full, dropping report."
                );
            }
        }
    }
}
