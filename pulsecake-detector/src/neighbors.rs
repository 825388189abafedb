use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// The last time each neighbor was heard from.
///
/// Every neighbor owns a single atomic slot holding nanoseconds since the
/// table's base instant, so the receive path and the timeout checker never
/// contend on a lock. Slots only ever move forward.
pub struct NeighborTable {
    base: Instant,
    slots: BTreeMap<String, AtomicU64>,
}

impl NeighborTable {
    /// Creates a table where every neighbor was last seen at `base`.
    pub fn new(neighbors: impl IntoIterator<Item = String>, base: Instant) -> Self {
        let slots = neighbors
            .into_iter()
            .map(|id| (id, AtomicU64::new(0)))
            .collect();
        Self { base, slots }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(|id| id.as_str())
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Records that `id` was heard from at `now`.
    ///
    /// Returns `false` if `id` is not a neighbor.
    pub fn record(&self, id: &str, now: Instant) -> bool {
        match self.slots.get(id) {
            Some(slot) => {
                slot.fetch_max(self.offset(now), Ordering::AcqRel);
                true
            },
            None => false,
        }
    }

    /// The last time `id` was heard from, or the base instant if never.
    pub fn last_seen(&self, id: &str) -> Option<Instant> {
        let nanos = self.slots.get(id)?.load(Ordering::Acquire);
        Some(self.base + Duration::from_nanos(nanos))
    }

    /// Returns every neighbor silent for at least `timeout` along with how long
    /// it has been silent.
    ///
    /// Each returned neighbor is treated as seen at `now`, so it is reported at
    /// most once per `timeout` until it is heard from again.
    pub fn expire(&self, now: Instant, timeout: Duration) -> Vec<(String, Duration)> {
        let now = self.offset(now);
        let timeout = timeout.as_nanos() as u64;

        let mut expired = Vec::new();
        for (id, slot) in self.slots.iter() {
            let last_seen = slot.load(Ordering::Acquire);
            let silent_for = now.saturating_sub(last_seen);
            if silent_for >= timeout {
                slot.fetch_max(now, Ordering::AcqRel);
                expired.push((id.clone(), Duration::from_nanos(silent_for)));
            }
        }
        expired
    }

    fn offset(&self, instant: Instant) -> u64 {
        instant.saturating_duration_since(self.base).as_nanos() as u64
    }
}
