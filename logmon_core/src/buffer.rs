use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Ordered, prunable store of values keyed by timestamp (seconds).
///
/// Both window aggregators keep their pending data here: out-of-order
/// arrivals land under their own key, windows are read by inclusive range
/// scans, and settled history is dropped with [`TimeBuffer::prune_before`].
#[derive(Debug, Clone)]
pub struct TimeBuffer<V> {
    entries: BTreeMap<u64, V>,
    most_recent: u64,
}

impl<V> Default for TimeBuffer<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            most_recent: 0,
        }
    }
}

impl<V: Default> TimeBuffer<V> {
    /// Returns the slot for `timestamp`, creating an empty one if needed, and
    /// advances the most recent timestamp seen.
    pub fn slot(&mut self, timestamp: u64) -> &mut V {
        self.most_recent = self.most_recent.max(timestamp);
        self.entries.entry(timestamp).or_default()
    }
}

impl<V> TimeBuffer<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest timestamp ever inserted. Pruning does not lower it.
    pub fn most_recent(&self) -> u64 {
        self.most_recent
    }

    pub fn first_key(&self) -> Option<u64> {
        self.entries.keys().next().copied()
    }

    pub fn get(&self, timestamp: u64) -> Option<&V> {
        self.entries.get(&timestamp)
    }

    pub fn range(&self, bounds: RangeInclusive<u64>) -> impl Iterator<Item = (u64, &V)> + '_ {
        self.entries.range(bounds).map(|(k, v)| (*k, v))
    }

    /// First buffered timestamp at or after `timestamp`.
    pub fn next_from(&self, timestamp: u64) -> Option<u64> {
        self.entries.range(timestamp..).next().map(|(k, _)| *k)
    }

    /// Drops every key strictly less than `bound`.
    pub fn prune_before(&mut self, bound: u64) {
        let kept = self.entries.split_off(&bound);
        self.entries = kept;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
