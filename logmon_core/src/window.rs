use std::ops::RangeInclusive;

/// Start/size bookkeeping shared by the tumbling and sliding aggregators.
///
/// A window `[start, start + size - 1]` is settled once the most recent
/// timestamp observed is at least `settling_delay` seconds past its end. The
/// very first start is only fixed once the earliest buffered timestamp is
/// itself `settling_delay` seconds old, so late arrivals before it can still
/// become the first window's start.
#[derive(Debug, Clone)]
pub struct SettlingWindow {
    size: u64,
    settling_delay: u64,
    start: Option<u64>,
}

impl SettlingWindow {
    /// A zero `size` is treated as one second.
    pub fn new(size: u64, settling_delay: u64) -> Self {
        Self {
            size: size.max(1),
            settling_delay,
            start: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn settling_delay(&self) -> u64 {
        self.settling_delay
    }

    pub fn start(&self) -> Option<u64> {
        self.start
    }

    /// Whether a window holding `timestamp` can ever be settled without the
    /// window arithmetic leaving the `u64` range.
    pub fn accepts(&self, timestamp: u64) -> bool {
        timestamp
            .checked_add(self.size)
            .and_then(|t| t.checked_add(self.settling_delay))
            .is_some()
    }

    /// Fixes the first start from the earliest buffered key, if it has settled.
    pub fn establish(&mut self, first_key: Option<u64>, most_recent: u64) {
        if self.start.is_some() {
            return;
        }
        if let Some(first) = first_key {
            if most_recent >= first.saturating_add(self.settling_delay) {
                self.start = Some(first);
            }
        }
    }

    /// Bounds of the current window if it has settled.
    pub fn ready(&self, most_recent: u64) -> Option<RangeInclusive<u64>> {
        let start = self.start?;
        let end = start.checked_add(self.size - 1)?;
        if most_recent >= end.checked_add(self.settling_delay)? {
            Some(start..=end)
        } else {
            None
        }
    }

    pub fn advance(&mut self, seconds: u64) {
        self.start = self.start.map(|start| start.saturating_add(seconds));
    }
}
