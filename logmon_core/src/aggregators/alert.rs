use crate::{
    aggregators::WindowAggregator,
    buffer::TimeBuffer,
    config::MonitorConfig,
    event::LogEvent,
    report::AlertEvent,
    window::SettlingWindow,
};
use tracing::{debug, info, warn};

pub const DEFAULT_ALERT_THRESHOLD: u64 = 10;

/// Sliding-window traffic alerting.
///
/// The window slides one second at a time once settled. Its hit total is
/// computed by a full scan only for the first window, then kept up to date
/// by subtracting the second that leaves and adding the second that enters.
/// An [`AlertEvent`] is produced only when the average crosses the threshold.
pub struct AlertAggregator {
    window: SettlingWindow,
    buffer: TimeBuffer<u64>,
    threshold: u64,
    is_active: bool,
    cumulative_hits: u64,
    first_window_computed: bool,
}

impl AlertAggregator {
    pub fn new(window_size: u64, settling_delay: u64) -> Self {
        Self {
            window: SettlingWindow::new(window_size, settling_delay),
            buffer: TimeBuffer::new(),
            threshold: DEFAULT_ALERT_THRESHOLD,
            is_active: false,
            cumulative_hits: 0,
            first_window_computed: false,
        }
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.alert_window_secs(), config.settling_delay_secs())
            .with_threshold(config.alert_threshold)
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Hit total of the most recently evaluated window.
    pub fn cumulative_hits(&self) -> u64 {
        self.cumulative_hits
    }

    /// Bounds of the most recently evaluated window, if any.
    pub fn last_evaluated(&self) -> Option<(u64, u64)> {
        if !self.first_window_computed {
            return None;
        }
        let start = self.window.start()? - 1;
        Some((start, start + self.window.size() - 1))
    }

    fn count_at(&self, timestamp: u64) -> u64 {
        self.buffer.get(timestamp).copied().unwrap_or(0)
    }

    fn record(&mut self, timestamp: u64) {
        *self.buffer.slot(timestamp) += 1;

        // A late hit inside the window already summed must be part of the
        // running total, or the next slide would subtract more than was added.
        if let Some((start, end)) = self.last_evaluated() {
            if (start..=end).contains(&timestamp) {
                self.cumulative_hits += 1;
            }
        }
    }

    fn slide(&mut self, start: u64, end: u64) {
        if !self.first_window_computed {
            self.cumulative_hits = self.buffer.range(start..=end).map(|(_, n)| *n).sum();
            self.first_window_computed = true;
        } else {
            self.cumulative_hits -= self.count_at(start - 1);
            self.cumulative_hits += self.count_at(end);
        }
    }

    /// After an empty window with no alert raised, every window ending
    /// before the next buffered second is empty too and cannot change state.
    /// Jumps to the first window that contains that second.
    fn skip_idle(&mut self, end: u64) {
        let (Some(start), Some(next)) = (self.window.start(), self.buffer.next_from(end + 1))
        else {
            return;
        };
        let target = next + 1 - self.window.size();
        if target > start {
            debug!("Alert window idle from {} until {}", start, target);
            self.window.advance(target - start);
        }
    }

    fn transition(&mut self, average: u64, end: u64) -> Option<AlertEvent> {
        let crossed = if self.is_active {
            average < self.threshold
        } else {
            average >= self.threshold
        };
        if !crossed {
            return None;
        }

        self.is_active = !self.is_active;
        if self.is_active {
            info!("Traffic alert raised at {}: {} hits/s", end, average);
        } else {
            info!("Traffic alert cleared at {}: {} hits/s", end, average);
        }

        Some(AlertEvent {
            window_end_time: end,
            is_active: self.is_active,
            average_hits_per_second: average,
        })
    }
}

impl WindowAggregator for AlertAggregator {
    type Output = AlertEvent;

    fn ingest(&mut self, event: &LogEvent) -> Vec<AlertEvent> {
        if !event.is_valid() {
            return Vec::new();
        }
        if !self.window.accepts(event.timestamp) {
            warn!("Dropping event with out-of-range timestamp {}", event.timestamp);
            return Vec::new();
        }

        self.record(event.timestamp);
        self.window
            .establish(self.buffer.first_key(), self.buffer.most_recent());

        let mut emitted = Vec::new();
        while let Some(bounds) = self.window.ready(self.buffer.most_recent()) {
            let (start, end) = bounds.into_inner();
            self.slide(start, end);

            let average = self.cumulative_hits / self.window.size();
            debug!(
                "Alert window [{}, {}]: {} hits, average {}",
                start, end, self.cumulative_hits, average
            );
            if let Some(alert) = self.transition(average, end) {
                emitted.push(alert);
            }

            self.window.advance(1);
            if self.cumulative_hits == 0 && !self.is_active {
                self.skip_idle(end);
            }
        }

        // One second before the next window is kept for the next subtraction.
        if let Some(start) = self.window.start() {
            self.buffer.prune_before(start.saturating_sub(1));
        }

        emitted
    }

    fn name(&self) -> &str {
        "alert"
    }

    fn buffered_timestamps(&self) -> usize {
        self.buffer.len()
    }
}
