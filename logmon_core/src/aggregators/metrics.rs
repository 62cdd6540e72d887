use crate::{
    aggregators::WindowAggregator,
    buffer::TimeBuffer,
    config::MonitorConfig,
    event::LogEvent,
    report::MetricsSummary,
    window::SettlingWindow,
};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// Consecutive empty windows emitted for one gap in the input before the
/// rest of the gap is skipped in a single step.
pub const MAX_EMPTY_WINDOWS: usize = 100;

/// Tumbling-window traffic summaries.
///
/// Events are buffered per timestamp until the window covering them has
/// settled; the window is then summarized once, the start jumps by a full
/// window size and everything before it is discarded. An event that arrives
/// after its window was emitted is dropped.
pub struct MetricsAggregator {
    window: SettlingWindow,
    buffer: TimeBuffer<Vec<LogEvent>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct HostStatus {
    successes: u64,
    failures: u64,
}

impl HostStatus {
    fn record(&mut self, success: bool) {
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    fn total(&self) -> u64 {
        self.successes + self.failures
    }

    fn rate_percent(&self) -> f64 {
        percent(self.successes, self.total())
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl MetricsAggregator {
    pub fn new(window_size: u64, settling_delay: u64) -> Self {
        Self {
            window: SettlingWindow::new(window_size, settling_delay),
            buffer: TimeBuffer::new(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.metrics_window_secs(), config.settling_delay_secs())
    }

    pub fn window_start(&self) -> Option<u64> {
        self.window.start()
    }

    pub fn most_recent(&self) -> u64 {
        self.buffer.most_recent()
    }

    /// Jumps the start to the window holding the next buffered timestamp,
    /// keeping the tumbling grid.
    fn skip_gap(&mut self) {
        let Some(start) = self.window.start() else {
            return;
        };
        if let Some(next) = self.buffer.next_from(start) {
            let size = self.window.size();
            let skipped = (next - start) / size;
            if skipped > 0 {
                warn!(
                    "Skipping {} empty metrics windows between {} and {}",
                    skipped, start, next
                );
                self.window.advance(skipped * size);
            }
        }
    }

    fn summarize(&self, bounds: RangeInclusive<u64>) -> MetricsSummary {
        let mut summary = MetricsSummary::empty(*bounds.start(), *bounds.end());
        let mut sections: BTreeMap<String, u64> = BTreeMap::new();
        let mut hosts: BTreeMap<&str, HostStatus> = BTreeMap::new();

        for event in self.buffer.range(bounds).flat_map(|(_, events)| events) {
            summary.hit_count += 1;

            if let Some(section) = event.section() {
                *sections.entry(section).or_default() += 1;
            }

            if let Some(verb) = event.verb() {
                summary.verb_counts.increment(verb);
            }

            if event.has_status() {
                hosts
                    .entry(event.remote_host.as_str())
                    .or_default()
                    .record(event.is_success());
            }
        }

        if let Some(highest) = sections.values().copied().max() {
            summary.top_section_hit_count = highest;
            summary.top_sections = sections
                .into_iter()
                .filter(|(_, count)| *count == highest)
                .map(|(section, _)| section)
                .collect();
        }

        let (successes, total) = hosts
            .values()
            .fold((0, 0), |(s, t), host| (s + host.successes, t + host.total()));
        summary.success_rate_percent = percent(successes, total);

        // Hosts iterate in lexicographic order, so ties keep the first host.
        let mut lowest: Option<(&str, f64)> = None;
        for (host, status) in &hosts {
            let rate = status.rate_percent();
            if lowest.map_or(true, |(_, lowest_rate)| rate < lowest_rate) {
                lowest = Some((*host, rate));
            }
        }
        if let Some((host, rate)) = lowest {
            summary.lowest_success_rate_host = Some(host.to_string());
            summary.lowest_success_rate_percent = rate;
        }

        summary
    }
}

impl WindowAggregator for MetricsAggregator {
    type Output = MetricsSummary;

    fn ingest(&mut self, event: &LogEvent) -> Vec<MetricsSummary> {
        if !event.is_valid() {
            return Vec::new();
        }
        if !self.window.accepts(event.timestamp) {
            warn!("Dropping event with out-of-range timestamp {}", event.timestamp);
            return Vec::new();
        }

        self.buffer.slot(event.timestamp).push(event.clone());
        self.window
            .establish(self.buffer.first_key(), self.buffer.most_recent());

        let mut emitted = Vec::new();
        let mut empty_run = 0;
        while let Some(bounds) = self.window.ready(self.buffer.most_recent()) {
            let summary = self.summarize(bounds);
            debug!(
                "Metrics window [{}, {}] settled with {} hits",
                summary.start_time, summary.end_time, summary.hit_count
            );
            if summary.hit_count == 0 {
                empty_run += 1;
            } else {
                empty_run = 0;
            }
            emitted.push(summary);
            self.window.advance(self.window.size());

            if empty_run >= MAX_EMPTY_WINDOWS {
                self.skip_gap();
                empty_run = 0;
            }
        }

        if let Some(start) = self.window.start() {
            self.buffer.prune_before(start);
        }

        emitted
    }

    fn name(&self) -> &str {
        "metrics"
    }

    fn buffered_timestamps(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FIXTURE: [(u64, i32, &str, &str); 19] = [
        (2, 200, "PUT /api/user HTTP/1.0", "10.0.0.3"),
        (1, 200, "DELETE /api/user HTTP/1.0", "10.0.0.1"),
        (1, 404, "GET /api/user HTTP/1.0", "10.0.0.2"),
        (1, 200, "POST /report HTTP/1.0", "10.0.0.1"),
        (2, 500, "PUT /api/user HTTP/1.0", "10.0.0.1"),
        (3, 200, "PATCH /report HTTP/1.0", "10.0.0.1"),
        (3, 200, "GET /api/user HTTP/1.0", "10.0.0.1"),
        (4, 200, "GET /api/user HTTP/1.0", "10.0.0.2"),
        (4, 200, "PUT /api/user HTTP/1.0", "10.0.0.3"),
        (5, 200, "POST /report HTTP/1.0", "10.0.0.1"),
        (5, 404, "GET /report HTTP/1.0", "10.0.0.4"),
        (7, 500, "PUT /api/user HTTP/1.0", "10.0.0.1"),
        (7, 200, "PUT /report HTTP/1.0", "10.0.0.1"),
        (9, 200, "GET /report HTTP/1.0", "10.0.0.1"),
        (10, 404, "GET /api/user HTTP/1.0", "10.0.0.2"),
        (10, 200, "PUT /api/user HTTP/1.0", "10.0.0.3"),
        (11, 200, "POST /report HTTP/1.0", "10.0.0.1"),
        (11, 500, "PUT /api/user HTTP/1.0", "10.0.0.1"),
        (12, 200, "PUT /report HTTP/1.0", "10.0.0.1"),
    ];

    fn feed(aggregator: &mut MetricsAggregator, events: &[LogEvent]) -> Vec<MetricsSummary> {
        events.iter().flat_map(|e| aggregator.ingest(e)).collect()
    }

    fn fixture() -> Vec<LogEvent> {
        FIXTURE
            .iter()
            .map(|(ts, status, request, host)| LogEvent::new(*ts, *request, *status, *host))
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.1,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_fixture_windows() {
        let mut aggregator = MetricsAggregator::new(3, 1);
        let summaries = feed(&mut aggregator, &fixture());

        // [10, 12] never settles: the last timestamp seen is 12.
        let ranges: Vec<(u64, u64)> = summaries
            .iter()
            .map(|s| (s.start_time, s.end_time))
            .collect();
        assert_eq!(ranges, vec![(1, 3), (4, 6), (7, 9)]);

        let hits: Vec<u64> = summaries.iter().map(|s| s.hit_count).collect();
        assert_eq!(hits, vec![7, 4, 3]);
    }

    #[test]
    fn test_fixture_sections_and_verbs() {
        let mut aggregator = MetricsAggregator::new(3, 1);
        let summaries = feed(&mut aggregator, &fixture());

        assert_eq!(summaries[0].top_sections, vec!["/api"]);
        assert_eq!(summaries[0].top_section_hit_count, 5);
        assert_eq!(summaries[1].top_sections, vec!["/api", "/report"]);
        assert_eq!(summaries[1].top_section_hit_count, 2);
        assert_eq!(summaries[2].top_sections, vec!["/report"]);
        assert_eq!(summaries[2].top_section_hit_count, 2);

        let verbs = summaries[0].verb_counts;
        assert_eq!(verbs.delete, 1);
        assert_eq!(verbs.get, 2);
        assert_eq!(verbs.patch, 1);
        assert_eq!(verbs.post, 1);
        assert_eq!(verbs.put, 2);
    }

    #[test]
    fn test_fixture_success_rates() {
        let mut aggregator = MetricsAggregator::new(3, 1);
        let summaries = feed(&mut aggregator, &fixture());

        assert_close(summaries[0].success_rate_percent, 71.43);
        assert_close(summaries[1].success_rate_percent, 75.0);
        assert_close(summaries[2].success_rate_percent, 66.67);

        assert_close(summaries[0].lowest_success_rate_percent, 0.0);
        assert_close(summaries[1].lowest_success_rate_percent, 0.0);
        assert_close(summaries[2].lowest_success_rate_percent, 66.67);

        assert_eq!(summaries[0].lowest_success_rate_host.as_deref(), Some("10.0.0.2"));
        assert_eq!(summaries[1].lowest_success_rate_host.as_deref(), Some("10.0.0.4"));
        assert_eq!(summaries[2].lowest_success_rate_host.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_gap_emits_empty_windows() {
        let mut aggregator = MetricsAggregator::new(3, 1);
        let summaries = feed(
            &mut aggregator,
            &[
                LogEvent::new(1, "GET /a HTTP/1.0", 200, "h1"),
                LogEvent::new(2, "GET /a HTTP/1.0", 200, "h1"),
                LogEvent::new(11, "GET /b HTTP/1.0", 200, "h1"),
            ],
        );

        let ranges: Vec<(u64, u64)> = summaries
            .iter()
            .map(|s| (s.start_time, s.end_time))
            .collect();
        assert_eq!(ranges, vec![(1, 3), (4, 6), (7, 9)]);
        assert_eq!(summaries[0].hit_count, 2);

        for empty in &summaries[1..] {
            assert_eq!(empty.hit_count, 0);
            assert!(empty.top_sections.is_empty());
            assert_eq!(empty.top_section_hit_count, 0);
            assert_eq!(empty.verb_counts.total(), 0);
            assert_eq!(empty.success_rate_percent, 0.0);
            assert!(empty.lowest_success_rate_host.is_none());
        }
    }

    #[test]
    fn test_far_future_gap_is_skipped() {
        let mut aggregator = MetricsAggregator::new(10, 4);
        assert!(aggregator.ingest(&LogEvent::at(1)).is_empty());

        let summaries = aggregator.ingest(&LogEvent::at(1_000_000_005));
        assert_eq!(summaries.len(), MAX_EMPTY_WINDOWS + 1);
        assert_eq!(summaries[0].hit_count, 1);
        assert!(summaries[1..].iter().all(|s| s.hit_count == 0));
        assert_eq!(summaries[MAX_EMPTY_WINDOWS].end_time, 1010);

        // The grid is kept: the next window is the one holding the far event.
        assert_eq!(aggregator.window_start(), Some(1_000_000_001));
        let summaries = aggregator.ingest(&LogEvent::at(1_000_000_020));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].start_time, 1_000_000_001);
        assert_eq!(summaries[0].end_time, 1_000_000_010);
        assert_eq!(summaries[0].hit_count, 1);
    }

    #[test]
    fn test_timestamps_near_u64_max_are_dropped() {
        let mut aggregator = MetricsAggregator::new(10, 4);
        assert!(aggregator.ingest(&LogEvent::at(u64::MAX)).is_empty());
        assert!(aggregator.ingest(&LogEvent::at(u64::MAX - 13)).is_empty());
        assert_eq!(aggregator.buffered_timestamps(), 0);
        assert_eq!(aggregator.window_start(), None);

        aggregator.ingest(&LogEvent::at(5));
        let summaries = aggregator.ingest(&LogEvent::at(20));
        assert_eq!(summaries.len(), 1);
        assert_eq!((summaries[0].start_time, summaries[0].end_time), (5, 14));

        // A huge timestamp after the window is running leaves it untouched.
        assert!(aggregator.ingest(&LogEvent::at(u64::MAX)).is_empty());
        assert_eq!(aggregator.window_start(), Some(15));
    }

    #[test]
    fn test_invalid_and_unknown_status_events() {
        let mut aggregator = MetricsAggregator::new(2, 0);
        let summaries = feed(
            &mut aggregator,
            &[
                LogEvent::new(0, "GET /ignored HTTP/1.0", 200, "h0"),
                LogEvent::new(5, "GET /a HTTP/1.0", 0, "h1"),
                LogEvent::new(5, "FETCH garbage", 200, "h2"),
                LogEvent::new(6, "GET /a HTTP/1.0", 503, "h3"),
            ],
        );

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.hit_count, 3);
        assert_eq!(summary.top_sections, vec!["/a"]);
        assert_eq!(summary.top_section_hit_count, 2);
        assert_eq!(summary.verb_counts.get, 2);
        assert_close(summary.success_rate_percent, 50.0);
        assert_eq!(summary.lowest_success_rate_host.as_deref(), Some("h3"));
    }

    #[test]
    fn test_lowest_host_tie_breaks_lexicographically() {
        let mut aggregator = MetricsAggregator::new(1, 1);
        let summaries = feed(
            &mut aggregator,
            &[
                LogEvent::new(1, "GET /a HTTP/1.0", 500, "zeta"),
                LogEvent::new(1, "GET /a HTTP/1.0", 500, "alpha"),
                LogEvent::new(1, "GET /a HTTP/1.0", 200, "beta"),
                LogEvent::new(2, "GET /a HTTP/1.0", 200, "beta"),
            ],
        );

        assert_eq!(summaries.len(), 1);

        assert_eq!(summaries[0].lowest_success_rate_host.as_deref(), Some("alpha"));
        assert_close(summaries[0].lowest_success_rate_percent, 0.0);
    }

    #[test]
    fn test_all_hosts_healthy_reports_first_host() {
        let mut aggregator = MetricsAggregator::new(1, 1);
        let summaries = feed(
            &mut aggregator,
            &[
                LogEvent::new(1, "GET /a HTTP/1.0", 200, "b"),
                LogEvent::new(1, "GET /a HTTP/1.0", 200, "a"),
                LogEvent::new(2, "GET /a HTTP/1.0", 500, "c"),
            ],
        );

        assert_eq!(summaries[0].lowest_success_rate_host.as_deref(), Some("a"));
        assert_close(summaries[0].lowest_success_rate_percent, 100.0);
    }

    #[test]
    fn test_late_arrival_included_until_window_settles() {
        let mut aggregator = MetricsAggregator::new(5, 4);
        assert!(aggregator.ingest(&LogEvent::new(10, "GET /a HTTP/1.0", 200, "h")).is_empty());
        assert!(aggregator.ingest(&LogEvent::new(14, "GET /a HTTP/1.0", 200, "h")).is_empty());
        // Late, but [10, 14] has not settled yet.
        assert!(aggregator.ingest(&LogEvent::new(12, "GET /a HTTP/1.0", 200, "h")).is_empty());

        let summaries = aggregator.ingest(&LogEvent::new(18, "GET /b HTTP/1.0", 200, "h"));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].hit_count, 3);

        // Too late: [10, 14] was emitted and pruned.
        assert!(aggregator.ingest(&LogEvent::new(11, "GET /a HTTP/1.0", 200, "h")).is_empty());
        assert_eq!(aggregator.window_start(), Some(15));
        assert_eq!(aggregator.buffered_timestamps(), 1);

        let summaries = aggregator.ingest(&LogEvent::new(23, "GET /b HTTP/1.0", 200, "h"));
        assert_eq!(summaries[0].start_time, 15);
        assert_eq!(summaries[0].hit_count, 1);
    }

    #[test]
    fn test_first_window_starts_at_earliest_settled_timestamp() {
        let mut aggregator = MetricsAggregator::new(10, 4);
        aggregator.ingest(&LogEvent::at(100));
        aggregator.ingest(&LogEvent::at(102));
        assert_eq!(aggregator.window_start(), None);

        // An earlier timestamp arriving before the start is fixed wins.
        aggregator.ingest(&LogEvent::at(98));
        assert_eq!(aggregator.window_start(), Some(98));
    }

    proptest! {
        #[test]
        fn prop_tumbling_windows_cover_settled_stream(
            timestamps in proptest::collection::vec(1u64..80, 1..200),
            size in 1u64..8,
            delay in 0u64..5,
        ) {
            let mut aggregator = MetricsAggregator::new(size, delay);
            let mut seen: Vec<u64> = Vec::new();
            let mut summaries: Vec<MetricsSummary> = Vec::new();

            for ts in timestamps {
                seen.push(ts);
                for summary in aggregator.ingest(&LogEvent::new(ts, "GET /p HTTP/1.0", 200, "h")) {
                    let expected = seen
                        .iter()
                        .filter(|t| (summary.start_time..=summary.end_time).contains(*t))
                        .count() as u64;
                    prop_assert_eq!(summary.hit_count, expected);
                    prop_assert_eq!(summary.window_size(), size);
                    summaries.push(summary);
                }
            }

            for pair in summaries.windows(2) {
                prop_assert_eq!(pair[1].start_time, pair[0].end_time + 1);
            }
        }
    }
}
