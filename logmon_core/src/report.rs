use crate::event::HttpVerb;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbCounts {
    pub post: u64,
    pub get: u64,
    pub put: u64,
    pub patch: u64,
    pub delete: u64,
}

impl VerbCounts {
    pub fn increment(&mut self, verb: HttpVerb) {
        *self.slot_mut(verb) += 1;
    }

    pub fn get(&self, verb: HttpVerb) -> u64 {
        match verb {
            HttpVerb::Post => self.post,
            HttpVerb::Get => self.get,
            HttpVerb::Put => self.put,
            HttpVerb::Patch => self.patch,
            HttpVerb::Delete => self.delete,
        }
    }

    /// Non-zero counts in declaration order of [`HttpVerb::ALL`].
    pub fn non_zero(&self) -> impl Iterator<Item = (HttpVerb, u64)> + '_ {
        HttpVerb::ALL
            .into_iter()
            .map(|verb| (verb, self.get(verb)))
            .filter(|(_, count)| *count > 0)
    }

    pub fn total(&self) -> u64 {
        self.post + self.get + self.put + self.patch + self.delete
    }

    fn slot_mut(&mut self, verb: HttpVerb) -> &mut u64 {
        match verb {
            HttpVerb::Post => &mut self.post,
            HttpVerb::Get => &mut self.get,
            HttpVerb::Put => &mut self.put,
            HttpVerb::Patch => &mut self.patch,
            HttpVerb::Delete => &mut self.delete,
        }
    }
}

/// Traffic summary of one tumbling window `[start_time, end_time]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub start_time: u64,
    pub end_time: u64,
    pub hit_count: u64,
    /// Sections tied for the highest hit count, in lexicographic order.
    pub top_sections: Vec<String>,
    pub top_section_hit_count: u64,
    pub verb_counts: VerbCounts,
    pub success_rate_percent: f64,
    pub lowest_success_rate_host: Option<String>,
    pub lowest_success_rate_percent: f64,
}

impl MetricsSummary {
    pub fn empty(start_time: u64, end_time: u64) -> Self {
        Self {
            start_time,
            end_time,
            hit_count: 0,
            top_sections: Vec::new(),
            top_section_hit_count: 0,
            verb_counts: VerbCounts::default(),
            success_rate_percent: 0.0,
            lowest_success_rate_host: None,
            lowest_success_rate_percent: 0.0,
        }
    }

    pub fn window_size(&self) -> u64 {
        self.end_time - self.start_time + 1
    }
}

/// Raised or cleared traffic alert for the sliding window ending at `window_end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub window_end_time: u64,
    pub is_active: bool,
    pub average_hits_per_second: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_counts() {
        let mut counts = VerbCounts::default();
        counts.increment(HttpVerb::Get);
        counts.increment(HttpVerb::Get);
        counts.increment(HttpVerb::Delete);

        assert_eq!(counts.get(HttpVerb::Get), 2);
        assert_eq!(counts.total(), 3);

        let listed: Vec<_> = counts.non_zero().collect();
        assert_eq!(listed, vec![(HttpVerb::Get, 2), (HttpVerb::Delete, 1)]);
    }

    #[test]
    fn test_empty_summary() {
        let summary = MetricsSummary::empty(10, 19);
        assert_eq!(summary.window_size(), 10);
        assert_eq!(summary.hit_count, 0);
        assert!(summary.top_sections.is_empty());
        assert!(summary.lowest_success_rate_host.is_none());
    }
}
