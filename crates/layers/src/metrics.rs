use std::collections::BTreeMap;

use serde::Serialize;

use crate::feed::RecomputeStats;

pub const RECOMPUTES: &str = "recomputes";
pub const VIEWPORT_CHANGES: &str = "viewport_changes";
pub const POST_SNAPSHOTS: &str = "post_snapshots";
pub const PLACEMENT_FALLBACKS: &str = "placement_fallbacks";
pub const POSTS_PER_RECOMPUTE: &str = "posts_per_recompute";
pub const VISIBLE_PER_RECOMPUTE: &str = "visible_per_recompute";

/// Feed counters and histograms.
///
/// Keys are kept in sorted maps so snapshots are stable; nothing here reads
/// the wall clock.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedMetrics {
    counters: BTreeMap<&'static str, u64>,
    histograms: BTreeMap<&'static str, Histogram>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Histogram {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
}

impl Histogram {
    pub fn record(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum as f64 / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    pub histograms: Vec<(String, Histogram)>,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }

    pub fn inc(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn record_recompute(&mut self, stats: &RecomputeStats) {
        self.inc(RECOMPUTES, 1);
        self.inc(PLACEMENT_FALLBACKS, stats.fallbacks as u64);
        self.observe(POSTS_PER_RECOMPUTE, stats.posts as u64);
        self.observe(VISIBLE_PER_RECOMPUTE, stats.visible as u64);
    }

    fn observe(&mut self, name: &'static str, value: u64) {
        self.histograms.entry(name).or_default().record(value);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            histograms: self
                .histograms
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}
