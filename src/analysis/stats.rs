use crate::probes::ProbeResult;
use serde::Serialize;

/// Ranking value of a sequence with no successful samples. Never shown as a latency.
pub const SENTINEL: u64 = u64::MAX;

/// Running statistics over a sequence's results. Only successes feed
/// `average`, `min` and `max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SequenceStats {
    pub average: Option<u64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub success_count: usize,
    pub total_count: usize,
}

impl SequenceStats {
    pub fn from_results(results: &[ProbeResult]) -> Self {
        let mut stats = Self {
            total_count: results.len(),
            ..Self::default()
        };

        let mut sum: u64 = 0;
        for latency in results.iter().filter_map(|r| r.outcome.latency_ms()) {
            stats.success_count += 1;
            sum = sum.saturating_add(latency);
            stats.min = Some(stats.min.map_or(latency, |m| m.min(latency)));
            stats.max = Some(stats.max.map_or(latency, |m| m.max(latency)));
        }

        if stats.success_count > 0 {
            stats.average = Some(rounded_mean(sum, stats.success_count as u64));
        }
        stats
    }

    /// Sort key: the average, or [`SENTINEL`] when nothing has succeeded yet.
    pub fn rank_key(&self) -> u64 {
        self.average.unwrap_or(SENTINEL)
    }

    pub fn has_samples(&self) -> bool {
        self.success_count > 0
    }
}

/// Mean rounded half-up to the nearest integer. `count` must be non-zero.
pub fn rounded_mean(sum: u64, count: u64) -> u64 {
    debug_assert!(count > 0);
    let sum = sum as u128;
    let count = count as u128;
    ((2 * sum + count) / (2 * count)) as u64
}
