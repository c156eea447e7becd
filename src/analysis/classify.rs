//! Relative performance tiers.
//!
//! Both classifiers place a value on `[0, 1]` between the current minimum and
//! maximum and cut that range into five tiers. A zero-width range puts every
//! value at position 0.

use crate::probes::ProbeResult;
use serde::Serialize;

/// Tier of one sample relative to the other samples of its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleBucket {
    Excellent,
    Good,
    Fair,
    Poor,
    Slow,
}

impl SampleBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleBucket::Excellent => "excellent",
            SampleBucket::Good => "good",
            SampleBucket::Fair => "fair",
            SampleBucket::Poor => "poor",
            SampleBucket::Slow => "slow",
        }
    }
}

/// Tier of a region's average relative to the other regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionBucket {
    Fastest,
    Fast,
    Medium,
    Slow,
    Slowest,
}

impl RegionBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionBucket::Fastest => "fastest",
            RegionBucket::Fast => "fast",
            RegionBucket::Medium => "medium",
            RegionBucket::Slow => "slow",
            RegionBucket::Slowest => "slowest",
        }
    }
}

/// A successful sample together with its current tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleGrade {
    pub probe_index: u32,
    pub latency_ms: u64,
    pub bucket: SampleBucket,
}

fn position(value: u64, low: u64, high: u64) -> f64 {
    let range = high.saturating_sub(low);
    if range == 0 {
        return 0.0;
    }
    value.saturating_sub(low) as f64 / range as f64
}

pub fn classify_sample(latency_ms: u64, min: u64, max: u64) -> SampleBucket {
    let p = position(latency_ms, min, max);
    if p == 0.0 {
        SampleBucket::Excellent
    } else if p <= 0.25 {
        SampleBucket::Good
    } else if p <= 0.5 {
        SampleBucket::Fair
    } else if p <= 0.75 {
        SampleBucket::Poor
    } else {
        SampleBucket::Slow
    }
}

pub fn classify_region(average: u64, fastest: u64, slowest: u64) -> RegionBucket {
    let p = position(average, fastest, slowest);
    if p == 0.0 {
        RegionBucket::Fastest
    } else if p <= 0.25 {
        RegionBucket::Fast
    } else if p <= 0.75 {
        RegionBucket::Medium
    } else if p < 1.0 {
        RegionBucket::Slow
    } else {
        RegionBucket::Slowest
    }
}

/// Grade every success of a sequence against the sequence's current min/max.
///
/// Always regrades from scratch, so earlier samples move tiers when a new
/// extreme arrives.
pub fn grade_samples(results: &[ProbeResult]) -> Vec<SampleGrade> {
    let samples: Vec<(u32, u64)> = results
        .iter()
        .filter_map(|r| r.outcome.latency_ms().map(|l| (r.index, l)))
        .collect();

    let (Some(min), Some(max)) = (
        samples.iter().map(|&(_, l)| l).min(),
        samples.iter().map(|&(_, l)| l).max(),
    ) else {
        return Vec::new();
    };

    samples
        .into_iter()
        .map(|(probe_index, latency_ms)| SampleGrade {
            probe_index,
            latency_ms,
            bucket: classify_sample(latency_ms, min, max),
        })
        .collect()
}

/// Grade each region average against the fastest and slowest averages.
///
/// Returns nothing unless at least two regions have an average.
pub fn grade_regions<'a>(averages: &[(&'a str, u64)]) -> Vec<(&'a str, RegionBucket)> {
    if averages.len() < 2 {
        return Vec::new();
    }
    let fastest = averages.iter().map(|&(_, a)| a).min().unwrap_or_default();
    let slowest = averages.iter().map(|&(_, a)| a).max().unwrap_or_default();

    averages
        .iter()
        .map(|&(region, average)| (region, classify_region(average, fastest, slowest)))
        .collect()
}
