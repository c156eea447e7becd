//! Streaming statistics, tier classification and ranking.
//!
//! Everything here is pure: the run session feeds it complete sample sets and
//! turns the answers into events.

pub mod classify;
pub mod rank;
pub mod stats;

pub use self::classify::{
    classify_region, classify_sample, grade_regions, grade_samples, RegionBucket, SampleBucket,
    SampleGrade,
};
pub use self::rank::Ranker;
pub use self::stats::{rounded_mean, SequenceStats, SENTINEL};
