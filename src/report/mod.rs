//! Run events and the sinks that consume them.

pub mod console;
pub mod jsonl;
pub mod summary;

pub use self::console::ConsoleSink;
pub use self::jsonl::JsonLinesSink;
pub use self::summary::{RegionReport, RunReport};

use serde::Serialize;

use crate::analysis::{RegionBucket, SampleGrade, SequenceStats};
use crate::catalog::Scenario;
use crate::probes::ProbeOutcome;

/// Structured event stream of a run, in the order things happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    SequenceStarted {
        region: String,
        scenario: Scenario,
        url: String,
        probe_count: u32,
    },
    ProbeCompleted {
        region: String,
        probe_index: u32,
        probe_count: u32,
        outcome: ProbeOutcome,
        running_average: Option<u64>,
        /// Every success so far, regraded against the current min/max.
        buckets: Vec<SampleGrade>,
    },
    RankChanged {
        order: Vec<String>,
    },
    CrossRegionBucketUpdated {
        region: String,
        bucket: RegionBucket,
    },
    SequenceCompleted {
        region: String,
        stats: SequenceStats,
    },
    RunFailed {
        reason: String,
    },
}

/// Consumer of run events (terminal, file, UI layer...).
pub trait ResultSink: Send {
    fn emit(&mut self, event: &RunEvent);
}

impl ResultSink for Vec<RunEvent> {
    fn emit(&mut self, event: &RunEvent) {
        self.push(event.clone());
    }
}
