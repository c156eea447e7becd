//! Per-run state. One session exists per run; it owns every sequence's
//! results and is the only writer of them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::sequence::SequenceMessage;
use crate::analysis::{grade_regions, grade_samples, RegionBucket, Ranker, SampleGrade, SequenceStats};
use crate::catalog::{Catalog, Scenario};
use crate::config::RunConfig;
use crate::probes::ProbeResult;
use crate::report::{RegionReport, ResultSink, RunEvent, RunReport};

/// Live state of one region's sequence.
#[derive(Debug, Clone)]
pub struct SequenceState {
    pub region: String,
    pub scenario: Scenario,
    pub url: String,
    pub probe_count: u32,
    pub results: Vec<ProbeResult>,
    pub stats: SequenceStats,
    pub grades: Vec<SampleGrade>,
}

impl SequenceState {
    fn new(region: String, scenario: Scenario, url: String, probe_count: u32) -> Self {
        Self {
            region,
            scenario,
            url,
            probe_count,
            results: Vec::with_capacity(probe_count as usize),
            stats: SequenceStats::default(),
            grades: Vec::new(),
        }
    }

    fn record(&mut self, result: ProbeResult) {
        debug_assert_eq!(result.index as usize, self.results.len() + 1);
        let success = result.outcome.is_success();
        self.results.push(result);
        self.stats = SequenceStats::from_results(&self.results);
        if success {
            self.grades = grade_samples(&self.results);
        }
    }
}

/// State of a single run, fed one message at a time.
pub struct RunSession<'a> {
    id: Uuid,
    config: RunConfig,
    started_at: DateTime<Utc>,
    /// In start order. Ranking ties fall back to the planned selection order instead.
    sequences: Vec<SequenceState>,
    ranker: Ranker,
    region_buckets: HashMap<String, RegionBucket>,
    sink: &'a mut dyn ResultSink,
}

impl<'a> RunSession<'a> {
    /// `selection` is the planned region order; it breaks ranking ties however
    /// the sequences' start messages happen to arrive.
    pub fn new(config: RunConfig, selection: Vec<String>, sink: &'a mut dyn ResultSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            started_at: Utc::now(),
            sequences: Vec::new(),
            ranker: Ranker::with_selection(selection),
            region_buckets: HashMap::new(),
            sink,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sequences(&self) -> &[SequenceState] {
        &self.sequences
    }

    pub fn handle(&mut self, message: SequenceMessage) {
        match message {
            SequenceMessage::Started {
                region,
                scenario,
                url,
                probe_count,
            } => self.sequence_started(region, scenario, url, probe_count),
            SequenceMessage::Probe {
                region,
                result,
                recorded,
            } => {
                self.record(&region, result);
                // The sequence may only proceed once this result is in.
                let _ = recorded.send(());
            }
            SequenceMessage::Completed { region } => self.sequence_completed(&region),
        }
    }

    fn sequence_started(&mut self, region: String, scenario: Scenario, url: String, probe_count: u32) {
        info!(run_id = %self.id, %region, %scenario, %url, probe_count, "sequence started");
        self.sink.emit(&RunEvent::SequenceStarted {
            region: region.clone(),
            scenario,
            url: url.clone(),
            probe_count,
        });
        self.sequences
            .push(SequenceState::new(region, scenario, url, probe_count));
        self.rerank();
    }

    fn record(&mut self, region: &str, result: ProbeResult) {
        let Some(state) = self.sequences.iter_mut().find(|s| s.region == region) else {
            warn!(run_id = %self.id, %region, "result for unknown sequence dropped");
            return;
        };

        let probe_index = result.index;
        let outcome = result.outcome.clone();
        state.record(result);

        let event = RunEvent::ProbeCompleted {
            region: state.region.clone(),
            probe_index,
            probe_count: state.probe_count,
            outcome,
            running_average: state.stats.average,
            buckets: state.grades.clone(),
        };
        self.sink.emit(&event);

        self.rerank();
        if self.config.compares_regions() {
            self.regrade_regions();
        }
    }

    fn sequence_completed(&mut self, region: &str) {
        let Some(state) = self.sequences.iter().find(|s| s.region == region) else {
            warn!(run_id = %self.id, %region, "completion for unknown sequence dropped");
            return;
        };
        let stats = state.stats;

        info!(
            run_id = %self.id,
            %region,
            average = ?stats.average,
            success = stats.success_count,
            total = stats.total_count,
            "sequence completed"
        );
        self.sink.emit(&RunEvent::SequenceCompleted {
            region: region.to_string(),
            stats,
        });
        self.rerank();
    }

    fn rerank(&mut self) {
        let entries = self
            .sequences
            .iter()
            .map(|s| (s.region.as_str(), s.stats.rank_key()));
        if let Some(order) = self.ranker.recompute(entries) {
            debug!(run_id = %self.id, ?order, "ranking changed");
            self.sink.emit(&RunEvent::RankChanged { order });
        }
    }

    fn regrade_regions(&mut self) {
        let averages: Vec<(&str, u64)> = self
            .sequences
            .iter()
            .filter_map(|s| s.stats.average.map(|a| (s.region.as_str(), a)))
            .collect();

        for (region, bucket) in grade_regions(&averages) {
            if self.region_buckets.get(region) == Some(&bucket) {
                continue;
            }
            self.region_buckets.insert(region.to_string(), bucket);
            self.sink.emit(&RunEvent::CrossRegionBucketUpdated {
                region: region.to_string(),
                bucket,
            });
        }
    }

    /// Close the session and build the report.
    pub fn finish(self, catalog: &Catalog) -> RunReport {
        let ranking: Vec<String> = self
            .ranker
            .current()
            .map(<[String]>::to_vec)
            .unwrap_or_default();

        let regions = ranking
            .iter()
            .filter_map(|id| self.sequences.iter().find(|s| &s.region == id))
            .map(|s| RegionReport {
                region: s.region.clone(),
                name: catalog
                    .get(&s.region)
                    .map_or_else(|_| s.region.clone(), |e| e.name.clone()),
                url: s.url.clone(),
                stats: s.stats,
                bucket: self.region_buckets.get(&s.region).copied(),
            })
            .collect();

        RunReport {
            run_id: self.id,
            config: self.config,
            started_at: self.started_at,
            finished_at: Utc::now(),
            ranking,
            regions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionScope;
    use crate::probes::{ProbeError, ProbeOutcome};
    use tokio::sync::oneshot;

    fn config(scope: RegionScope, scenario: Scenario) -> RunConfig {
        RunConfig {
            scope,
            scenario,
            probe_count: 3,
        }
    }

    fn selection() -> Vec<String> {
        Catalog::builtin().iter().map(|e| e.id.clone()).collect()
    }

    fn start(session: &mut RunSession<'_>, region: &str) {
        session.handle(SequenceMessage::Started {
            region: region.to_string(),
            scenario: Scenario::CustomNoCache,
            url: format!("https://{}.test/test-without-cache.json", region),
            probe_count: 3,
        });
    }

    fn probe(session: &mut RunSession<'_>, region: &str, index: u32, latency: Option<u64>) {
        let outcome = match latency {
            Some(latency_ms) => ProbeOutcome::Success { latency_ms },
            None => ProbeOutcome::Failure {
                error: ProbeError::Http { status: 500 },
            },
        };
        let (recorded, mut ack) = oneshot::channel();
        session.handle(SequenceMessage::Probe {
            region: region.to_string(),
            result: ProbeResult::new(index, outcome),
            recorded,
        });
        assert!(ack.try_recv().is_ok(), "probe must be acknowledged");
    }

    fn cross_updates(events: &[RunEvent]) -> Vec<(String, RegionBucket)> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::CrossRegionBucketUpdated { region, bucket } => {
                    Some((region.clone(), *bucket))
                }
                _ => None,
            })
            .collect()
    }

    fn rank_changes(events: &[RunEvent]) -> Vec<Vec<String>> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::RankChanged { order } => Some(order.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_probe_event_carries_regraded_history() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::Single("eeur".into()), Scenario::CustomNoCache),
            selection(),
            &mut events,
        );
        start(&mut session, "eeur");
        probe(&mut session, "eeur", 1, Some(100));
        probe(&mut session, "eeur", 2, Some(200));
        probe(&mut session, "eeur", 3, Some(500));
        drop(session);

        let Some(RunEvent::ProbeCompleted {
            probe_index,
            running_average,
            buckets,
            ..
        }) = events
            .iter()
            .rev()
            .find(|e| matches!(e, RunEvent::ProbeCompleted { .. }))
        else {
            panic!("no probe event");
        };
        assert_eq!(*probe_index, 3);
        assert_eq!(*running_average, Some(267));
        let tiers: Vec<&str> = buckets.iter().map(|g| g.bucket.as_str()).collect();
        assert_eq!(tiers, ["excellent", "good", "slow"]);
    }

    #[test]
    fn test_failure_keeps_previous_grades() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::Single("oc".into()), Scenario::Dev),
            selection(),
            &mut events,
        );
        start(&mut session, "oc");
        probe(&mut session, "oc", 1, Some(80));
        probe(&mut session, "oc", 2, None);
        probe(&mut session, "oc", 3, Some(120));

        let state = &session.sequences()[0];
        assert_eq!(state.stats.average, Some(100));
        assert_eq!(state.stats.success_count, 2);
        assert_eq!(state.stats.total_count, 3);
        assert_eq!(state.grades.len(), 2);
    }

    #[test]
    fn test_rank_changes_only_when_order_moves() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::All, Scenario::CustomCache),
            selection(),
            &mut events,
        );
        start(&mut session, "eeur");
        start(&mut session, "wnam");
        probe(&mut session, "eeur", 1, Some(90));
        probe(&mut session, "wnam", 1, Some(50));
        probe(&mut session, "eeur", 2, Some(95));
        probe(&mut session, "wnam", 2, Some(55));
        drop(session);

        assert_eq!(
            rank_changes(&events),
            vec![
                vec!["eeur".to_string()],
                vec!["eeur".to_string(), "wnam".to_string()],
                vec!["wnam".to_string(), "eeur".to_string()],
            ]
        );
        // custom-cache never compares regions.
        assert!(cross_updates(&events).is_empty());
    }

    #[test]
    fn test_cross_region_needs_two_measured_regions() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::All, Scenario::CustomNoCache),
            selection(),
            &mut events,
        );
        start(&mut session, "eeur");
        start(&mut session, "wnam");
        probe(&mut session, "eeur", 1, Some(40));
        probe(&mut session, "wnam", 1, None);
        let len_before = session.sequences().len();
        assert_eq!(len_before, 2);
        drop(session);
        assert!(cross_updates(&events).is_empty());
    }

    #[test]
    fn test_cross_region_updates_on_change_only() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::All, Scenario::CustomNoCache),
            selection(),
            &mut events,
        );
        start(&mut session, "eeur");
        start(&mut session, "wnam");
        probe(&mut session, "eeur", 1, Some(40));
        probe(&mut session, "wnam", 1, Some(300));
        probe(&mut session, "eeur", 2, Some(42));
        drop(session);

        assert_eq!(
            cross_updates(&events),
            vec![
                ("eeur".to_string(), RegionBucket::Fastest),
                ("wnam".to_string(), RegionBucket::Slowest),
            ]
        );
    }

    #[test]
    fn test_single_region_scope_has_no_cross_region_tiers() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::Single("eeur".into()), Scenario::CustomNoCache),
            selection(),
            &mut events,
        );
        start(&mut session, "eeur");
        start(&mut session, "wnam");
        probe(&mut session, "eeur", 1, Some(40));
        probe(&mut session, "wnam", 1, Some(300));
        drop(session);
        assert!(cross_updates(&events).is_empty());
    }

    #[test]
    fn test_finish_reports_in_rank_order() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::All, Scenario::CustomNoCache),
            selection(),
            &mut events,
        );
        start(&mut session, "oc");
        start(&mut session, "eeur");
        probe(&mut session, "oc", 1, None);
        probe(&mut session, "eeur", 1, Some(41));
        session.handle(SequenceMessage::Completed {
            region: "oc".to_string(),
        });
        session.handle(SequenceMessage::Completed {
            region: "eeur".to_string(),
        });

        let report = session.finish(&Catalog::builtin());
        assert_eq!(report.ranking, ["eeur", "oc"]);
        assert_eq!(report.regions[0].name, "Eastern Europe (EEUR)");
        assert_eq!(report.regions[1].stats.success_count, 0);
        assert!(report.regions[1].bucket.is_none());

        let completions = events
            .iter()
            .filter(|e| matches!(e, RunEvent::SequenceCompleted { .. }))
            .count();
        assert_eq!(completions, 2);
    }

    #[test]
    fn test_ties_follow_selection_not_arrival() {
        let mut events: Vec<RunEvent> = Vec::new();
        let mut session = RunSession::new(
            config(RegionScope::All, Scenario::CustomNoCache),
            selection(),
            &mut events,
        );
        for region in ["apac", "weur", "oc", "enam", "wnam", "eeur"] {
            start(&mut session, region);
            probe(&mut session, region, 1, None);
        }
        let report = session.finish(&Catalog::builtin());
        assert_eq!(
            report.ranking,
            ["eeur", "wnam", "enam", "oc", "weur", "apac"]
        );
    }
}
