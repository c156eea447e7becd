use std::collections::HashMap;
use std::io::Write;

use tracing::warn;

use super::{ResultSink, RunEvent};
use crate::catalog::Catalog;
use crate::probes::ProbeOutcome;

/// Human-readable, line-oriented progress output.
pub struct ConsoleSink<W> {
    out: W,
    labels: HashMap<String, String>,
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(catalog: &Catalog, out: W) -> Self {
        let labels = catalog
            .iter()
            .map(|e| (e.id.clone(), e.abbreviation()))
            .collect();
        Self { out, labels }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn label<'a>(&'a self, region: &'a str) -> &'a str {
        self.labels.get(region).map_or(region, String::as_str)
    }

    fn render(&self, event: &RunEvent) -> String {
        match event {
            RunEvent::SequenceStarted {
                region,
                scenario,
                url,
                probe_count,
            } => format!(
                "[{}] {} - {} pings against {}",
                self.label(region),
                scenario.display_name(),
                probe_count,
                url
            ),
            RunEvent::ProbeCompleted {
                region,
                probe_index,
                probe_count,
                outcome,
                running_average,
                ..
            } => {
                let pct = (*probe_index as f64 / (*probe_count).max(1) as f64 * 100.0).round();
                let result = match outcome {
                    ProbeOutcome::Success { latency_ms } => format!(
                        "{}ms (avg {})",
                        latency_ms,
                        running_average.map_or_else(|| "-".to_string(), |a| format!("{}ms", a))
                    ),
                    ProbeOutcome::Failure { error } => format!("failed ({})", error),
                };
                format!(
                    "[{}] ping {}: {} | {} / {} pings ({}%)",
                    self.label(region),
                    probe_index,
                    result,
                    probe_index,
                    probe_count,
                    pct
                )
            }
            RunEvent::RankChanged { order } => {
                let labels: Vec<&str> = order.iter().map(|r| self.label(r)).collect();
                format!("ranking: {}", labels.join(" < "))
            }
            RunEvent::CrossRegionBucketUpdated { region, bucket } => {
                format!("[{}] region tier: {}", self.label(region), bucket.as_str())
            }
            RunEvent::SequenceCompleted { region, stats } => match (stats.average, stats.min, stats.max) {
                (Some(avg), Some(min), Some(max)) => format!(
                    "[{}] done: avg {}ms | min {}ms | max {}ms | success {}/{}",
                    self.label(region),
                    avg,
                    min,
                    max,
                    stats.success_count,
                    stats.total_count
                ),
                _ => format!(
                    "[{}] done: no successful pings ({}/{})",
                    self.label(region),
                    stats.success_count,
                    stats.total_count
                ),
            },
            RunEvent::RunFailed { reason } => format!("run failed: {}", reason),
        }
    }
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(catalog: &Catalog) -> Self {
        Self::new(catalog, std::io::stdout())
    }
}

impl<W: Write + Send> ResultSink for ConsoleSink<W> {
    fn emit(&mut self, event: &RunEvent) {
        let line = self.render(event);
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!(error = %e, "failed to write console output");
        }
    }
}
