//! Final run report and its human-readable rendering.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::analysis::{RegionBucket, SequenceStats};
use crate::config::RunConfig;

/// Final state of one region's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionReport {
    pub region: String,
    pub name: String,
    pub url: String,
    pub stats: SequenceStats,
    pub bucket: Option<RegionBucket>,
}

impl RegionReport {
    pub fn abbreviation(&self) -> String {
        self.region.to_uppercase()
    }
}

/// Everything a finished run produced. `regions` follows the final ranking.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub config: RunConfig,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub ranking: Vec<String>,
    pub regions: Vec<RegionReport>,
}

/// A report written into a JSON-lines event stream.
#[derive(Serialize)]
struct ReportLine<'a> {
    event: &'static str,
    #[serde(flatten)]
    report: &'a RunReport,
}

impl RunReport {
    /// One JSON line tagged `"event": "run_report"`, to close an event stream.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&ReportLine {
            event: "run_report",
            report: self,
        })
    }

    pub fn region(&self, id: &str) -> Option<&RegionReport> {
        self.regions.iter().find(|r| r.region == id)
    }

    /// Fastest and slowest regions with at least one success.
    pub fn fastest_and_slowest(&self) -> Option<(&RegionReport, &RegionReport)> {
        let mut measured = self.regions.iter().filter(|r| r.stats.has_samples());
        let first = measured.next()?;
        let (mut fastest, mut slowest) = (first, first);
        for r in measured {
            if r.stats.rank_key() < fastest.stats.rank_key() {
                fastest = r;
            }
            if r.stats.rank_key() > slowest.stats.rank_key() {
                slowest = r;
            }
        }
        Some((fastest, slowest))
    }
}

fn fmt_ms(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{}ms", v))
}

/// One-line verdict, e.g. `Fastest region from your location: EEUR (41ms), slowest: WNAM (302ms)`.
pub fn format_summary(report: &RunReport) -> String {
    match report.fastest_and_slowest() {
        None => "No region answered successfully.".to_string(),
        Some((fastest, slowest)) if fastest.region == slowest.region => format!(
            "{} averaged {}",
            fastest.abbreviation(),
            fmt_ms(fastest.stats.average)
        ),
        Some((fastest, slowest)) => format!(
            "Fastest region from your location: {} ({}), slowest: {} ({})",
            fastest.abbreviation(),
            fmt_ms(fastest.stats.average),
            slowest.abbreviation(),
            fmt_ms(slowest.stats.average),
        ),
    }
}

/// Ranked results table.
pub fn format_table(report: &RunReport) -> String {
    let mut out = format!(
        "{:<32} | {:>8} | {:>8} | {:>8} | {:>9} | Tier\n",
        "Region", "Avg", "Min", "Max", "Success"
    );
    out.push_str(&format!(
        "{:-<32}-|-{:->8}-|-{:->8}-|-{:->8}-|-{:->9}-|-{:-<8}\n",
        "", "", "", "", "", ""
    ));
    for r in &report.regions {
        out.push_str(&format!(
            "{:<32} | {:>8} | {:>8} | {:>8} | {:>9} | {}\n",
            r.name,
            fmt_ms(r.stats.average),
            fmt_ms(r.stats.min),
            fmt_ms(r.stats.max),
            format!("{}/{}", r.stats.success_count, r.stats.total_count),
            r.bucket.map_or("-", |b| b.as_str()),
        ));
    }
    out
}
