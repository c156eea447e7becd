//! Run requests: raw user input and its validated form.

use std::num::IntErrorKind;

use serde::Serialize;

use super::ConfigError;
use crate::catalog::{Catalog, Scenario, ALL_REGIONS};

pub const MIN_PROBE_COUNT: u32 = 1;
pub const MAX_PROBE_COUNT: u32 = 1000;
pub const DEFAULT_PROBE_COUNT: u32 = 10;

/// Clamp a requested probe count into `[1, 1000]`.
pub fn clamp_probe_count(requested: i64) -> u32 {
    requested.clamp(MIN_PROBE_COUNT as i64, MAX_PROBE_COUNT as i64) as u32
}

/// Parse a probe count from free-form input.
///
/// Reads the leading integer the way a form field is usually read: optional
/// sign, then digits, anything after them ignored (`"12.5"` and `"12abc"` are
/// both 12). The integer is clamped, saturating on overflow. Input with no
/// leading integer yields [`DEFAULT_PROBE_COUNT`].
pub fn parse_probe_count(input: Option<&str>) -> u32 {
    let Some(raw) = input.map(str::trim_start) else {
        return DEFAULT_PROBE_COUNT;
    };

    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits == 0 {
        return DEFAULT_PROBE_COUNT;
    }
    let sign_len = raw.len() - unsigned.len();

    match raw[..sign_len + digits].parse::<i64>() {
        Ok(n) => clamp_probe_count(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => MAX_PROBE_COUNT,
            IntErrorKind::NegOverflow => MIN_PROBE_COUNT,
            _ => DEFAULT_PROBE_COUNT,
        },
    }
}

/// Which regions a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionScope {
    All,
    Single(String),
}

impl RegionScope {
    pub fn is_all(&self) -> bool {
        matches!(self, RegionScope::All)
    }
}

/// Raw run request, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub region: String,
    pub scenario: String,
    pub count: Option<String>,
}

impl RunRequest {
    pub fn new(region: impl Into<String>, scenario: impl Into<String>, count: Option<&str>) -> Self {
        Self {
            region: region.into(),
            scenario: scenario.into(),
            count: count.map(str::to_string),
        }
    }

    /// Validate against a catalog.
    pub fn resolve(&self, catalog: &Catalog) -> Result<RunConfig, ConfigError> {
        let scenario: Scenario = self.scenario.parse()?;

        let region = self.region.trim();
        let scope = if region == ALL_REGIONS {
            RegionScope::All
        } else {
            catalog.get(region)?;
            RegionScope::Single(region.to_string())
        };

        Ok(RunConfig {
            scope,
            scenario,
            probe_count: parse_probe_count(self.count.as_deref()),
        })
    }
}

/// A validated run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub scope: RegionScope,
    pub scenario: Scenario,
    pub probe_count: u32,
}

impl RunConfig {
    /// Cross-region comparison is only wired to the uncached baseline across every region.
    pub fn compares_regions(&self) -> bool {
        self.scope.is_all() && self.scenario == Scenario::CustomNoCache
    }
}
