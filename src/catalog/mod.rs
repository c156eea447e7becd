//! Endpoint catalog: the fixed set of regional storage endpoints and the
//! scenario URLs they resolve to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Resource fetched when the delivery path must bypass the cache.
pub const NO_CACHE_RESOURCE: &str = "test-without-cache.json";
/// Resource served with cache-friendly headers.
pub const CACHE_RESOURCE: &str = "test-with-cache.json";
/// Region scope keyword selecting every catalog entry; never a region id.
pub const ALL_REGIONS: &str = "all";

/// Delivery-path variant being benchmarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Dev,
    CustomNoCache,
    CustomCache,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Dev, Scenario::CustomNoCache, Scenario::CustomCache];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Dev => "dev",
            Scenario::CustomNoCache => "custom-no-cache",
            Scenario::CustomCache => "custom-cache",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Scenario::Dev => "Public Development (r2.dev)",
            Scenario::CustomNoCache => "Custom Domain - No Cache",
            Scenario::CustomCache => "Custom Domain - With Cache",
        }
    }

    /// Resource name requested under this scenario. Dev links are never cached.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Scenario::Dev | Scenario::CustomNoCache => NO_CACHE_RESOURCE,
            Scenario::CustomCache => CACHE_RESOURCE,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dev" => Ok(Scenario::Dev),
            "custom-no-cache" => Ok(Scenario::CustomNoCache),
            "custom-cache" => Ok(Scenario::CustomCache),
            other => Err(ConfigError::InvalidScenario(other.to_string())),
        }
    }
}

/// One regional deployment point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    /// Public development bucket URL.
    pub dev_url: String,
    /// Custom-domain URL (fronted by the CDN).
    pub custom_url: String,
}

impl Endpoint {
    fn new(id: &str, name: &str, location: &str, dev_url: &str, custom_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            dev_url: dev_url.to_string(),
            custom_url: custom_url.to_string(),
        }
    }

    /// Short label used in summaries, e.g. `EEUR`.
    pub fn abbreviation(&self) -> String {
        self.id.to_uppercase()
    }

    pub fn target(&self, scenario: Scenario) -> ScenarioTarget {
        let base_url = match scenario {
            Scenario::Dev => &self.dev_url,
            Scenario::CustomNoCache | Scenario::CustomCache => &self.custom_url,
        };
        ScenarioTarget {
            base_url: base_url.clone(),
            resource_name: scenario.resource_name(),
        }
    }
}

/// A resolved (region, scenario) target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioTarget {
    pub base_url: String,
    pub resource_name: &'static str,
}

impl ScenarioTarget {
    pub fn url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.resource_name)
    }
}

/// Immutable, ordered region table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    endpoints: Vec<Endpoint>,
}

impl Catalog {
    /// Build a catalog from an explicit endpoint list, preserving its order.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        for (i, endpoint) in endpoints.iter().enumerate() {
            if endpoint.id == ALL_REGIONS {
                return Err(ConfigError::ReservedRegionId(endpoint.id.clone()));
            }
            if endpoints[..i].iter().any(|e| e.id == endpoint.id) {
                return Err(ConfigError::DuplicateRegion(endpoint.id.clone()));
            }
        }
        Ok(Self { endpoints })
    }

    /// The six R2 location hints, in their canonical iteration order.
    pub fn builtin() -> Self {
        Self {
            endpoints: vec![
                Endpoint::new(
                    "eeur",
                    "Eastern Europe (EEUR)",
                    "Central/Eastern Europe",
                    "https://pub-d05abc361f464702803902df56b2d0a6.r2.dev",
                    "https://eeur.fernandodilland.com",
                ),
                Endpoint::new(
                    "wnam",
                    "Western North America (WNAM)",
                    "Western United States & Canada",
                    "https://pub-cee8fd8985024ceb9d4f09a07cde21a8.r2.dev",
                    "https://wnam.fernandodilland.com",
                ),
                Endpoint::new(
                    "enam",
                    "Eastern North America (ENAM)",
                    "Eastern United States & Canada",
                    "https://pub-c38737ea6ca1461ea21edb6f5265492b.r2.dev",
                    "https://enam.fernandodilland.com",
                ),
                Endpoint::new(
                    "oc",
                    "Oceania (OC)",
                    "Australia & New Zealand",
                    "https://pub-01d9a0eba8d94cf8aa0400d1f14d675a.r2.dev",
                    "https://oc.fernandodilland.com",
                ),
                Endpoint::new(
                    "weur",
                    "Western Europe (WEUR)",
                    "Western Europe",
                    "https://pub-a6d5fe4addee4b6f8b599cfff80a3746.r2.dev",
                    "https://weur.fernandodilland.com",
                ),
                Endpoint::new(
                    "apac",
                    "Asia Pacific (APAC)",
                    "Asia Pacific Region",
                    "https://pub-4fa2598846c045b894b81acc3223f302.r2.dev",
                    "https://apac.fernandodilland.com",
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    pub fn get(&self, id: &str) -> Result<&Endpoint, ConfigError> {
        self.endpoints
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ConfigError::RegionNotFound(id.to_string()))
    }

    pub fn resolve(&self, id: &str, scenario: &str) -> Result<ScenarioTarget, ConfigError> {
        let scenario: Scenario = scenario.parse()?;
        Ok(self.get(id)?.target(scenario))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
