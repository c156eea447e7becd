//! r2ping -- round-trip latency benchmark for regional object-storage endpoints.
//!
//! This crate provides the probe scheduling, streaming statistics,
//! classification and ranking engine, plus console and JSON result sinks.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod probes;
pub mod report;
pub mod scheduler;

use std::sync::Arc;

use anyhow::Result;

use crate::config::AppConfig;
use crate::probes::HttpProber;
use crate::scheduler::RunScheduler;

/// Build a scheduler that probes over real HTTP, as described by `config`.
pub fn http_scheduler(config: &AppConfig) -> Result<RunScheduler> {
    let catalog = config.catalog()?;
    tracing::debug!(regions = catalog.len(), "catalog ready");
    let prober = HttpProber::new(&config.probe)?;
    Ok(RunScheduler::new(
        catalog,
        Arc::new(prober),
        config.probe.clone(),
    ))
}
