//! Run scheduling: turns a run request into concurrently running probe
//! sequences and funnels their results through a single run session.

pub mod sequence;
pub mod session;

pub use self::sequence::{ProbeSequence, SequenceMessage};
pub use self::session::{RunSession, SequenceState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::config::{ConfigError, ProbeSettings, RegionScope, RunConfig, RunRequest};
use crate::probes::Prober;
use crate::report::{ResultSink, RunEvent, RunReport};

/// What became of a start request.
#[derive(Debug)]
pub enum RunStatus {
    Completed(RunReport),
    /// Another run was active; nothing was started.
    Busy,
}

/// Launches runs and refuses to overlap them.
pub struct RunScheduler {
    catalog: Arc<Catalog>,
    prober: Arc<dyn Prober>,
    settings: ProbeSettings,
    active: AtomicBool,
}

/// Holds the active flag for the lifetime of a run.
struct ActiveRun<'a>(&'a AtomicBool);

impl<'a> ActiveRun<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RunScheduler {
    pub fn new(catalog: Catalog, prober: Arc<dyn Prober>, settings: ProbeSettings) -> Self {
        Self {
            catalog: Arc::new(catalog),
            prober,
            settings,
            active: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run a benchmark to completion, streaming events into `sink`.
    ///
    /// While another run is active this is a silent no-op returning
    /// [`RunStatus::Busy`]. A setup error is reported once as `RunFailed`
    /// and returned before any probe is sent.
    pub async fn start(
        &self,
        request: &RunRequest,
        sink: &mut dyn ResultSink,
    ) -> Result<RunStatus, ConfigError> {
        let Some(_active) = ActiveRun::acquire(&self.active) else {
            debug!(region = %request.region, "run already in progress, ignoring start request");
            return Ok(RunStatus::Busy);
        };

        let (config, sequences) = match self.plan(request) {
            Ok(planned) => planned,
            Err(e) => {
                warn!(error = %e, "run setup failed");
                sink.emit(&RunEvent::RunFailed {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let selection = sequences
            .iter()
            .map(|(_, sequence)| sequence.region.clone())
            .collect();
        let mut session = RunSession::new(config, selection, sink);
        info!(
            run_id = %session.id(),
            sequences = sequences.len(),
            "run started"
        );

        let (tx, mut rx) = mpsc::channel(sequences.len().max(1) * 2);
        let handles: Vec<_> = sequences
            .into_iter()
            .map(|(start_delay, sequence)| {
                let prober = Arc::clone(&self.prober);
                let tx = tx.clone();
                tokio::spawn(async move {
                    if !start_delay.is_zero() {
                        tokio::time::sleep(start_delay).await;
                    }
                    sequence.run(prober, tx).await;
                })
            })
            .collect();
        drop(tx);

        while let Some(message) = rx.recv().await {
            session.handle(message);
        }

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                error!(run_id = %session.id(), error = %e, "probe sequence task failed");
            }
        }

        let report = session.finish(&self.catalog);
        info!(
            run_id = %report.run_id,
            ranking = ?report.ranking,
            "run finished"
        );
        Ok(RunStatus::Completed(report))
    }

    /// Resolve a request into sequences and their start offsets.
    ///
    /// Sequences come back in catalog order. With every region selected,
    /// region `i` starts `i × stagger` after the run, saturating for huge staggers.
    fn plan(&self, request: &RunRequest) -> Result<(RunConfig, Vec<(Duration, ProbeSequence)>), ConfigError> {
        let config = request.resolve(&self.catalog)?;

        let sequence = |region: &str| -> Result<ProbeSequence, ConfigError> {
            let endpoint = self.catalog.get(region)?;
            Ok(ProbeSequence {
                region: endpoint.id.clone(),
                scenario: config.scenario,
                target: endpoint.target(config.scenario),
                probe_count: config.probe_count,
                inter_probe_delay: self.settings.inter_probe_delay(),
            })
        };

        let sequences = match &config.scope {
            RegionScope::Single(region) => vec![(Duration::ZERO, sequence(region)?)],
            RegionScope::All => self
                .catalog
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    let offset = u32::try_from(i)
                        .map_or(Duration::MAX, |i| self.settings.stagger().saturating_mul(i));
                    Ok((offset, sequence(&e.id)?))
                })
                .collect::<Result<Vec<_>, ConfigError>>()?,
        };

        Ok((config, sequences))
    }
}
