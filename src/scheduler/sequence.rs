use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::catalog::{Scenario, ScenarioTarget};
use crate::probes::{ProbeResult, Prober};

/// What a running sequence reports to the run session.
#[derive(Debug)]
pub enum SequenceMessage {
    Started {
        region: String,
        scenario: Scenario,
        url: String,
        probe_count: u32,
    },
    /// The sequence waits on `recorded` before it moves on.
    Probe {
        region: String,
        result: ProbeResult,
        recorded: oneshot::Sender<()>,
    },
    Completed {
        region: String,
    },
}

/// Sequential probes against one (region, scenario) target.
#[derive(Debug, Clone)]
pub struct ProbeSequence {
    pub region: String,
    pub scenario: Scenario,
    pub target: ScenarioTarget,
    pub probe_count: u32,
    pub inter_probe_delay: Duration,
}

impl ProbeSequence {
    /// Run every probe, one at a time.
    ///
    /// Probe N+1 is not dispatched until the session has recorded probe N and
    /// the inter-probe delay has elapsed. Failures are recorded like any other
    /// result; the loop always runs to `probe_count`. Returns early only if the
    /// session has gone away.
    pub async fn run(self, prober: Arc<dyn Prober>, tx: mpsc::Sender<SequenceMessage>) {
        let url = self.target.url();

        let started = SequenceMessage::Started {
            region: self.region.clone(),
            scenario: self.scenario,
            url: url.clone(),
            probe_count: self.probe_count,
        };
        if tx.send(started).await.is_err() {
            return;
        }

        for index in 1..=self.probe_count {
            let result = ProbeResult::new(index, prober.probe(&url).await.into());
            debug!(region = %self.region, index, outcome = ?result.outcome, "probe finished");

            let (recorded, ack) = oneshot::channel();
            let message = SequenceMessage::Probe {
                region: self.region.clone(),
                result,
                recorded,
            };
            if tx.send(message).await.is_err() || ack.await.is_err() {
                return;
            }

            if index < self.probe_count {
                tokio::time::sleep(self.inter_probe_delay).await;
            }
        }

        let _ = tx
            .send(SequenceMessage::Completed {
                region: self.region,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{ProbeError, ProbeOutcome};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Fails every other probe.
    struct Flaky {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl Prober for Flaky {
        async fn probe(&self, _url: &str) -> Result<u64, ProbeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Ok(40 + n as u64)
            } else {
                Err(ProbeError::Transport {
                    cause: "connection reset".to_string(),
                })
            }
        }
    }

    fn sequence(count: u32) -> ProbeSequence {
        ProbeSequence {
            region: "eeur".to_string(),
            scenario: Scenario::Dev,
            target: ScenarioTarget {
                base_url: "http://eeur.test".to_string(),
                resource_name: crate::catalog::NO_CACHE_RESOURCE,
            },
            probe_count: count,
            inter_probe_delay: Duration::from_millis(1000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_all_probes_with_fixed_gap() {
        let prober = Arc::new(Flaky {
            calls: AtomicU32::new(0),
        });
        let (tx, mut rx) = mpsc::channel(4);
        let begin = Instant::now();
        tokio::spawn(sequence(4).run(prober, tx));

        let mut indices = Vec::new();
        let mut stamps = Vec::new();
        let mut failures = 0;
        let mut completed = false;
        while let Some(msg) = rx.recv().await {
            match msg {
                SequenceMessage::Started { url, probe_count, .. } => {
                    assert_eq!(url, "http://eeur.test/test-without-cache.json");
                    assert_eq!(probe_count, 4);
                }
                SequenceMessage::Probe {
                    result, recorded, ..
                } => {
                    if matches!(result.outcome, ProbeOutcome::Failure { .. }) {
                        failures += 1;
                    }
                    indices.push(result.index);
                    stamps.push(begin.elapsed());
                    recorded.send(()).unwrap();
                }
                SequenceMessage::Completed { region } => {
                    assert_eq!(region, "eeur");
                    completed = true;
                }
            }
        }

        assert!(completed);
        assert_eq!(indices, [1, 2, 3, 4]);
        assert_eq!(failures, 2);
        assert_eq!(
            stamps,
            [0, 1000, 2000, 3000].map(Duration::from_millis).to_vec()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_recording_before_next_probe() {
        let prober = Arc::new(Flaky {
            calls: AtomicU32::new(0),
        });
        let (tx, mut rx) = mpsc::channel(4);
        tokio::spawn(sequence(2).run(prober.clone(), tx));

        let _started = rx.recv().await.unwrap();
        let Some(SequenceMessage::Probe { recorded, .. }) = rx.recv().await else {
            panic!("expected first probe");
        };

        // Long after the delay, nothing else has been dispatched.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);

        recorded.send(()).unwrap();
        let Some(SequenceMessage::Probe { result, recorded, .. }) = rx.recv().await else {
            panic!("expected second probe");
        };
        assert_eq!(result.index, 2);
        recorded.send(()).unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(SequenceMessage::Completed { .. })
        ));
    }
}
