use crate::model::{Config, ProbeResult, ProbeTarget};
use crate::output::{OutputChannel, Report};
use crate::probe::{target_url, HttpsProber, Prober};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

/// Counts from a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub probed: usize,
    pub available: usize,
    pub failed: usize,
}

/// Fans out one probe task per target. At most `threads` probes are in
/// flight; `run` returns once every task has finished.
pub struct Engine {
    prober: Arc<dyn Prober>,
    sink: OutputChannel,
    sem: Arc<Semaphore>,
}

impl Engine {
    pub fn new(prober: Arc<dyn Prober>, threads: usize, sink: OutputChannel) -> anyhow::Result<Self> {
        if threads == 0 {
            anyhow::bail!("thread count must be greater than zero");
        }
        Ok(Self {
            prober,
            sink,
            sem: Arc::new(Semaphore::new(threads)),
        })
    }

    pub fn from_config(cfg: &Config, sink: OutputChannel) -> anyhow::Result<Self> {
        let prober =
            HttpsProber::with_resolve_timeout(Arc::new(cfg.policy.clone()), cfg.resolve_timeout)?;
        Self::new(Arc::new(prober), cfg.threads, sink)
    }

    #[instrument(skip_all, fields(targets = targets.len(), prober = self.prober.name()))]
    pub async fn run(&self, targets: Vec<ProbeTarget>) -> anyhow::Result<RunSummary> {
        let mut tasks = FuturesUnordered::new();
        let mut summary = RunSummary::default();

        for target in targets {
            let permit = self.sem.clone().acquire_owned().await?;
            let prober = self.prober.clone();
            let sink = self.sink.clone();
            let fallback = target.clone();
            let handle = tokio::spawn(async move {
                // Dropped on every exit path, unwinding included.
                let _permit = permit;
                let report = probe_target(prober.as_ref(), target).await;
                let available = report.result.available;
                if let Err(err) = sink.emit(report).await {
                    warn!(error = %err, "dropping report");
                }
                available
            });
            tasks.push(async move { (fallback, handle.await) });
        }

        while let Some((target, joined)) = tasks.next().await {
            summary.probed += 1;
            match joined {
                Ok(true) => summary.available += 1,
                Ok(false) => summary.failed += 1,
                Err(err) => {
                    error!(domain = %target.domain, error = %err, "probe task aborted");
                    summary.failed += 1;
                    let report = Report {
                        target,
                        result: ProbeResult::unavailable(),
                        error: Some("aborted"),
                    };
                    if let Err(err) = self.sink.emit(report).await {
                        warn!(error = %err, "dropping report");
                    }
                }
            }
        }

        info!(
            probed = summary.probed,
            available = summary.available,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }
}

async fn probe_target(prober: &dyn Prober, target: ProbeTarget) -> Report {
    let outcome = match target_url(&target.domain) {
        Ok(url) => prober.probe(&url).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(result) => {
            debug!(domain = %target.domain, "probe finished");
            Report {
                target,
                result,
                error: None,
            }
        }
        Err(err) => {
            debug!(domain = %target.domain, kind = err.kind(), error = %err, "probe failed");
            Report {
                target,
                result: ProbeResult::unavailable(),
                error: Some(err.kind()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::model::OutputConfig;
    use async_trait::async_trait;
    use url::Url;

    struct Refusing;

    #[async_trait]
    impl Prober for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        async fn probe(&self, _url: &Url) -> Result<ProbeResult, ProbeError> {
            Err(ProbeError::Timeout)
        }
    }

    #[tokio::test]
    async fn rejects_zero_threads() {
        let sink = OutputChannel::with_writer(OutputConfig::default(), Box::new(std::io::sink()))
            .unwrap();
        assert!(Engine::new(Arc::new(Refusing), 0, sink).is_err());
    }

    #[tokio::test]
    async fn unencodable_domain_fails_without_probing() {
        let target = ProbeTarget {
            domain: "\u{0301}bad.example".into(),
            owning_subnet: "192.0.2.0/24".parse().unwrap(),
        };
        let report = probe_target(&Refusing, target).await;
        assert!(!report.result.available);
        assert_eq!(report.error, Some("encoding"));
    }

    #[tokio::test]
    async fn counts_failures() {
        let sink = OutputChannel::with_writer(OutputConfig::default(), Box::new(std::io::sink()))
            .unwrap();
        let engine = Engine::new(Arc::new(Refusing), 2, sink.clone()).unwrap();
        let targets = (0..5)
            .map(|i| ProbeTarget {
                domain: format!("host{i}.example"),
                owning_subnet: "192.0.2.0/24".parse().unwrap(),
            })
            .collect();
        let summary = engine.run(targets).await.unwrap();
        sink.shutdown().await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                probed: 5,
                available: 0,
                failed: 5
            }
        );
    }
}
