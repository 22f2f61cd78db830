//! Dispatcher: runs the topology processor over every unit of work.
//!
//! Sequential mode processes units on the calling task. Parallel mode feeds a
//! bounded queue drained by a fixed number of worker tasks, so at most
//! `pool_size` units are queued ahead of the workers. Both modes isolate
//! per-unit failures and panics, and both return only after every unit has
//! finished.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use super::zone::UnitOfWork;
use crate::config::DispatchMode;
use crate::topology::TopologyProcessor;

/// A unit whose processing failed.
#[derive(Debug, Clone)]
pub struct FailedUnit {
    pub zone_id: i64,
    pub zone_name: String,
    pub path: PathBuf,
    pub error: String,
    /// The failure was the row store going away.
    pub unavailable: bool,
}

/// Outcome of one dispatch phase.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub processed: usize,
    /// Failed units, ordered by staged file path.
    pub failed: Vec<FailedUnit>,
}

impl DispatchReport {
    /// True when any unit failed because the store was unreachable.
    pub fn store_outage(&self) -> bool {
        self.failed.iter().any(|f| f.unavailable)
    }

    fn record(&mut self, result: Result<(), FailedUnit>) {
        match result {
            Ok(()) => self.processed += 1,
            Err(failed) => self.failed.push(failed),
        }
    }
}

pub struct Dispatcher {
    processor: Arc<dyn TopologyProcessor>,
    mode: DispatchMode,
    pool_size: usize,
}

impl Dispatcher {
    pub fn new(processor: Arc<dyn TopologyProcessor>, mode: DispatchMode, pool_size: usize) -> Self {
        Self {
            processor,
            mode,
            pool_size: pool_size.max(1),
        }
    }

    /// Process every unit and wait for all of them.
    pub async fn dispatch(&self, units: Vec<UnitOfWork>) -> DispatchReport {
        debug!(units = units.len(), mode = ?self.mode, pool_size = self.pool_size, "dispatching");

        let mut report = match self.mode {
            DispatchMode::Sequential => self.sequential(units).await,
            DispatchMode::Parallel => self.parallel(units).await,
        };

        report.failed.sort_by(|a, b| a.path.cmp(&b.path));
        report
    }

    async fn sequential(&self, units: Vec<UnitOfWork>) -> DispatchReport {
        let mut report = DispatchReport::default();
        for unit in units {
            report.record(run_unit(self.processor.as_ref(), unit).await);
        }
        report
    }

    async fn parallel(&self, units: Vec<UnitOfWork>) -> DispatchReport {
        let (tx, rx) = mpsc::channel::<UnitOfWork>(self.pool_size);
        let rx = Arc::new(Mutex::new(rx));
        // Results leave each worker as they happen, so a worker that dies
        // does not take finished units with it.
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(PathBuf, UnitResult)>();

        let workers: Vec<_> = (0..self.pool_size)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let done_tx = done_tx.clone();
                let processor = Arc::clone(&self.processor);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(unit) = next else { break };
                        debug!(worker, zone = %unit.zone_name, "worker took unit");
                        let path = unit.path.clone();
                        let result = run_unit(processor.as_ref(), unit).await;
                        if done_tx.send((path, result)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(done_tx);

        let pending: BTreeMap<PathBuf, (i64, String)> = units
            .iter()
            .map(|u| (u.path.clone(), (u.zone_id, u.zone_name.clone())))
            .collect();

        let total = units.len();
        for unit in units {
            if tx.send(unit).await.is_err() {
                error!(total, "all dispatch workers exited early");
                break;
            }
        }
        drop(tx);

        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "dispatch worker failed");
            }
        }

        let mut results = Vec::with_capacity(total);
        while let Ok(done) = done_rx.try_recv() {
            results.push(done);
        }
        settle(pending, results)
    }
}

type UnitResult = Result<(), FailedUnit>;

/// Build the report for a set of dispatched units. Units with no result never
/// finished and count as failed.
fn settle(
    mut pending: BTreeMap<PathBuf, (i64, String)>,
    results: Vec<(PathBuf, UnitResult)>,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    for (path, result) in results {
        pending.remove(&path);
        report.record(result);
    }

    for (path, (zone_id, zone_name)) in pending {
        warn!(zone = %zone_name, file = %path.display(), "unit lost with its dispatch worker");
        report.failed.push(FailedUnit {
            zone_id,
            zone_name,
            path,
            error: "dispatch worker exited before finishing the unit".to_string(),
            unavailable: false,
        });
    }
    report
}

/// Process one unit, converting errors and panics into a [`FailedUnit`].
async fn run_unit(processor: &dyn TopologyProcessor, unit: UnitOfWork) -> UnitResult {
    let outcome = AssertUnwindSafe(processor.process(unit.zone_id, &unit.snapshot))
        .catch_unwind()
        .await;

    let (error, unavailable) = match outcome {
        Ok(Ok(())) => {
            debug!(zone = %unit.zone_name, file = %unit.path.display(), "zone processed");
            return Ok(());
        }
        Ok(Err(e)) => (e.to_string(), e.is_unavailable()),
        Err(panic) => (format!("processor panicked: {}", panic_message(&*panic)), false),
    };

    warn!(
        zone = %unit.zone_name,
        file = %unit.path.display(),
        error = %error,
        "zone processing failed"
    );

    Err(FailedUnit {
        zone_id: unit.zone_id,
        zone_name: unit.zone_name,
        path: unit.path,
        error,
        unavailable,
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::interfaces::StoreError;
    use crate::snapshot::Snapshot;
    use crate::topology::ProcessError;

    /// Fails zones named `bad`, panics on `boom`, reports an outage on `down`,
    /// and records peak concurrency.
    #[derive(Default)]
    struct ScriptedProcessor {
        active: AtomicUsize,
        peak: AtomicUsize,
        done: AtomicUsize,
    }

    #[async_trait]
    impl TopologyProcessor for ScriptedProcessor {
        async fn process(&self, _zone_id: i64, snapshot: &Snapshot) -> Result<(), ProcessError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            match snapshot.zone_name()? {
                "bad" => Err(ProcessError::InvalidSnapshot(
                    crate::snapshot::SnapshotError::MissingHost,
                )),
                "boom" => panic!("boom"),
                "down" => Err(ProcessError::Store(StoreError::Database(sqlx::Error::PoolClosed))),
                _ => {
                    self.done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        }
    }

    fn unit(id: i64, zone: &str) -> UnitOfWork {
        let yaml = format!("misc:\n  zone: {}\n", zone);
        let path = PathBuf::from(format!("/staging/{:02}-{}.yaml", id, zone));
        UnitOfWork {
            zone_id: id,
            zone_name: zone.to_string(),
            snapshot: Snapshot::from_yaml(&yaml, Path::new("t.yaml")).unwrap(),
            path,
        }
    }

    fn units(names: &[&str]) -> Vec<UnitOfWork> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| unit(i as i64 + 1, n))
            .collect()
    }

    #[tokio::test]
    async fn test_sequential_runs_one_at_a_time() {
        let processor = Arc::new(ScriptedProcessor::default());
        let dispatcher = Dispatcher::new(processor.clone(), DispatchMode::Sequential, 4);

        let report = dispatcher.dispatch(units(&["a", "b", "c"])).await;

        assert_eq!(report.processed, 3);
        assert!(report.failed.is_empty());
        assert_eq!(processor.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parallel_bounded_by_pool_size() {
        let processor = Arc::new(ScriptedProcessor::default());
        let dispatcher = Dispatcher::new(processor.clone(), DispatchMode::Parallel, 3);
        let names: Vec<String> = (0..12).map(|i| format!("z{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let report = dispatcher.dispatch(units(&names)).await;

        assert_eq!(report.processed, 12);
        assert_eq!(processor.done.load(Ordering::SeqCst), 12);
        assert!(processor.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        for mode in [DispatchMode::Sequential, DispatchMode::Parallel] {
            let processor = Arc::new(ScriptedProcessor::default());
            let dispatcher = Dispatcher::new(processor.clone(), mode, 2);

            let report = dispatcher
                .dispatch(units(&["a", "bad", "boom", "b", "c"]))
                .await;

            assert_eq!(report.processed, 3, "mode {:?}", mode);
            let failed: Vec<&str> = report.failed.iter().map(|f| f.zone_name.as_str()).collect();
            assert_eq!(failed, vec!["bad", "boom"]);
            assert!(report.failed[1].error.contains("boom"));
            assert!(!report.store_outage());
        }
    }

    #[tokio::test]
    async fn test_store_outage_flagged() {
        let dispatcher = Dispatcher::new(
            Arc::new(ScriptedProcessor::default()),
            DispatchMode::Parallel,
            2,
        );

        let report = dispatcher.dispatch(units(&["a", "down"])).await;

        assert_eq!(report.processed, 1);
        assert!(report.store_outage());
        assert!(report.failed[0].unavailable);
    }

    #[test]
    fn test_units_without_result_count_as_failed() {
        let all = units(&["a", "b", "c"]);
        let pending = all
            .iter()
            .map(|u| (u.path.clone(), (u.zone_id, u.zone_name.clone())))
            .collect();
        let results = vec![(all[0].path.clone(), Ok(()))];

        let report = settle(pending, results);

        assert_eq!(report.processed, 1);
        let failed: Vec<&str> = report.failed.iter().map(|f| f.zone_name.as_str()).collect();
        assert_eq!(failed, vec!["b", "c"]);
        assert!(report.failed.iter().all(|f| f.path.starts_with("/staging")));
        assert!(!report.store_outage());
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let dispatcher = Dispatcher::new(
            Arc::new(ScriptedProcessor::default()),
            DispatchMode::Parallel,
            0,
        );

        let report = dispatcher.dispatch(Vec::new()).await;
        assert_eq!(report.processed, 0);
        assert!(report.failed.is_empty());
    }
}
