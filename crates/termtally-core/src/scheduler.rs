//! Poll loop scheduler

use std::sync::Arc;
use termtally_config::{HostConfig, MonitorConfig, ServiceConfig};
use termtally_host_api::SessionReader;
use termtally_store::{Store, write_report};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{HostOutcome, SessionFilter, ShutdownReport, TallyEngine};

/// Summary of one pass over all hosts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub hosts_polled: usize,
    pub hosts_failed: usize,

    /// Hosts not read because shutdown was requested
    pub hosts_skipped: usize,
    pub sessions_seen: usize,
    pub started: usize,
    pub ended: usize,
    pub committed: usize,
    pub rejected: usize,

    /// Deltas still buffered after the cycle
    pub pending: usize,
}

impl CycleReport {
    fn absorb(&mut self, outcome: &HostOutcome) {
        self.sessions_seen += outcome.sessions_seen;
        self.started += outcome.started;
        self.ended += outcome.ended;
        self.committed += outcome.flush.committed;
        self.rejected += outcome.rejected;
    }
}

/// Drives reads of every configured host at a fixed interval
pub struct Scheduler {
    service: ServiceConfig,
    hosts: Vec<HostConfig>,
    reader: Arc<dyn SessionReader>,
    store: Arc<dyn Store>,
    engine: TallyEngine,
    cycles: u64,
}

impl Scheduler {
    pub fn new(
        config: &MonitorConfig,
        store: Arc<dyn Store>,
        reader: Arc<dyn SessionReader>,
    ) -> Self {
        let filter = SessionFilter::from_config(&config.reader);

        Self {
            service: config.service.clone(),
            hosts: config.hosts.clone(),
            reader,
            engine: TallyEngine::new(store.clone(), filter),
            store,
            cycles: 0,
        }
    }

    pub fn engine(&self) -> &TallyEngine {
        &self.engine
    }

    /// Poll every host once, in order.
    ///
    /// A host that fails is skipped for this cycle only. Once `shutdown`
    /// reads true, the host in flight is finished and the rest are skipped.
    pub async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport {
            cycle: self.cycles,
            ..CycleReport::default()
        };

        debug!(cycle = self.cycles, hosts = self.hosts.len(), "Starting poll cycle");

        for (index, host) in self.hosts.iter().enumerate() {
            let stop = *shutdown.borrow();
            if stop {
                report.hosts_skipped = self.hosts.len() - index;
                info!(skipped = report.hosts_skipped, "Shutdown requested; ending cycle early");
                break;
            }

            report.hosts_polled += 1;
            match self.reader.list_sessions(host).await {
                Ok(listing) => {
                    let now = termtally_util::now();
                    let outcome = self.engine.observe_host(&host.id, listing, now);
                    info!(
                        host = %host.id,
                        sessions = outcome.sessions_seen,
                        started = outcome.started,
                        ended = outcome.ended,
                        committed = outcome.flush.committed,
                        "Host polled"
                    );
                    report.absorb(&outcome);
                }
                Err(e) => {
                    self.engine.host_failed(&host.id, &e);
                    report.hosts_failed += 1;
                }
            }
        }

        // Retry anything left from earlier store failures
        let flush = self.engine.flush();
        report.committed += flush.committed;
        report.pending = flush.pending;

        self.export_report();

        info!(
            cycle = report.cycle,
            polled = report.hosts_polled,
            failed = report.hosts_failed,
            sessions = report.sessions_seen,
            started = report.started,
            ended = report.ended,
            committed = report.committed,
            pending = report.pending,
            "Poll cycle complete"
        );

        report
    }

    /// Run cycles until `shutdown` reads true (or its sender goes away),
    /// then commit what is left.
    ///
    /// A cycle that overruns the interval is followed directly by the next
    /// one; cycles never overlap.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> ShutdownReport {
        let cycle_shutdown = shutdown.clone();
        let mut ticker = tokio::time::interval(self.service.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            hosts = self.hosts.len(),
            interval = ?self.service.poll_interval,
            "Scheduler running"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(&cycle_shutdown).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        self.shutdown()
    }

    /// Commit buffered deltas and, if configured, finalize open sessions
    pub fn shutdown(&mut self) -> ShutdownReport {
        let flush = self.engine.flush();

        let report = if self.service.flush_on_shutdown {
            let mut report = self.engine.finalize_all();
            report.committed += flush.committed;
            report
        } else {
            info!(
                open = self.engine.ledger().tracked_count(),
                "Leaving open sessions unfinalized"
            );
            ShutdownReport {
                finalized: 0,
                committed: flush.committed,
                pending: flush.pending,
            }
        };

        if report.pending > 0 {
            warn!(pending = report.pending, "Deltas could not be committed before exit");
        }

        self.export_report();
        report
    }

    fn export_report(&self) {
        let Some(path) = &self.service.report_path else {
            return;
        };

        let result = self
            .store
            .get_all()
            .and_then(|totals| write_report(path, &totals));

        match result {
            Ok(()) => debug!(path = %path.display(), "Report written"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write report"),
        }
    }
}
