//! Tally engine

use chrono::{DateTime, Local};
use std::sync::Arc;
use termtally_host_api::{ReaderError, SessionListing};
use termtally_store::{AuditEvent, AuditEventType, Store};
use termtally_util::HostId;
use tracing::{debug, info, warn};

use crate::{
    Accumulator, CoreError, EndedSession, FlushReport, SessionFilter, SessionLedger,
};

/// What one successful host read changed
#[derive(Debug, Default)]
pub struct HostOutcome {
    /// Sessions reported after filtering
    pub sessions_seen: usize,
    pub started: usize,
    pub ended: usize,

    /// Finalized sessions whose delta was invalid
    pub rejected: usize,

    /// Lines the reader could not parse
    pub malformed_lines: usize,
    pub recovered: bool,
    pub flush: FlushReport,
}

/// Totals of a shutdown flush
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub finalized: usize,
    pub committed: usize,
    pub pending: usize,
}

/// Ties the ledger, the accumulator and the store together
pub struct TallyEngine {
    ledger: SessionLedger,
    accumulator: Accumulator,
    filter: SessionFilter,
    store: Arc<dyn Store>,
}

impl TallyEngine {
    pub fn new(store: Arc<dyn Store>, filter: SessionFilter) -> Self {
        Self {
            ledger: SessionLedger::new(),
            accumulator: Accumulator::new(store.clone()),
            filter,
            store,
        }
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn pending_deltas(&self) -> usize {
        self.accumulator.pending_len()
    }

    /// Feed a successful read of `host` taken at `now` and commit what ended
    pub fn observe_host(
        &mut self,
        host: &HostId,
        listing: SessionListing,
        now: DateTime<Local>,
    ) -> HostOutcome {
        if listing.malformed_lines > 0 {
            let warning = CoreError::MalformedSessionData {
                host: host.clone(),
                lines: listing.malformed_lines,
            };
            warn!(host = %host, lines = listing.malformed_lines, "{}", warning);
        }

        let records = self.filter.apply(listing.records);
        let update = self.ledger.observe(host, &records, now);

        for started in &update.started {
            debug!(
                host = %host,
                session_id = %started.session_id,
                user = %started.username,
                "Session started"
            );
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::SessionStarted {
                host: host.clone(),
                session_id: started.session_id.clone(),
                username: started.username.clone(),
                started_at: started.started_at,
            }));
        }

        let mut outcome = HostOutcome {
            sessions_seen: records.len(),
            started: update.started.len(),
            ended: update.ended.len(),
            malformed_lines: listing.malformed_lines,
            recovered: update.recovered,
            ..HostOutcome::default()
        };

        outcome.rejected = self.submit_all(host, update.ended);
        outcome.flush = self.accumulator.flush();
        outcome
    }

    /// Record a failed read; the host's sessions stay frozen until it recovers
    pub fn host_failed(&mut self, host: &HostId, err: &ReaderError) -> CoreError {
        let error = CoreError::from_reader(host, err);
        let frozen = self.ledger.suspend(host);

        warn!(host = %host, kind = err.kind(), frozen, error = %err, "Host read failed");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::HostFailed {
            host: host.clone(),
            error: err.to_string(),
        }));

        error
    }

    /// Retry buffered deltas
    pub fn flush(&mut self) -> FlushReport {
        self.accumulator.flush()
    }

    /// Finalize every open session at its last confirmation and commit
    pub fn finalize_all(&mut self) -> ShutdownReport {
        let drained = self.ledger.drain_all();
        let finalized = drained.len();

        for (host, ended) in drained {
            let _ = self.accumulator.submit(&host, ended);
        }

        let flush = self.accumulator.flush();
        info!(
            finalized,
            committed = flush.committed,
            pending = flush.pending,
            "Open sessions finalized"
        );

        ShutdownReport {
            finalized,
            committed: flush.committed,
            pending: flush.pending,
        }
    }

    fn submit_all(&mut self, host: &HostId, ended: Vec<EndedSession>) -> usize {
        let mut rejected = 0;
        for session in ended {
            if self.accumulator.submit(host, session).is_err() {
                rejected += 1;
            }
        }
        rejected
    }
}
