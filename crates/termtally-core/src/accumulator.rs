//! Delta validation and commit buffering

use std::collections::VecDeque;
use std::sync::Arc;
use termtally_store::{ApplyOutcome, AuditEvent, AuditEventType, DeltaRecord, Store};
use termtally_util::{DeltaId, HostId, SessionKey, elapsed_minutes, minutes_to_seconds};
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult, EndedSession};

/// Outcome of one flush of the retry buffer
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Deltas newly added to totals
    pub committed: usize,

    /// Deltas the store had already applied
    pub duplicates: usize,

    /// Deltas still waiting for the next flush
    pub pending: usize,

    /// Failure that stopped the flush, if any
    pub error: Option<CoreError>,
}

/// Turns finalized sessions into deltas and commits them in order.
///
/// A delta leaves the buffer only once the store has acknowledged it, either
/// as applied or as already applied.
pub struct Accumulator {
    store: Arc<dyn Store>,
    pending: VecDeque<DeltaRecord>,
}

impl Accumulator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            pending: VecDeque::new(),
        }
    }

    /// Validate a finalized session and queue its delta.
    ///
    /// Invalid durations are logged, audited and dropped.
    pub fn submit(&mut self, host: &HostId, ended: EndedSession) -> CoreResult<DeltaId> {
        let session = &ended.session;
        let key = SessionKey::new(host.clone(), ended.session_id.clone());
        let minutes = elapsed_minutes(session.duration());

        let Some(seconds) = minutes_to_seconds(minutes) else {
            let reason = format!("duration of {} minutes is not a valid delta", minutes);
            warn!(
                session = %key,
                user = %session.username,
                minutes,
                "Rejecting invalid delta"
            );
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::DeltaRejected {
                host: host.clone(),
                session_id: ended.session_id.clone(),
                username: session.username.clone(),
                reason: reason.clone(),
            }));
            return Err(CoreError::InvalidDelta {
                username: session.username.clone(),
                reason,
            });
        };

        let delta = DeltaRecord {
            id: DeltaId::new(),
            username: session.username.clone(),
            host: host.clone(),
            session_id: ended.session_id,
            started_at: session.first_seen,
            ended_at: session.last_confirmed,
            seconds,
            reason: ended.reason,
        };

        debug!(
            delta_id = %delta.id,
            session = %key,
            user = %delta.username,
            seconds,
            reason = delta.reason.as_str(),
            "Delta queued"
        );

        let id = delta.id;
        self.pending.push_back(delta);
        Ok(id)
    }

    /// Commit buffered deltas in order, stopping at the first store failure
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();

        while let Some(delta) = self.pending.front() {
            match self.store.apply_delta(delta) {
                Ok(ApplyOutcome::Applied) => {
                    info!(
                        user = %delta.username,
                        host = %delta.host,
                        session_id = %delta.session_id,
                        seconds = delta.seconds,
                        reason = delta.reason.as_str(),
                        "Session time committed"
                    );
                    let _ = self.store.append_audit(AuditEvent::new(
                        AuditEventType::SessionFinalized {
                            delta_id: delta.id,
                            host: delta.host.clone(),
                            session_id: delta.session_id.clone(),
                            username: delta.username.clone(),
                            seconds: delta.seconds,
                            reason: delta.reason,
                        },
                    ));
                    report.committed += 1;
                }
                Ok(ApplyOutcome::Duplicate) => {
                    debug!(delta_id = %delta.id, "Delta was already committed");
                    report.duplicates += 1;
                }
                Err(e) if e.is_invalid_delta() => {
                    warn!(delta_id = %delta.id, error = %e, "Store rejected delta");
                    let _ = self.store.append_audit(AuditEvent::new(AuditEventType::DeltaRejected {
                        host: delta.host.clone(),
                        session_id: delta.session_id.clone(),
                        username: delta.username.clone(),
                        reason: e.to_string(),
                    }));
                }
                Err(e) => {
                    warn!(
                        delta_id = %delta.id,
                        pending = self.pending.len(),
                        error = %e,
                        "Store write failed; keeping deltas for retry"
                    );
                    report.error = Some(CoreError::StoreWriteFailure(e));
                    break;
                }
            }
            self.pending.pop_front();
        }

        report.pending = self.pending.len();
        report
    }

    /// Number of deltas waiting to be committed
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
