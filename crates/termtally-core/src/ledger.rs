//! Session ledger
//!
//! Tracks which sessions are open on each host and turns successive reads
//! into start and end transitions. All transitions go through [`reconcile`];
//! [`SessionLedger`] only adds per-host bookkeeping around it.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use termtally_host_api::SessionRecord;
use termtally_store::EndReason;
use termtally_util::HostId;
use tracing::{debug, warn};

use crate::{EndedSession, HostSessions, StartedSession, TrackedSession};

/// Outcome of reconciling one read against the tracked sessions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub next: HostSessions,
    pub started: Vec<StartedSession>,
    pub ended: Vec<EndedSession>,
}

/// Compute the next tracked set for a host from one successful read.
///
/// - reported and untracked: starts at `now`
/// - reported and tracked under the same user: confirmed at `now`
/// - reported under a different user: the old session ends (`Replaced`)
///   and a new one starts at `now`
/// - tracked but not reported: ends (`Vanished`) at its last confirmation
///
/// A session id listed twice in one read is taken once.
pub fn reconcile(
    previous: &HostSessions,
    observed: &[SessionRecord],
    now: DateTime<Local>,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    for record in observed {
        if result.next.contains_key(&record.session_id) {
            continue;
        }

        let tracked = match previous.get(&record.session_id) {
            Some(prev) if prev.username == record.username => {
                let mut session = prev.clone();
                // Clock steps backwards must not shrink a session
                session.last_confirmed = now.max(prev.last_confirmed);
                session.state = record.state.clone();
                session
            }
            other => {
                if let Some(prev) = other {
                    result.ended.push(EndedSession {
                        session_id: record.session_id.clone(),
                        session: prev.clone(),
                        reason: EndReason::Replaced,
                    });
                }
                result.started.push(StartedSession {
                    session_id: record.session_id.clone(),
                    username: record.username.clone(),
                    started_at: now,
                });
                TrackedSession::new(record.username.clone(), record.state.clone(), now)
            }
        };

        result.next.insert(record.session_id.clone(), tracked);
    }

    for (session_id, session) in previous {
        if !result.next.contains_key(session_id) {
            result.ended.push(EndedSession {
                session_id: session_id.clone(),
                session: session.clone(),
                reason: EndReason::Vanished,
            });
        }
    }

    result
}

/// Changes produced for one host by a successful read
#[derive(Debug, Clone, Default)]
pub struct HostUpdate {
    pub started: Vec<StartedSession>,
    pub ended: Vec<EndedSession>,

    /// The host was suspended before this read
    pub recovered: bool,
}

#[derive(Debug, Default)]
struct HostLedger {
    sessions: HostSessions,
    suspended: bool,
}

/// In-memory sessions of every polled host
#[derive(Debug, Default)]
pub struct SessionLedger {
    hosts: HashMap<HostId, HostLedger>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a successful read of `host`.
    ///
    /// After an outage, every session tracked before it is finalized at its
    /// last confirmation (`HostRecovered`) and every reported session
    /// starts fresh, so the outage itself is never credited.
    pub fn observe(
        &mut self,
        host: &HostId,
        observed: &[SessionRecord],
        now: DateTime<Local>,
    ) -> HostUpdate {
        let entry = self.hosts.entry(host.clone()).or_default();
        let recovered = entry.suspended;
        let mut ended = Vec::new();

        if recovered {
            ended.extend(
                std::mem::take(&mut entry.sessions)
                    .into_iter()
                    .map(|(session_id, session)| EndedSession {
                        session_id,
                        session,
                        reason: EndReason::HostRecovered,
                    }),
            );
            entry.suspended = false;
            debug!(host = %host, finalized = ended.len(), "Host recovered");
        }

        let Reconciliation {
            next,
            started,
            ended: reconciled,
        } = reconcile(&entry.sessions, observed, now);
        entry.sessions = next;
        ended.extend(reconciled);

        HostUpdate {
            started,
            ended,
            recovered,
        }
    }

    /// Freeze a host after a failed read; returns how many sessions are held
    pub fn suspend(&mut self, host: &HostId) -> usize {
        let entry = self.hosts.entry(host.clone()).or_default();
        if !entry.suspended {
            warn!(host = %host, frozen = entry.sessions.len(), "Host suspended");
        }
        entry.suspended = true;
        entry.sessions.len()
    }

    pub fn is_suspended(&self, host: &HostId) -> bool {
        self.hosts.get(host).is_some_and(|h| h.suspended)
    }

    /// Tracked sessions of a host
    pub fn sessions(&self, host: &HostId) -> Option<&HostSessions> {
        self.hosts.get(host).map(|h| &h.sessions)
    }

    /// Total tracked sessions across hosts
    pub fn tracked_count(&self) -> usize {
        self.hosts.values().map(|h| h.sessions.len()).sum()
    }

    /// Finalize every open session at its last confirmation (shutdown)
    pub fn drain_all(&mut self) -> Vec<(HostId, EndedSession)> {
        let mut ended = Vec::new();
        for (host, ledger) in self.hosts.iter_mut() {
            ledger.suspended = false;
            for (session_id, session) in std::mem::take(&mut ledger.sessions) {
                ended.push((
                    host.clone(),
                    EndedSession {
                        session_id,
                        session,
                        reason: EndReason::Shutdown,
                    },
                ));
            }
        }
        ended
    }
}
