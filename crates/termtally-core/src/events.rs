//! Transitions reported by the ledger

use chrono::{DateTime, Local};
use termtally_store::EndReason;
use termtally_util::{RemoteSessionId, Username};

use crate::TrackedSession;

/// A session seen for the first time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession {
    pub session_id: RemoteSessionId,
    pub username: Username,
    pub started_at: DateTime<Local>,
}

/// A session that has been finalized and whose time is due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedSession {
    pub session_id: RemoteSessionId,
    pub session: TrackedSession,
    pub reason: EndReason,
}

impl EndedSession {
    pub fn username(&self) -> &Username {
        &self.session.username
    }
}
