//! In-flight session state

use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use termtally_host_api::SessionState;
use termtally_util::{RemoteSessionId, Username};

/// A session currently believed to be open on its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSession {
    pub username: Username,

    /// Remote state string from the latest read
    pub state: SessionState,

    /// First poll in which the session was seen
    pub first_seen: DateTime<Local>,

    /// Most recent poll in which the session was seen
    pub last_confirmed: DateTime<Local>,
}

impl TrackedSession {
    pub fn new(username: Username, state: SessionState, now: DateTime<Local>) -> Self {
        Self {
            username,
            state,
            first_seen: now,
            last_confirmed: now,
        }
    }

    /// Confirmed duration (never negative)
    pub fn duration(&self) -> chrono::Duration {
        self.last_confirmed - self.first_seen
    }
}

/// Tracked sessions of one host, keyed by session id
pub type HostSessions = BTreeMap<RemoteSessionId, TrackedSession>;
