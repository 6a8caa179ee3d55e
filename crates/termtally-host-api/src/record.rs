//! Session records reported by a host

use serde::{Deserialize, Serialize};
use termtally_util::{RemoteSessionId, Username};

/// Connection state as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Disconnected,
    /// Any other state string, kept verbatim
    Other(String),
}

impl SessionState {
    /// Interpret a state column (`Active`, `Disc`, ...)
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "active" => SessionState::Active,
            "disc" | "disconnected" => SessionState::Disconnected,
            _ => SessionState::Other(s.to_string()),
        }
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, SessionState::Disconnected)
    }
}

/// One session line reported by a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: RemoteSessionId,
    pub username: Username,
    pub state: SessionState,
}

impl SessionRecord {
    pub fn new(
        session_id: impl Into<RemoteSessionId>,
        username: impl Into<Username>,
        state: SessionState,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            username: username.into(),
            state,
        }
    }

    /// Convenience constructor for an active session
    pub fn active(session_id: impl Into<RemoteSessionId>, username: impl Into<Username>) -> Self {
        Self::new(session_id, username, SessionState::Active)
    }
}

/// Result of one successful read of a host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionListing {
    pub records: Vec<SessionRecord>,

    /// Output lines that could not be parsed and were skipped
    pub malformed_lines: usize,
}

impl SessionListing {
    pub fn new(records: Vec<SessionRecord>) -> Self {
        Self {
            records,
            malformed_lines: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
