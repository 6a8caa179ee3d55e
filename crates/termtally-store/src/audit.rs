//! Audit event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use termtally_util::{DeltaId, HostId, RemoteSessionId, Username};

use crate::EndReason;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Configuration loaded at startup
    ConfigLoaded { host_count: usize },

    /// Session first observed
    SessionStarted {
        host: HostId,
        session_id: RemoteSessionId,
        username: Username,
        started_at: DateTime<Local>,
    },

    /// Session finalized and its delta committed
    SessionFinalized {
        delta_id: DeltaId,
        host: HostId,
        session_id: RemoteSessionId,
        username: Username,
        seconds: u64,
        reason: EndReason,
    },

    /// Host read failed; its sessions are frozen until it recovers
    HostFailed { host: HostId, error: String },

    /// Delta discarded because its duration was invalid
    DeltaRejected {
        host: HostId,
        session_id: RemoteSessionId,
        username: Username,
        reason: String,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: termtally_util::now(),
            event,
        }
    }
}
