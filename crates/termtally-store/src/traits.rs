//! Store trait definitions

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use termtally_util::{DeltaId, HostId, RemoteSessionId, Username};

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // User totals

    /// Add a non-negative, finite number of minutes to a user's total.
    ///
    /// Negative or non-finite values are rejected with
    /// [`StoreError::InvalidDelta`](crate::StoreError::InvalidDelta) and the
    /// total is left unchanged.
    fn add_minutes(&self, username: &Username, minutes: f64) -> StoreResult<()>;

    /// Apply a finalized session delta exactly once.
    ///
    /// Recording the delta id and incrementing the total happen in one
    /// transaction; a delta id seen before is reported as a duplicate.
    fn apply_delta(&self, delta: &DeltaRecord) -> StoreResult<ApplyOutcome>;

    /// Get a user's total (zero for users never seen)
    fn get_total(&self, username: &Username) -> StoreResult<UserTotal>;

    /// Get all totals, ordered by username
    fn get_all(&self) -> StoreResult<Vec<UserTotal>>;

    /// Check whether a delta was already committed
    fn is_delta_applied(&self, id: &DeltaId) -> StoreResult<bool>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Cumulative connected time of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTotal {
    pub username: Username,
    pub total_seconds: u64,
    pub updated_at: Option<DateTime<Local>>,
}

impl UserTotal {
    pub fn zero(username: Username) -> Self {
        Self {
            username,
            total_seconds: 0,
            updated_at: None,
        }
    }

    pub fn minutes(&self) -> f64 {
        self.total_seconds as f64 / 60.0
    }
}

/// Why a tracked session was finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// No longer reported by its host
    Vanished,
    /// Same session id reported for a different user
    Replaced,
    /// Host came back after a failed read; pre-outage time committed
    HostRecovered,
    /// Service shut down gracefully
    Shutdown,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Vanished => "vanished",
            EndReason::Replaced => "replaced",
            EndReason::HostRecovered => "host_recovered",
            EndReason::Shutdown => "shutdown",
        }
    }
}

/// A validated, non-negative duration ready to be committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub id: DeltaId,
    pub username: Username,
    pub host: HostId,
    pub session_id: RemoteSessionId,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub seconds: u64,
    pub reason: EndReason,
}

/// Result of applying a delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Total incremented
    Applied,
    /// Delta id already committed earlier; nothing changed
    Duplicate,
}
