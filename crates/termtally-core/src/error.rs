//! Core error taxonomy

use termtally_host_api::ReaderError;
use termtally_store::StoreError;
use termtally_util::{HostId, Username};
use thiserror::Error;

/// Errors surfaced by the tally core.
///
/// None of these stop the poll loop: host errors skip the host for one
/// cycle, store failures leave deltas buffered, invalid deltas are dropped.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Host {host} unreachable: {message}")]
    HostUnreachable { host: HostId, message: String },

    #[error("Session command failed on {host}: {message}")]
    CommandFailed { host: HostId, message: String },

    #[error("Skipped {lines} malformed line(s) from {host}")]
    MalformedSessionData { host: HostId, lines: usize },

    #[error("Store write failed: {0}")]
    StoreWriteFailure(#[from] StoreError),

    #[error("Invalid delta for {username}: {reason}")]
    InvalidDelta { username: Username, reason: String },
}

impl CoreError {
    /// Classify a reader failure for a host
    pub fn from_reader(host: &HostId, err: &ReaderError) -> Self {
        match err {
            ReaderError::CommandFailed { .. } => CoreError::CommandFailed {
                host: host.clone(),
                message: err.to_string(),
            },
            ReaderError::HostUnreachable(_) | ReaderError::Timeout(_) => {
                CoreError::HostUnreachable {
                    host: host.clone(),
                    message: err.to_string(),
                }
            }
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
