//! Session reader traits

use async_trait::async_trait;
use std::time::Duration;
use termtally_config::HostConfig;
use thiserror::Error;

use crate::SessionListing;

/// Errors from reading a host's sessions
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Command could not be started or the host refused the connection
    #[error("Host unreachable: {0}")]
    HostUnreachable(String),

    /// Command ran but reported failure
    #[error("Command failed (status {status:?}): {stderr}")]
    CommandFailed { status: Option<i32>, stderr: String },

    /// Read did not finish within the per-host timeout
    #[error("Read timed out after {0:?}")]
    Timeout(Duration),
}

impl ReaderError {
    /// Short label for logs and audit entries
    pub fn kind(&self) -> &'static str {
        match self {
            ReaderError::HostUnreachable(_) | ReaderError::Timeout(_) => "host_unreachable",
            ReaderError::CommandFailed { .. } => "command_failed",
        }
    }
}

pub type ReaderResult<T> = Result<T, ReaderError>;

/// Lists the sessions currently open on a host.
///
/// Implementations are read-only probes. Output that cannot be parsed is
/// skipped and counted in [`SessionListing::malformed_lines`]; only transport
/// or command failures are errors.
#[async_trait]
pub trait SessionReader: Send + Sync {
    async fn list_sessions(&self, host: &HostConfig) -> ReaderResult<SessionListing>;
}
