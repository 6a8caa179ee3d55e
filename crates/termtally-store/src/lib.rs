//! Persistence layer for termtally
//!
//! Provides:
//! - Per-user cumulative connected time (atomic increments)
//! - Applied-delta journal, so a retried delta is never counted twice
//! - Audit log (append-only)
//! - Read-only report export (CSV, JSON)

mod audit;
mod export;
mod sqlite;
mod traits;

pub use audit::*;
pub use export::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid delta for user '{username}': {minutes} minutes")]
    InvalidDelta { username: String, minutes: f64 },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Whether the error concerns the value written rather than the store itself
    pub fn is_invalid_delta(&self) -> bool {
        matches!(self, StoreError::InvalidDelta { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
