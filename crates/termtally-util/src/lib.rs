//! Shared utilities for termtally
//!
//! This crate provides:
//! - ID types (HostId, RemoteSessionId, Username, DeltaId)
//! - Time utilities (mockable clock, minute conversions)
//! - Default paths for config, data, and log directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
