//! Session tracking core for termtally
//!
//! This crate is the heart of termtally, containing:
//! - Session ledger (Absent -> Active -> Ended per host and session id)
//! - Accumulator that validates deltas and retries failed commits
//! - Engine tying reads, ledger and store together
//! - Poll loop scheduler with per-host failure isolation

mod accumulator;
mod engine;
mod error;
mod events;
mod filter;
mod ledger;
mod scheduler;
mod session;

pub use accumulator::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use filter::*;
pub use ledger::*;
pub use scheduler::*;
pub use session::*;
