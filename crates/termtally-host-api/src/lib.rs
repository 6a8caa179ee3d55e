//! Session reader trait interfaces for termtally
//!
//! This crate defines the interface between the tally core and whatever
//! transport lists sessions on a remote host. It contains no transport code
//! itself.

mod mock;
mod record;
mod traits;

pub use mock::*;
pub use record::*;
pub use traits::*;
