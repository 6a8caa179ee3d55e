//! Command-based session reader for termtally
//!
//! Provides:
//! - Running a templated command per host with a bounded timeout
//! - Parsing `quser` tables and `who` listings into session records

mod parser;
mod reader;

pub use parser::*;
pub use reader::*;
