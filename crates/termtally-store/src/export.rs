//! Report export
//!
//! Renders a snapshot of user totals for external consumers. Reports never
//! write to the store.

use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::{StoreError, StoreResult, UserTotal};

/// CSV header row
pub const CSV_HEADER: &str = "Username,TotalMinutes";

/// Write totals as CSV, minutes rounded to two decimals
pub fn write_csv<W: Write>(mut out: W, totals: &[UserTotal]) -> StoreResult<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for total in totals {
        writeln!(out, "{},{:.2}", csv_field(total.username.as_str()), total.minutes())?;
    }
    out.flush()?;
    Ok(())
}

/// Write totals as a pretty-printed JSON array
pub fn write_json<W: Write>(mut out: W, totals: &[UserTotal]) -> StoreResult<()> {
    serde_json::to_writer_pretty(&mut out, totals)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Replace the CSV report at `path`
///
/// The report is written to a uniquely named file beside the target and
/// persisted over it, so readers see either the previous report or the new
/// one, and concurrent writers never share a temp file.
pub fn write_report(path: &Path, totals: &[UserTotal]) -> StoreResult<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_csv(&mut writer, totals)?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
