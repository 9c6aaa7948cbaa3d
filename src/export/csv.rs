//! CSV export.
//!
//! The header starts with the record type's fixed columns, followed by any
//! other field names in the order they are first seen. Records lacking a
//! field get an empty cell.

use std::fs::File;
use std::path::Path;

use csv::Writer;
use tracing::info;

use super::FlatRecord;
use crate::error::ExportError;

/// `columns`, then any further names in first-encountered order across all records.
pub fn header(columns: &[&str], records: &[FlatRecord]) -> Vec<String> {
    let mut names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    for record in records {
        for name in record.names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Write `records` to `path`, returning the number of rows written.
pub fn write_csv(
    path: &Path,
    columns: &[&str],
    records: &[FlatRecord],
) -> Result<usize, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = Writer::from_writer(file);

    let columns = header(columns, records);
    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }

    for record in records {
        writer.write_record(columns.iter().map(|c| record.get(c).unwrap_or("")))?;
    }

    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Exported {} rows to {}", records.len(), path.display());
    Ok(records.len())
}
