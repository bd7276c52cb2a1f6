//! CSV and JSON exports.
//!
//! A destination file is only created once the rows to write are known to be
//! non-empty; an empty result is reported instead.

mod audit;
mod convert;
mod tables;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Backend, Database, RowSet};
use crate::notice::{Notice, Notifier};
use crate::permits::AuditFilter;

pub use audit::{write_audit_csv, write_audit_json, AuditRecord, AUDIT_CSV_HEADER};
pub use convert::{display_value, optional_display, TIMESTAMP_FORMAT};
pub use tables::{export_all, write_table_csv, ExportSummary, ExportTable, EXPORT_TABLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    /// Nothing to export; no file was created.
    Empty,
    /// The failure has already been reported.
    Failed,
}

/// Export the filtered audit log to `path` as CSV or JSON.
pub fn export_audit_log<B, N>(
    db: &mut Database<B, N>,
    filter: &AuditFilter,
    format: ExportFormat,
    path: &Path,
) -> ExportOutcome
where
    B: Backend,
    N: Notifier,
{
    let Some(rows) = db.export_audit_log(filter) else {
        return ExportOutcome::Failed;
    };
    if rows.is_empty() {
        db.notify(Notice::info("No Data", "No audit logs found"));
        return ExportOutcome::Empty;
    }

    match write_audit_file(&rows, format, path) {
        Ok(count) => {
            info!(path = %path.display(), rows = count, "audit log exported");
            db.notify(Notice::info(
                "Success",
                format!("Exported to {}", path.display()),
            ));
            ExportOutcome::Written {
                path: path.to_path_buf(),
                rows: count,
            }
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "audit log export failed");
            db.notify(Notice::error("Error", format!("Export failed: {err}")));
            ExportOutcome::Failed
        }
    }
}

fn write_audit_file(
    rows: &RowSet,
    format: ExportFormat,
    path: &Path,
) -> Result<usize, ExportError> {
    write_new_file(path, |file| match format {
        ExportFormat::Csv => write_audit_csv(rows, file),
        ExportFormat::Json => write_audit_json(rows, file),
    })
}

/// Create `path` and fill it with `write`; a failed write removes the partial file.
pub(crate) fn write_new_file<F>(path: &Path, write: F) -> Result<usize, ExportError>
where
    F: FnOnce(BufWriter<File>) -> Result<usize, ExportError>,
{
    let file = BufWriter::new(File::create(path)?);
    write(file).inspect_err(|_| {
        if let Err(err) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %err, "partial export not removed");
        }
    })
}

/// CSV writer that accepts records of any width.
pub(crate) fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().flexible(true).from_writer(writer)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::*;

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit_logs.csv");

        let result = write_new_file(&path, |mut file| {
            file.write_all(b"ID,Table\n17,")?;
            file.flush()?;
            Err(ExportError::Io(io::Error::other("disk full")))
        });

        assert!(matches!(result, Err(ExportError::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn successful_write_keeps_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("holidays.csv");

        let written = write_new_file(&path, |mut file| {
            file.write_all(b"holiday_id\n1\n")?;
            file.flush()?;
            Ok(1)
        })
        .expect("file written");

        assert_eq!(written, 1);
        assert_eq!(
            fs::read_to_string(&path).expect("readable"),
            "holiday_id\n1\n"
        );
    }
}
