//! Whole-table CSV dump into a directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::convert::display_value;
use super::{csv_writer, write_new_file, ExportError};
use crate::db::{Backend, Database, RowSet};
use crate::notice::{Notice, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTable {
    pub table: &'static str,
    pub file_name: &'static str,
}

pub const EXPORT_TABLES: [ExportTable; 9] = [
    ExportTable {
        table: "citizen",
        file_name: "citizens.csv",
    },
    ExportTable {
        table: "application",
        file_name: "applications.csv",
    },
    ExportTable {
        table: "permit_type",
        file_name: "permit_types.csv",
    },
    ExportTable {
        table: "department",
        file_name: "departments.csv",
    },
    ExportTable {
        table: "issued_license",
        file_name: "licenses.csv",
    },
    ExportTable {
        table: "review_step",
        file_name: "review_steps.csv",
    },
    ExportTable {
        table: "document",
        file_name: "documents.csv",
    },
    ExportTable {
        table: "holidays",
        file_name: "holidays.csv",
    },
    ExportTable {
        table: "audit_log",
        file_name: "audit_logs.csv",
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    /// Tables that had no rows, so no file was created.
    pub skipped: Vec<&'static str>,
    /// `table: error` for each table that could not be exported.
    pub failed: Vec<String>,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failed.len()
    }

    pub fn message(&self) -> String {
        let mut message = format!("Exported {}/{} tables", self.written.len(), self.total());
        if !self.skipped.is_empty() {
            message.push_str(&format!("\n\nSkipped (no rows): {}", self.skipped.join(", ")));
        }
        if !self.failed.is_empty() {
            message.push_str("\n\nFailed:\n");
            message.push_str(&self.failed.join("\n"));
        }
        message
    }

    pub fn notice(&self) -> Notice {
        if self.failed.is_empty() {
            Notice::info("Success", self.message())
        } else {
            Notice::warning("Export Complete", self.message())
        }
    }
}

/// Dump every table in [`EXPORT_TABLES`] into `dir`, one CSV each.
///
/// A failing table does not stop the others.
pub fn export_all<B, N>(db: &mut Database<B, N>, dir: &Path) -> ExportSummary
where
    B: Backend,
    N: Notifier,
{
    let mut summary = ExportSummary::default();
    if let Err(err) = fs::create_dir_all(dir) {
        summary.failed = EXPORT_TABLES
            .iter()
            .map(|table| format!("{}: {err}", table.table))
            .collect();
        db.notify(summary.notice());
        return summary;
    }

    for table in EXPORT_TABLES {
        let sql = format!("SELECT * FROM {}", table.table);
        let rows = match db.try_query(&sql, &[]) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(table = table.table, error = %err, "table export failed");
                summary.failed.push(format!("{}: {err}", table.table));
                continue;
            }
        };
        if rows.is_empty() {
            summary.skipped.push(table.table);
            continue;
        }

        let path = dir.join(table.file_name);
        match write_table_file(&rows, &path) {
            Ok(count) => {
                info!(table = table.table, rows = count, "table exported");
                summary.written.push(path);
            }
            Err(err) => summary.failed.push(format!("{}: {err}", table.table)),
        }
    }

    db.notify(summary.notice());
    summary
}

fn write_table_file(rows: &RowSet, path: &Path) -> Result<usize, ExportError> {
    write_new_file(path, |file| write_table_csv(rows, file))
}

/// CSV with the result's column names as the header row.
pub fn write_table_csv<W: Write>(rows: &RowSet, writer: W) -> Result<usize, ExportError> {
    let mut csv = csv_writer(writer);
    csv.write_record(&rows.columns)?;
    for row in &rows.rows {
        csv.write_record(row.iter().map(display_value))?;
    }
    csv.flush()?;
    Ok(rows.len())
}
