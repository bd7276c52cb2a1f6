//! Audit log exports fed by `sp_export_audit_log`.

use std::io::Write;

use serde::Serialize;

use super::convert::{display_value, optional_display};
use super::{csv_writer, ExportError};
use crate::db::{DbValue, RowSet};

pub const AUDIT_CSV_HEADER: [&str; 11] = [
    "ID",
    "Table",
    "Operation",
    "Date",
    "Time",
    "User",
    "Status",
    "Reason",
    "Record ID",
    "Old Values",
    "New Values",
];

/// One audit row in the JSON export. NULL cells stay `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub id: Option<i64>,
    pub table: Option<String>,
    pub operation: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub user: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub record_id: Option<i64>,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
}

impl AuditRecord {
    pub fn from_row(row: &[DbValue]) -> Self {
        let text = |index: usize| optional_display(row.get(index));
        let integer = |index: usize| row.get(index).and_then(DbValue::as_i64);

        Self {
            id: integer(0),
            table: text(1),
            operation: text(2),
            date: text(3).map(|date| date.chars().take(10).collect()),
            time: text(4),
            user: text(5),
            status: text(6),
            reason: text(7),
            record_id: integer(8),
            old_values: text(9),
            new_values: text(10),
        }
    }
}

pub fn write_audit_csv<W: Write>(rows: &RowSet, writer: W) -> Result<usize, ExportError> {
    let mut csv = csv_writer(writer);
    csv.write_record(AUDIT_CSV_HEADER)?;
    for row in &rows.rows {
        csv.write_record(row.iter().map(display_value))?;
    }
    csv.flush()?;
    Ok(rows.len())
}

pub fn write_audit_json<W: Write>(rows: &RowSet, mut writer: W) -> Result<usize, ExportError> {
    let records: Vec<AuditRecord> = rows
        .rows
        .iter()
        .map(|row| AuditRecord::from_row(row))
        .collect();
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(records.len())
}
