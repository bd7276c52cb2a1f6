//! What an action leaves on screen, independent of how the shell draws it.

use serde::Serialize;

use crate::db::RowSet;
use crate::export::display_value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub footer: Option<String>,
}

impl TableView {
    pub fn new(title: impl Into<String>, columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows,
            footer: None,
        }
    }

    /// Render a raw result with fixed headers, converting every cell.
    pub fn from_rows(title: impl Into<String>, columns: &[&str], rows: &RowSet) -> Self {
        let rows = rows
            .rows
            .iter()
            .map(|row| row.iter().map(display_value).collect())
            .collect();
        Self::new(title, columns, rows)
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStat {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Screen {
    Table(TableView),
    Stats(Vec<DashboardStat>),
    Text { title: String, body: String },
    /// The outcome was delivered as a notice only.
    Nothing,
}
