//! Terminal rendering of screens.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use permit_desk::screen::{DashboardStat, TableView};
use permit_desk::Screen;

/// Output format for screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

pub(crate) fn render(screen: &Screen, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_text(screen),
        OutputFormat::Json => match screen {
            Screen::Nothing => String::new(),
            screen => serde_json::to_string_pretty(screen)
                .unwrap_or_else(|err| format!("{{\"error\": \"{err}\"}}")),
        },
    }
}

fn render_text(screen: &Screen) -> String {
    match screen {
        Screen::Table(view) => render_table(view),
        Screen::Stats(stats) => render_stats(stats),
        Screen::Text { title, body } => format!("{title}\n\n{body}"),
        Screen::Nothing => String::new(),
    }
}

fn render_table(view: &TableView) -> String {
    let mut output = format!("{}\n", view.title);
    if view.is_empty() {
        output.push_str("No results");
    } else {
        let mut table = Table::new();
        table.set_header(view.columns.iter().map(Cell::new).collect::<Vec<_>>());
        for row in &view.rows {
            table.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
        }
        output.push_str(&table.to_string());
    }
    if let Some(footer) = &view.footer {
        output.push('\n');
        output.push_str(footer);
    }
    output
}

fn render_stats(stats: &[DashboardStat]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    for stat in stats {
        table.add_row(vec![stat.label, stat.value.as_str()]);
    }
    format!("Dashboard\n{table}")
}
