//! Full-screen status view.
//!
//! Painted before every prompt: credentials line, active query panel,
//! results table, and the log tail, newest first, clipped to whatever
//! height is left.

use std::io::{self, Write};

use piterm_session::{Credentials, Query, QueryType};
use piterm_terminal::LogBuffer;
use piterm_webapi::Record;

use crate::ansi::{CLEAR, CURSOR_HOME, FG_CYAN, FG_RESET, FG_YELLOW};

/// Fixed cell width of the results table.
const CELL_WIDTH: usize = 25;

/// Most result rows shown at once.
const MAX_RESULT_ROWS: usize = 9;

/// Rows reserved for the prompt below the painted sections.
const PROMPT_HEIGHT: usize = 2;

/// Repaint the whole screen.
pub fn render(
    credentials: &Credentials,
    query: &Query,
    results: &[Record],
    logs: &LogBuffer,
) -> io::Result<()> {
    let (columns, rows) = terminal_size();
    let mut out = String::new();
    out.push_str(CLEAR);
    out.push_str(CURSOR_HOME);

    let mut used = 0;
    let credentials_line = format_credentials(credentials);
    out.push_str(&credentials_line);
    out.push_str("\n\n");
    used += 2;

    let panel = format_query_panel(query);
    for line in &panel {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    used += panel.len() + 1;

    if !results.is_empty() {
        let table = format_results_table(results);
        for line in &table {
            out.push_str(line);
            out.push('\n');
        }
        used += table.len();
    }

    let remaining = rows
        .saturating_sub(used)
        .saturating_sub(PROMPT_HEIGHT)
        .saturating_sub(1);
    out.push_str(&format!("{FG_CYAN}{}{FG_RESET}\n", "─".repeat(columns)));
    for line in format_log_tail(logs, remaining, columns) {
        out.push_str(&line);
        out.push('\n');
    }

    let mut stdout = io::stdout();
    stdout.write_all(out.as_bytes())?;
    stdout.flush()
}

/// Current terminal size with an 80x24 fallback.
fn terminal_size() -> (usize, usize) {
    match crossterm::terminal::size() {
        Ok((w, h)) => (w as usize, h as usize),
        Err(_) => (80, 24),
    }
}

fn format_credentials(credentials: &Credentials) -> String {
    match &credentials.username {
        Some(username) => format!("{FG_CYAN}Logged in as: {FG_RESET}{username}"),
        None => format!("{FG_YELLOW}Not logged in.{FG_RESET}"),
    }
}

/// The active query panel; field set varies with the query type.
fn format_query_panel(query: &Query) -> Vec<String> {
    let field = |label: &str, value: &str| format!("{FG_CYAN}{label}: {FG_RESET}{value}");

    let mut lines = vec![
        field("API Base URL", &query.api_base_url),
        field("PI Server", &query.pi_server),
        field("Type", query.query_type.as_str()),
        field("Start Time", &query.start_time),
        field("End Time", &query.end_time),
        field("Tags", &query.tags.join(", ")),
        field("Timezone", &query.timezone),
    ];
    match query.query_type {
        QueryType::Recorded => {
            lines.push(field("Boundary Type", query.boundary_type.as_str()));
        },
        QueryType::Interpolated => {
            lines.push(field("Interval", &query.interval));
        },
        QueryType::Summary => {
            lines.push(field("Summary Type", query.summary_type.as_str()));
            lines.push(field("Interval", &query.interval));
            lines.push(field("Calculation Basis", query.calculation_basis.as_str()));
            lines.push(field("Timestamp Calculation", query.timestamp_calculation.as_str()));
        },
    }
    lines
}

/// Box-drawn results table with fixed-width cells.
fn format_results_table(results: &[Record]) -> Vec<String> {
    const HEADERS: [&str; 6] = ["Tag", "Timestamp", "Value", "Good", "Questionable", "Substituted"];

    let mut lines = Vec::new();
    lines.push(border_row('┌', '┬', '┐'));
    lines.push(format!(
        " │{}│",
        HEADERS.map(|h| format!(" {} ", pad(h))).join("│")
    ));
    lines.push(border_row('├', '┼', '┤'));

    for record in results.iter().take(MAX_RESULT_ROWS) {
        let cells = [
            record.tag.clone(),
            record.timestamp.clone(),
            value_text(&record.value),
            record.good.to_string(),
            record.questionable.to_string(),
            record.substituted.to_string(),
        ];
        lines.push(format!(
            " │{}│",
            cells.map(|c| format!(" {} ", pad(&c))).join("│")
        ));
    }

    lines.push(border_row('└', '┴', '┘'));
    if results.len() > MAX_RESULT_ROWS {
        lines.push(format!(" ({} more rows not shown)", results.len() - MAX_RESULT_ROWS));
    }
    lines
}

fn border_row(left: char, mid: char, right: char) -> String {
    let segment = "─".repeat(CELL_WIDTH + 2);
    let mut row = format!(" {left}");
    for i in 0..6 {
        row.push_str(&segment);
        row.push(if i < 5 { mid } else { right });
    }
    row
}

/// Pad or truncate a cell to the fixed width.
fn pad(text: &str) -> String {
    let mut cell: String = text.chars().take(CELL_WIDTH).collect();
    while cell.chars().count() < CELL_WIDTH {
        cell.push(' ');
    }
    cell
}

/// JSON values render without quoting noise.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(o) => o
            .get("Name")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| value.to_string(), str::to_string),
        other => other.to_string(),
    }
}

/// Newest log lines first, clipped to `height` rows and `width` columns.
fn format_log_tail(logs: &LogBuffer, height: usize, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for line in logs.lines().into_iter().rev().take(height) {
        if line.chars().count() > width && width > 3 {
            let clipped: String = line.chars().take(width - 3).collect();
            lines.push(format!("{clipped}..."));
        } else {
            lines.push(line);
        }
    }
    lines
}
