//! Plain-text tables and JSON output

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::types::{HerdbookError, Notice, Result};

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| HerdbookError::Parse(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Print a `{success: true, data}` notice
pub fn print_ok<T: Serialize>(data: T) -> Result<()> {
    print_json(&Notice::ok(data))
}

/// Liters with one decimal, the way the farm reports volumes
pub fn volume(v: f64) -> String {
    format!("{:.1} L", v)
}

/// Local `YYYY-MM-DD HH:MM`, or `-` when unknown
pub fn local_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate to `max` characters, marking the cut with `…`
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Left-aligned table with a header underline
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let dashes: Vec<&str> = dashes.iter().map(String::as_str).collect();

    out.push_str(&line(headers));
    out.push('\n');
    out.push_str(&line(&dashes));
    out.push('\n');
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&line(&cells));
        out.push('\n');
    }
    out
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// `Page 2/5 (37 items)` footer
pub fn page_footer(page: usize, page_count: usize, total: usize) -> String {
    format!("Page {}/{} ({} items)", page, page_count.max(1), total)
}
