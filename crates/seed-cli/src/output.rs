use seed_core::pulse::{Activity, HealthStatus};
use seed_core::verify::CheckOutcome;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Widths in chars: status cells carry multi-byte symbols.
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{cell}{}", " ".repeat(width.saturating_sub(len)))
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

pub fn status_symbol(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Green => "✓",
        HealthStatus::Yellow => "⚠",
        HealthStatus::Red => "✗",
    }
}

pub fn activity_symbol(activity: Activity) -> &'static str {
    match activity {
        Activity::Idle => "○",
        Activity::Busy => "◉",
        Activity::Error => "✗",
    }
}

pub fn outcome_symbol(outcome: CheckOutcome) -> &'static str {
    match outcome {
        CheckOutcome::Ok => "✓",
        CheckOutcome::Mismatch => "⚠",
        CheckOutcome::Missing | CheckOutcome::Error => "✗",
    }
}

pub fn status_cell(status: HealthStatus) -> String {
    format!("{} {status}", status_symbol(status))
}

pub fn activity_cell(activity: Activity) -> String {
    format!("{} {activity}", activity_symbol(activity))
}
