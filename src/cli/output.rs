//! Table, JSON and CSV rendering for CLI output

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

use crate::api::models::{Application, Log, Review, Task};
use crate::api::Pagination;
use crate::presentation::status::{stars, method_tone, Tone, UptimeHealth, Visual};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// One printable cell; the tone only colours table output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub tone: Option<Tone>,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: None,
        }
    }

    pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone: Some(tone),
        }
    }
}

/// A record that renders as one table/CSV row
pub trait Tabular: Serialize {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<Cell>;
}

fn or_dash(text: &str) -> String {
    if text.is_empty() {
        "-".to_string()
    } else {
        text.to_string()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

impl Tabular for Application {
    fn headers() -> &'static [&'static str] {
        &["ID", "Name", "Status", "Uptime", "Stacks", "Link"]
    }

    fn cells(&self) -> Vec<Cell> {
        let visual = self.status.visual();
        let uptime = self.uptime_percentage();
        vec![
            Cell::plain(&self.app_id),
            Cell::plain(&self.name),
            Cell::toned(format!("{} {}", visual.icon, visual.label), visual.tone),
            Cell::toned(format!("{:.1}%", uptime), UptimeHealth::from_percentage(uptime).tone()),
            Cell::plain(or_dash(&self.stacks.join(", "))),
            Cell::plain(or_dash(&self.link)),
        ]
    }
}

impl Tabular for Log {
    fn headers() -> &'static [&'static str] {
        &["ID", "Type", "App", "Method", "Endpoint", "Status", "Time", "Message"]
    }

    fn cells(&self) -> Vec<Cell> {
        let visual = self.log_type.visual();
        vec![
            Cell::plain(&self.id),
            Cell::toned(visual.label, visual.tone),
            Cell::plain(or_dash(&self.app_name)),
            Cell::toned(or_dash(&self.method), method_tone(&self.method)),
            Cell::plain(self.endpoint.as_deref().unwrap_or("-")),
            Cell::plain(self.status_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::plain(
                self.created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::plain(truncate(&self.message, 60)),
        ]
    }
}

impl Tabular for Task {
    fn headers() -> &'static [&'static str] {
        &["ID", "Status", "Priority", "App", "Deadline", "Description"]
    }

    fn cells(&self) -> Vec<Cell> {
        let status = self.status.visual();
        let priority = self.priority.visual();
        vec![
            Cell::plain(&self.id),
            Cell::toned(format!("{} {}", status.icon, status.label), status.tone),
            Cell::toned(priority.label, priority.tone),
            Cell::plain(self.app_name.as_deref().unwrap_or(&self.app_id)),
            Cell::plain(
                self.date_to_finish
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::plain(truncate(&self.description, 60)),
        ]
    }
}

impl Tabular for Review {
    fn headers() -> &'static [&'static str] {
        &["ID", "Rating", "App", "Reviewer", "Verified", "Comment"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::plain(&self.id),
            Cell::toned(stars(self.rating), self.rating.visual().tone),
            Cell::plain(or_dash(&self.app_name)),
            Cell::plain(or_dash(&self.reviewer)),
            Cell::plain(if self.verified { "yes" } else { "no" }),
            Cell::plain(truncate(&self.comment, 60)),
        ]
    }
}

/// Render `rows` in the requested format
pub fn render<T: Tabular>(
    out: &mut impl Write,
    rows: &[T],
    format: OutputFormat,
    color: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, rows)?;
            writeln!(out)
        }
        OutputFormat::Csv => write_csv(out, rows),
        OutputFormat::Table => write_table(out, rows, color),
    }
}

/// Pretty JSON for values without a row shape
pub fn render_value<T: Serialize>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

fn write_csv<T: Tabular>(out: &mut impl Write, rows: &[T]) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(T::headers())?;
    for row in rows {
        writer.write_record(row.cells().iter().map(|cell| cell.text.as_str()))?;
    }
    writer.flush()
}

fn write_table<T: Tabular>(out: &mut impl Write, rows: &[T], color: bool) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "No records found.");
    }

    let headers = T::headers();
    let cells: Vec<Vec<Cell>> = rows.iter().map(Tabular::cells).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.text.chars().count());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<width$}", h, width = *w))
        .collect();
    writeln!(out, "{}", header_line.join("  ").trim_end())?;
    writeln!(out, "{}", "-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)))?;

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| {
                let padded = format!("{:<width$}", cell.text, width = *w);
                match (color, cell.tone) {
                    (true, Some(tone)) => tone.paint(&padded),
                    _ => padded,
                }
            })
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(())
}

/// `Page 2 of 5 (230 total)` footer for paginated lists
pub fn page_footer(pagination: &Pagination) -> String {
    let mut footer = format!(
        "Page {} of {} ({} total)",
        pagination.page,
        pagination.total_pages.max(1),
        pagination.total
    );
    if pagination.has_next() {
        footer.push_str(&format!(" · next: --page {}", pagination.page + 1));
    }
    footer
}
