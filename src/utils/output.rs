use colored::*;
use serde::Serialize;

use crate::utils::error::{AppError, AppResult};
use crate::utils::format::truncate_string;
use crate::utils::pagination::print_paged;

pub struct OutputStyle;

impl OutputStyle {
    pub fn indicator(text: &str) -> ColoredString {
        text.bright_green()
    }

    pub fn number(text: &str) -> ColoredString {
        text.bright_yellow()
    }

    pub fn content(text: &str) -> ColoredString {
        text.clear()
    }

    pub fn date(text: &str) -> ColoredString {
        text.bright_cyan()
    }

    pub fn title(text: &str) -> ColoredString {
        text.bright_blue().bold()
    }

    pub fn header(text: &str) -> ColoredString {
        text.bold()
    }

    pub fn label(text: &str) -> ColoredString {
        text.cyan()
    }

    pub fn success(text: &str) -> ColoredString {
        text.green()
    }

    pub fn error(text: &str) -> ColoredString {
        text.red()
    }

    pub fn warning(text: &str) -> ColoredString {
        text.yellow()
    }

    pub fn info(text: &str) -> ColoredString {
        text.blue()
    }

    pub fn muted(text: &str) -> ColoredString {
        text.dimmed()
    }

    /// Green for rising values, red for falling ones
    pub fn signed(value: f64, text: &str) -> ColoredString {
        if value > 0.0 {
            text.green()
        } else if value < 0.0 {
            text.red()
        } else {
            text.clear()
        }
    }

    // Formatting helpers
    pub fn separator() -> String {
        "─".repeat(50)
    }

    pub fn header_separator() -> String {
        "═".repeat(50)
    }

    pub fn print_header(title: &str) {
        println!("{}", Self::title(title));
        println!("{}", Self::header_separator());
    }

    pub fn print_field_colored(label: &str, value: &str, color_fn: impl Fn(&str) -> ColoredString) {
        println!("{:>18}: {}", Self::label(label), color_fn(value));
    }
}

pub fn print_warning(message: &str) {
    println!("⚠️  {}", OutputStyle::warning(message));
}

pub fn print_success(message: &str) {
    println!("✅ {}", OutputStyle::success(message));
}

pub fn print_info(message: &str) {
    println!("ℹ️  {}", OutputStyle::info(message));
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::System(format!("Failed to serialize to JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Column alignment inside a box-drawn table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Right,
}

/// Box-drawn table rendered from plain strings.
///
/// Cells are padded before colouring so ANSI escapes never break the layout.
pub struct Table {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
    max_width: usize,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            aligns: vec![Align::Left; headers.len()],
            rows: Vec::new(),
            max_width: 40,
        }
    }

    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.aligns.get_mut(column) {
            *slot = align;
        }
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        widths.into_iter().map(|w| w.min(self.max_width)).collect()
    }

    fn pad(cell: &str, width: usize, align: Align) -> String {
        let cell = truncate_string(cell, width);
        let fill = width.saturating_sub(cell.chars().count());
        match align {
            Align::Left => format!("{}{}", cell, " ".repeat(fill)),
            Align::Right => format!("{}{}", " ".repeat(fill), cell),
        }
    }

    fn border(widths: &[usize], left: &str, mid: &str, right: &str) -> String {
        let parts: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, parts.join(mid), right)
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();

        out.push_str(&Self::border(&widths, "┌", "┬", "┐"));
        out.push('\n');
        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| OutputStyle::header(&Self::pad(h, *w, Align::Left)).to_string())
            .collect();
        out.push_str(&format!("│ {} │\n", header.join(" │ ")));
        out.push_str(&Self::border(&widths, "├", "┼", "┤"));
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    Self::pad(cell, *w, self.aligns[i])
                })
                .collect();
            out.push_str(&format!("│ {} │\n", cells.join(" │ ")));
        }

        out.push_str(&Self::border(&widths, "└", "┴", "┘"));
        out
    }

    /// Print the table, paging it when it would not fit the terminal
    pub fn print(&self) -> AppResult<()> {
        print_paged(&self.render())
    }
}
