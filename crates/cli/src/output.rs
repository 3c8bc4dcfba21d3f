//! CLI output formatting utilities.
//!
//! Colored status lines, Unicode symbols and the grid tables used for the
//! configuration overview and the final artifact report.

use owo_colors::{OwoColorize, Stream};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

const COLUMN_SEP: &str = " │ ";
const CROSS_SEP: &str = "─┼─";
const TABLE_GAP: &str = "    ";

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// A grid table with inner separators only.
#[derive(Debug, Clone, Default)]
pub struct Table {
  headers: Vec<String>,
  rows: Vec<Vec<String>>,
}

impl Table {
  pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
    Self {
      headers: headers.into_iter().map(Into::into).collect(),
      rows: Vec::new(),
    }
  }

  pub fn row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) -> &mut Self {
    self.rows.push(cells.into_iter().map(Into::into).collect());
    self
  }

  fn widths(&self) -> Vec<usize> {
    let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
    for row in &self.rows {
      for (i, cell) in row.iter().enumerate() {
        let len = cell.chars().count();
        match widths.get_mut(i) {
          Some(w) => *w = (*w).max(len),
          None => widths.push(len),
        }
      }
    }
    widths
  }

  /// Render to lines without color.
  pub fn render(&self) -> Vec<String> {
    self.render_with(|_, cell| cell.to_string())
  }

  /// Render to lines, passing each padded body cell through `paint(column, cell)`.
  ///
  /// Padding happens before painting so escape codes never skew alignment.
  pub fn render_with(&self, paint: impl Fn(usize, &str) -> String) -> Vec<String> {
    let widths = self.widths();
    let separator = widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join(CROSS_SEP);

    let mut lines = vec![join_cells(&self.headers, &widths, |_, cell| cell.to_string())];
    for row in &self.rows {
      lines.push(separator.clone());
      lines.push(join_cells(row, &widths, &paint));
    }
    lines
  }
}

fn join_cells(cells: &[String], widths: &[usize], paint: impl Fn(usize, &str) -> String) -> String {
  widths
    .iter()
    .enumerate()
    .map(|(i, width)| {
      let cell = cells.get(i).map(String::as_str).unwrap_or("");
      paint(i, &pad(cell, *width))
    })
    .collect::<Vec<_>>()
    .join(COLUMN_SEP)
}

fn pad(cell: &str, width: usize) -> String {
  let len = cell.chars().count();
  format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
}

/// Lay out rendered tables next to each other.
pub fn side_by_side(tables: &[Table]) -> Vec<String> {
  let rendered: Vec<Vec<String>> = tables.iter().map(Table::render).collect();
  let widths: Vec<usize> = rendered
    .iter()
    .map(|lines| lines.iter().map(|l| l.chars().count()).max().unwrap_or(0))
    .collect();
  let height = rendered.iter().map(Vec::len).max().unwrap_or(0);

  (0..height)
    .map(|i| {
      let line = rendered
        .iter()
        .zip(&widths)
        .map(|(lines, width)| pad(lines.get(i).map(String::as_str).unwrap_or(""), *width))
        .collect::<Vec<_>>()
        .join(TABLE_GAP);
      line.trim_end().to_string()
    })
    .collect()
}
