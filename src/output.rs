//! Rendering of console resources for the terminal.

use clap::ValueEnum;
use serde::Serialize;

/// Output format for list and get commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns with a header row
    #[default]
    Table,
    /// Only the resource IDs, one per line
    Id,
    /// Pretty-printed JSON
    Json,
}

/// A resource that can be shown as one table row
pub trait Tabular {
    const HEADERS: &'static [&'static str];

    fn id(&self) -> &str;

    fn row(&self) -> Vec<String>;
}

/// Render `items` in the requested format.
pub fn render<T: Tabular + Serialize>(
    items: &[T],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = items.iter().map(Tabular::row).collect();
            table(T::HEADERS, &rows)
        }
        OutputFormat::Id => items
            .iter()
            .map(|item| format!("{}\n", item.id()))
            .collect(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(items)?;
            json.push('\n');
            json
        }
    })
}

/// Print `items` to stdout in the requested format
pub fn print<T: Tabular + Serialize>(
    items: &[T],
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    print!("{}", render(items, format)?);
    Ok(())
}

/// Lay out `rows` under `headers`, padding every column to its widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_line(&mut out, &header, &widths);
    for row in rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let last = widths.len().saturating_sub(1);
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i == last {
            line.push_str(cell);
        } else {
            line.push_str(&format!("{:<width$}   ", cell, width = width));
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Cell text for an optional value
pub fn cell<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}
