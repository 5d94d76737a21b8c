//! Output formatting: plain text (human-readable) and JSON.

use serde_json::Value;
use std::fmt::Write;

/// Widest a table cell may grow before it is truncated.
const MAX_CELL: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable tables and key-value
    #[default]
    Plain,
    /// JSON (pretty-printed)
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" | "p" => Ok(OutputFormat::Plain),
            "json" | "j" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// Render a value in the requested format.
pub fn render(value: &Value, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Plain => {
            let out = format_plain(value);
            Ok(out.strip_suffix('\n').unwrap_or(&out).to_string())
        }
        OutputFormat::Json => serde_json::to_string_pretty(value),
    }
}

/// Format value as plain text: arrays of objects become a table, objects become `key: value`.
pub fn format_plain(value: &Value) -> String {
    let mut out = String::new();
    format_plain_impl(value, &mut out, 0);
    out
}

fn format_plain_impl(v: &Value, out: &mut String, indent: usize) {
    let pad = "  ".repeat(indent);
    match v {
        Value::Array(arr) if arr.is_empty() => {
            let _ = writeln!(out, "{}<none>", pad);
        }
        Value::Array(arr) if arr.iter().all(Value::is_object) => {
            format_table(arr, out, &pad);
        }
        Value::Array(arr) => {
            for item in arr {
                if item.is_object() || item.is_array() {
                    format_plain_impl(item, out, indent + 1);
                } else {
                    let _ = writeln!(out, "{}{}", pad, cell(item));
                }
            }
        }
        Value::Object(map) => {
            for (k, val) in map {
                if val.is_object() || val.is_array() {
                    let _ = writeln!(out, "{}{}:", pad, k);
                    format_plain_impl(val, out, indent + 1);
                } else {
                    let _ = writeln!(out, "{}{}: {}", pad, k, cell(val));
                }
            }
        }
        scalar => {
            let _ = writeln!(out, "{}{}", pad, cell(scalar));
        }
    }
}

/// Columns are the union of keys in first-seen order, sized to their widest cell.
fn format_table(rows: &[Value], out: &mut String, pad: &str) {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(m) = row {
            for k in m.keys() {
                if !columns.contains(k) {
                    columns.push(k.clone());
                }
            }
        }
    }
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    let v = row.get(c).map(cell).unwrap_or_else(|| "-".to_string());
                    truncate(&v, MAX_CELL)
                })
                .collect()
        })
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let header = line(columns.as_slice());
    let _ = writeln!(out, "{}{}", pad, header);
    let _ = writeln!(out, "{}{}", pad, "-".repeat(header.chars().count()));
    for row in &cells {
        let _ = writeln!(out, "{}{}", pad, line(row.as_slice()));
    }
}

fn cell(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max {
        s
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
