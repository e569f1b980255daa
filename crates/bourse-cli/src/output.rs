use std::io::{self, Write};

use bourse_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(envelope: &Envelope<Value>, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => render_table(&mut out, envelope)?,
    }
    Ok(())
}

fn render_table(out: &mut impl Write, envelope: &Envelope<Value>) -> Result<(), CliError> {
    writeln!(out, "request_id  : {}", envelope.meta.request_id)?;
    writeln!(out, "schema      : {}", envelope.meta.schema_version)?;
    writeln!(out, "generated_at: {}", envelope.meta.generated_at)?;
    writeln!(out, "latency_ms  : {}", envelope.meta.latency_ms)?;

    if !envelope.meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &envelope.meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    writeln!(out, "data:")?;
    if let Some(grid) = grid_lines(&envelope.data) {
        for line in grid {
            writeln!(out, "  {line}")?;
        }
    } else {
        let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
        for line in pretty_data.lines() {
            writeln!(out, "  {line}")?;
        }
    }

    if !envelope.errors.is_empty() {
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            writeln!(out, "  - {}: {}", error.code, error.message)?;
        }
    }

    Ok(())
}

/// Aligned columns for a rendered table grid, or `None` for other payloads.
fn grid_lines(data: &Value) -> Option<Vec<String>> {
    if data.get("kind")?.as_str()? != "grid" {
        return None;
    }

    let mut lines = vec![data
        .get("header")?
        .as_array()?
        .iter()
        .map(format_cell)
        .collect::<Vec<_>>()];
    for row in data.get("rows")?.as_array()? {
        lines.push(row.as_array()?.iter().map(format_cell).collect());
    }

    let columns = lines.iter().map(Vec::len).max().unwrap_or(0);
    let widths = (0..columns)
        .map(|column| {
            lines
                .iter()
                .filter_map(|line| line.get(column))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    Some(
        lines
            .into_iter()
            .map(|cells| {
                cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, width)| format!("{cell:<width$}"))
                    .collect::<Vec<_>>()
                    .join("  ")
                    .trim_end()
                    .to_owned()
            })
            .collect(),
    )
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        _ => value.to_string(),
    }
}
