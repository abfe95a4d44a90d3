//! CSV input and output
//!
//! Input needs `source` and `log_message` columns; any other columns are
//! carried through to the output unchanged. The output appends
//! `target_label`, `confidence`, and `error`.

use anyhow::{anyhow, Context};
use csv::StringRecord;
use logtriage_core::{LogRecord, RecordOutcome};
use std::path::Path;

pub const SOURCE_COLUMN: &str = "source";
pub const MESSAGE_COLUMN: &str = "log_message";
const OUTPUT_COLUMNS: [&str; 3] = ["target_label", "confidence", "error"];

/// Parsed input file
#[derive(Debug)]
pub struct InputTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    pub records: Vec<LogRecord>,
}

/// Read the input CSV
pub fn read_input(path: &Path) -> anyhow::Result<InputTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("Failed to open input {:?}", path))?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| anyhow!("Input {:?} has no '{}' column", path, name))
    };
    let source_idx = column(SOURCE_COLUMN)?;
    let message_idx = column(MESSAGE_COLUMN)?;

    let mut rows = Vec::new();
    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {} in {:?}", line + 2, path))?;
        records.push(LogRecord::new(
            row.get(source_idx).unwrap_or_default(),
            row.get(message_idx).unwrap_or_default(),
        ));
        rows.push(row);
    }

    Ok(InputTable {
        headers,
        rows,
        records,
    })
}

/// Write the input rows with their outcomes appended
pub fn write_output(path: &Path, input: &InputTable, outcomes: &[RecordOutcome]) -> anyhow::Result<()> {
    if input.rows.len() != outcomes.len() {
        return Err(anyhow!(
            "{} outcomes for {} input rows",
            outcomes.len(),
            input.rows.len()
        ));
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output {:?}", path))?;

    let mut headers = input.headers.clone();
    for column in OUTPUT_COLUMNS {
        headers.push_field(column);
    }
    writer.write_record(&headers)?;

    for (row, outcome) in input.rows.iter().zip(outcomes) {
        let mut out = row.clone();
        match outcome {
            Ok(result) => {
                out.push_field(&result.label);
                out.push_field(&format!("{:.4}", result.confidence));
                out.push_field("");
            }
            Err(failure) => {
                out.push_field("");
                out.push_field("");
                out.push_field(&failure.to_string());
            }
        }
        writer.write_record(&out)?;
    }

    writer.flush()?;
    Ok(())
}
