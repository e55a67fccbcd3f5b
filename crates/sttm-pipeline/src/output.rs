//! Output sinks
//!
//! Transformed records are written either as JSON (one array, or one object
//! per line) or as CSV with one file per destination table.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use sttm_mapping::TransformedRecord;
use tracing::{debug, info, trace};

use crate::batch::TransformedItem;
use crate::{Error, Result};

/// Output format for transformed records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// A single JSON array of `{record, tables}` objects
    #[default]
    Json,
    /// One `{record, tables}` object per line
    JsonLines,
    /// One CSV file per destination table
    Csv,
}

impl OutputFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonLines => "jsonl",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "json-lines" | "ndjson" => Ok(Self::JsonLines),
            "csv" => Ok(Self::Csv),
            other => Err(Error::Output(format!("unknown output format '{other}'"))),
        }
    }
}

/// Write items as one pretty-printed JSON array
pub fn write_json<W: Write>(mut writer: W, items: &[TransformedItem]) -> Result<()> {
    let outputs: Vec<_> = items.iter().map(|item| &item.output).collect();
    serde_json::to_writer_pretty(&mut writer, &outputs)
        .map_err(|e| Error::Output(e.to_string()))?;
    writeln!(writer)?;
    writer.flush()?;
    debug!(record_count = items.len(), "Finished writing JSON");
    Ok(())
}

/// Write items as JSON lines
pub fn write_json_lines<W: Write>(mut writer: W, items: &[TransformedItem]) -> Result<()> {
    for item in items {
        serde_json::to_writer(&mut writer, &item.output)
            .map_err(|e| Error::Output(e.to_string()))?;
        writeln!(writer)?;
    }
    writer.flush()?;
    debug!(record_count = items.len(), "Finished writing JSON lines");
    Ok(())
}

/// Group the rows of every item by destination table, tables in first-seen
/// order and rows in item order
pub fn group_by_table(items: &[TransformedItem]) -> Vec<(String, Vec<TransformedRecord>)> {
    let mut groups: Vec<(String, Vec<TransformedRecord>)> = Vec::new();
    for row in items.iter().flat_map(|item| item.output.table_rows()) {
        match groups.iter_mut().find(|(table, _)| *table == row.table) {
            Some((_, rows)) => rows.push(row.fields),
            None => groups.push((row.table, vec![row.fields])),
        }
    }
    groups
}

/// Writes table rows as CSV
#[derive(Debug, Clone)]
pub struct CsvTableWriter {
    delimiter: u8,
}

impl CsvTableWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set delimiter character
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write one table. The header is the union of all row keys in
    /// first-seen order; a row without a column gets an empty cell.
    pub fn write_table<W: Write>(&self, writer: W, rows: &[TransformedRecord]) -> Result<()> {
        let headers = collect_headers(rows);
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        csv_writer.write_record(&headers)?;
        for row in rows {
            let cells: Vec<String> = headers
                .iter()
                .map(|header| row.get(header).map(|v| v.to_text()).unwrap_or_default())
                .collect();
            csv_writer.write_record(&cells)?;
            trace!(?cells, "Wrote CSV row");
        }

        csv_writer.flush()?;
        debug!(row_count = rows.len(), "Finished writing CSV table");
        Ok(())
    }

    /// Write every table of the items to `<dir>/<table>.csv`, creating the
    /// directory if needed. Returns the written paths in table order.
    pub fn write_tables(&self, dir: &Path, items: &[TransformedItem]) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::io("create output directory", dir.display().to_string(), e.to_string())
        })?;

        let mut written = Vec::new();
        for (table, rows) in group_by_table(items) {
            let path = dir.join(table_file_name(&table)?);
            let file = File::create(&path)
                .map_err(|e| Error::io("create", path.display().to_string(), e.to_string()))?;
            self.write_table(BufWriter::new(file), &rows)?;
            info!(table = %table, rows = rows.len(), path = %path.display(), "Wrote table");
            written.push(path);
        }
        Ok(written)
    }
}

impl Default for CsvTableWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// File name for a table, rejecting names that would leave the output
/// directory
fn table_file_name(table: &str) -> Result<String> {
    let unsafe_name = table.is_empty()
        || table == "."
        || table == ".."
        || table.contains(['/', '\\', '\0'])
        || Path::new(table).is_absolute();
    if unsafe_name {
        return Err(Error::Output(format!(
            "table name '{table}' cannot be used as a file name"
        )));
    }
    Ok(format!("{table}.csv"))
}

fn collect_headers(rows: &[TransformedRecord]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for key in rows.iter().flat_map(|row| row.keys()) {
        if !headers.iter().any(|h| h == key) {
            headers.push(key.to_string());
        }
    }
    headers
}
