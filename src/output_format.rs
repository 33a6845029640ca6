// src/output_format.rs
//! Dataset and diagnostics writers: CSV for delimited storage, JSON Lines
//! for stream consumers.

use std::io::Write;

use crate::error::ProcessingError;
use crate::record::{Dataset, Diagnostics, ParsedRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[value(name = "csv", help = "Comma-separated values with a header row")]
    Csv,
    #[value(name = "jsonl", help = "JSON Lines format (one record per line)")]
    Jsonl,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Csv
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "jsonl" => Ok(OutputFormat::Jsonl),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

pub fn write_dataset<W: Write>(
    dataset: &Dataset,
    format: OutputFormat,
    out: W,
) -> Result<(), ProcessingError> {
    match format {
        OutputFormat::Csv => write_csv(dataset, out),
        OutputFormat::Jsonl => write_jsonl(dataset, out),
    }
}

fn write_csv<W: Write>(dataset: &Dataset, out: W) -> Result<(), ProcessingError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(Dataset::schema().iter().map(|(name, _)| *name))?;
    for record in dataset.iter() {
        writer.write_record(&csv_row(record))?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_row(record: &ParsedRecord) -> [String; 9] {
    [
        record.row_id.to_string(),
        record.original_log.clone(),
        record
            .datetime
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        record.user_id.clone().unwrap_or_default(),
        record.transaction_type.clone().unwrap_or_default(),
        record.amount.map(|a| a.to_string()).unwrap_or_default(),
        record.currency.as_str().to_string(),
        record.location.clone(),
        record.device.clone(),
    ]
}

fn write_jsonl<W: Write>(dataset: &Dataset, mut out: W) -> Result<(), ProcessingError> {
    for record in dataset.iter() {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Writes the diagnostics report as pretty-printed JSON.
pub fn write_diagnostics<W: Write>(
    diagnostics: &Diagnostics,
    mut out: W,
) -> Result<(), ProcessingError> {
    serde_json::to_writer_pretty(&mut out, diagnostics)?;
    out.write_all(b"\n")?;
    Ok(())
}
