/// CSV and JSON export of transaction history.
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use csv::Writer;
use serde::Serialize;

use crate::display::{format_date, wei_to_eth};
use crate::state::TransactionRecord;

pub const CSV_HEADER: &str = "Date,From,To,Amount (ETH),Message,Keyword";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown export format '{other}'. Use 'csv' or 'json'.")),
        }
    }
}

#[derive(Serialize)]
struct ExportedTransaction<'a> {
    date: String,
    from: &'a str,
    to: &'a str,
    amount: String,
    message: &'a str,
    keyword: &'a str,
}

/// CSV with a header row, fields quoted where needed. Empty input yields an
/// empty string.
pub fn transactions_to_csv(records: &[TransactionRecord]) -> Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER.split(','))?;
    for tx in records {
        writer.write_record(&[
            format_date(tx.timestamp),
            tx.from.clone(),
            tx.to.clone(),
            wei_to_eth(tx.amount_wei),
            tx.message.clone(),
            tx.keyword.clone(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Pretty-printed JSON array.
pub fn transactions_to_json(records: &[TransactionRecord]) -> Result<String> {
    let items: Vec<ExportedTransaction<'_>> = records
        .iter()
        .map(|tx| ExportedTransaction {
            date: format_date(tx.timestamp),
            from: &tx.from,
            to: &tx.to,
            amount: format!("{} ETH", wei_to_eth(tx.amount_wei)),
            message: &tx.message,
            keyword: &tx.keyword,
        })
        .collect();
    serde_json::to_string_pretty(&items).context("Failed to serialize transactions")
}

/// Write `<prefix>_<YYYY-MM-DD>.<ext>` into `dir`, dated today (UTC).
/// Returns `Ok(None)` when there is nothing to export.
pub fn export_to_file(
    records: &[TransactionRecord],
    dir: &Path,
    prefix: &str,
    format: ExportFormat,
) -> Result<Option<PathBuf>> {
    export_dated(records, dir, prefix, format, Utc::now().date_naive())
}

fn export_dated(
    records: &[TransactionRecord],
    dir: &Path,
    prefix: &str,
    format: ExportFormat,
    date: NaiveDate,
) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        log::warn!("no transactions to export");
        return Ok(None);
    }
    let content = match format {
        ExportFormat::Csv => transactions_to_csv(records)?,
        ExportFormat::Json => transactions_to_json(records)?,
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(format!(
        "{prefix}_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    ));
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("exported {} transactions to {}", records.len(), path.display());
    Ok(Some(path))
}
