use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::columns::locate_columns;
use crate::record::{extract_record, RowContext};
use crate::store::{self, UpsertOutcome, UpsertPolicy};

/// What happened to one CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvReport {
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Mandatory columns were missing, nothing was read.
    pub skipped: bool,
    pub rows: usize,
    pub inserted: usize,
    pub already_existing: usize,
    pub replaced: usize,
    /// Rows without an application number or address.
    pub dropped: usize,
}

impl CsvReport {
    fn new(source_url: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            ..Self::default()
        }
    }
}

/// Read one CSV and store every complete row, in file order.
///
/// A file without the application number column, or without either address
/// column, is skipped. Storage errors abort the file and are returned.
pub async fn process_csv(
    pool: &SqlitePool,
    policy: UpsertPolicy,
    text: &str,
    ctx: &RowContext,
) -> Result<CsvReport> {
    let mut report = CsvReport::new(&ctx.source_url);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(result) => result.with_context(|| format!("Failed to read header of {}", ctx.source_url))?,
        None => {
            warn!(url = %ctx.source_url, "empty CSV, skipping");
            report.skipped = true;
            return Ok(report);
        }
    };

    let header: Vec<&str> = header.iter().collect();
    let mapping = locate_columns(&header);
    debug!(?mapping, "column mapping");

    if !mapping.has_mandatory() {
        warn!(
            url = %ctx.source_url,
            ?header,
            "missing ApplicationNumber or address columns, skipping CSV"
        );
        report.skipped = true;
        return Ok(report);
    }

    for (line_idx, result) in records.enumerate() {
        let line_num = line_idx + 2; // header is line 1
        let row = result.with_context(|| format!("Failed to read line {} of {}", line_num, ctx.source_url))?;
        let cells: Vec<&str> = row.iter().collect();
        report.rows += 1;

        let Some(record) = extract_record(&mapping, &cells, ctx) else {
            report.dropped += 1;
            continue;
        };

        match store::upsert(pool, &record, policy).await? {
            UpsertOutcome::Inserted => report.inserted += 1,
            UpsertOutcome::AlreadyExists => report.already_existing += 1,
            UpsertOutcome::Replaced => report.replaced += 1,
        }
    }

    info!(
        url = %ctx.source_url,
        rows = report.rows,
        inserted = report.inserted,
        existing = report.already_existing,
        replaced = report.replaced,
        dropped = report.dropped,
        "finished CSV"
    );

    Ok(report)
}
