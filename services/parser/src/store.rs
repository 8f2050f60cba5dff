//! SQLite persistence for scraped applications and the run audit trail.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::record::DevelopmentApplication;

/// What to do when an application number is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UpsertPolicy {
    /// Keep the stored row untouched.
    #[default]
    InsertIfAbsent,
    /// Overwrite every non-key column, clearing the on-notice fields.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyExists,
    Replaced,
}

/// A row of the `data` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredRow {
    pub council_reference: String,
    pub address: String,
    pub description: String,
    pub info_url: String,
    pub comment_url: String,
    pub date_scraped: String,
    pub date_received: String,
    pub on_notice_from: Option<String>,
    pub on_notice_to: Option<String>,
}

/// Open (creating if needed) the database file. One connection: there is a
/// single writer and rows are written in order.
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

/// Throwaway database, used for dry runs and tests.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("Failed to open in-memory database")
}

pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data (
            council_reference TEXT PRIMARY KEY,
            address TEXT NOT NULL,
            description TEXT NOT NULL,
            info_url TEXT NOT NULL,
            comment_url TEXT NOT NULL,
            date_scraped TEXT NOT NULL,
            date_received TEXT NOT NULL,
            on_notice_from TEXT,
            on_notice_to TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create data table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scrape_runs (
            run_id TEXT PRIMARY KEY,
            catalog_url TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            status TEXT NOT NULL,
            error TEXT,
            detail TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create scrape_runs table")?;

    Ok(())
}

/// Store a record under `policy` and report what happened.
pub async fn upsert(
    pool: &SqlitePool,
    record: &DevelopmentApplication,
    policy: UpsertPolicy,
) -> Result<UpsertOutcome> {
    let outcome = match policy {
        UpsertPolicy::InsertIfAbsent => insert_if_absent(pool, record).await?,
        UpsertPolicy::Replace => replace(pool, record).await?,
    };

    match outcome {
        UpsertOutcome::Inserted => info!(
            "Saving new record: {}, {}, {}",
            record.application_number, record.address, record.description
        ),
        UpsertOutcome::AlreadyExists => info!(
            "Application already exists in the database: {}, {}, {}",
            record.application_number, record.address, record.description
        ),
        UpsertOutcome::Replaced => info!(
            "Replaced existing record: {}, {}, {}",
            record.application_number, record.address, record.description
        ),
    }

    Ok(outcome)
}

async fn insert_if_absent(pool: &SqlitePool, record: &DevelopmentApplication) -> Result<UpsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO data
        (council_reference, address, description, info_url, comment_url, date_scraped, date_received, on_notice_from, on_notice_to)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, NULL)
        ON CONFLICT (council_reference) DO NOTHING
        "#,
    )
    .bind(&record.application_number)
    .bind(&record.address)
    .bind(&record.description)
    .bind(&record.information_url)
    .bind(&record.comment_url)
    .bind(record.scrape_date.format("%Y-%m-%d").to_string())
    .bind(&record.received_date)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to insert application {}", record.application_number))?;

    Ok(if result.rows_affected() == 0 {
        UpsertOutcome::AlreadyExists
    } else {
        UpsertOutcome::Inserted
    })
}

async fn replace(pool: &SqlitePool, record: &DevelopmentApplication) -> Result<UpsertOutcome> {
    let existed = exists(pool, &record.application_number).await?;

    sqlx::query(
        r#"
        INSERT INTO data
        (council_reference, address, description, info_url, comment_url, date_scraped, date_received, on_notice_from, on_notice_to)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, NULL)
        ON CONFLICT (council_reference) DO UPDATE SET
            address = excluded.address,
            description = excluded.description,
            info_url = excluded.info_url,
            comment_url = excluded.comment_url,
            date_scraped = excluded.date_scraped,
            date_received = excluded.date_received,
            on_notice_from = NULL,
            on_notice_to = NULL
        "#,
    )
    .bind(&record.application_number)
    .bind(&record.address)
    .bind(&record.description)
    .bind(&record.information_url)
    .bind(&record.comment_url)
    .bind(record.scrape_date.format("%Y-%m-%d").to_string())
    .bind(&record.received_date)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to replace application {}", record.application_number))?;

    Ok(if existed {
        UpsertOutcome::Replaced
    } else {
        UpsertOutcome::Inserted
    })
}

async fn exists(pool: &SqlitePool, council_reference: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM data WHERE council_reference = $1")
        .bind(council_reference)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn find(pool: &SqlitePool, council_reference: &str) -> Result<Option<StoredRow>> {
    let row = sqlx::query_as::<_, StoredRow>(
        r#"
        SELECT council_reference, address, description, info_url, comment_url,
               date_scraped, date_received, on_notice_from, on_notice_to
        FROM data WHERE council_reference = $1
        "#,
    )
    .bind(council_reference)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM data")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

// =============================================================================
// Run audit - one row per scrape, mirrors what was collected and stored
// =============================================================================

/// Open an audit row for a run.
pub async fn create_run(pool: &SqlitePool, catalog_url: &str) -> Result<Uuid> {
    let run_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO scrape_runs (run_id, catalog_url, started_at, status, detail)
        VALUES ($1, $2, $3, 'running', '{}')
        "#,
    )
    .bind(run_id.to_string())
    .bind(catalog_url)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(run_id)
}

/// Close an audit row with its final status and per-source detail.
pub async fn finish_run(
    pool: &SqlitePool,
    run_id: Uuid,
    status: &str,
    error: Option<&str>,
    detail: &serde_json::Value,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE scrape_runs
        SET finished_at = $2, status = $3, error = $4, detail = $5
        WHERE run_id = $1
        "#,
    )
    .bind(run_id.to_string())
    .bind(Utc::now())
    .bind(status)
    .bind(error)
    .bind(detail.to_string())
    .execute(pool)
    .await?;
    Ok(())
}
