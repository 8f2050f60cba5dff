//! Parser Service - Scrapes development applications into SQLite
//!
//! Usage:
//!   # Crawl the catalog, sample CSVs and store their applications:
//!   cargo run --bin parser
//!
//!   # Reproducible sample, replacing existing rows:
//!   cargo run --bin parser -- --seed 7 --policy replace
//!
//!   # Parse a CSV already on disk:
//!   cargo run --bin parser -- --file data/raw/abc.csv --source-url https://...
//!
//!   # Extract and log without touching the database file:
//!   cargo run --bin parser -- --dry-run

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use collector::{build_selector, content_hash, decode_body, discover_csv_links, Fetcher};
use parser::{process_csv, store, Config, CsvReport, RowContext, UpsertPolicy};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "parser", about = "Scrapes development application CSVs into a local database")]
struct Args {
    /// Catalog page listing the dataset resources (overrides CATALOG_URL)
    #[arg(long)]
    catalog_url: Option<String>,

    /// CSS selector identifying resource links
    #[arg(long, default_value = collector::DEFAULT_RESOURCE_SELECTOR)]
    selector: String,

    /// SQLite database file (overrides DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Number of CSVs to process (overrides SAMPLE_SIZE)
    #[arg(long)]
    sample: Option<usize>,

    /// Seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Process the first listed CSVs instead of sampling
    #[arg(long, default_value = "false")]
    in_order: bool,

    /// Conflict policy for existing application numbers (overrides UPSERT_POLICY)
    #[arg(long, value_enum)]
    policy: Option<UpsertPolicy>,

    /// Parse this local CSV instead of crawling the catalog
    #[arg(long)]
    file: Option<PathBuf>,

    /// Provenance URL recorded for --file
    #[arg(long, requires = "file")]
    source_url: Option<String>,

    /// Dry run - use a throwaway in-memory database
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    sources: Vec<CsvReport>,
    failed_downloads: Vec<String>,
}

impl RunSummary {
    fn status(&self) -> &'static str {
        if self.failed_downloads.is_empty() {
            "ok"
        } else {
            "partial"
        }
    }

    fn total(&self, field: impl Fn(&CsvReport) -> usize) -> usize {
        self.sources.iter().map(field).sum()
    }
}

/// Audit rows are only written for live runs.
async fn open_run(pool: &SqlitePool, dry_run: bool, audit_url: &str) -> Result<Option<Uuid>> {
    if dry_run {
        return Ok(None);
    }
    Ok(Some(store::create_run(pool, audit_url).await?))
}

/// Record how the run ended. On a failed run the audit write is best effort,
/// so the run's own error is the one that surfaces.
async fn close_run(pool: &SqlitePool, run_id: Option<Uuid>, result: &Result<RunSummary>) -> Result<()> {
    let Some(run_id) = run_id else {
        return Ok(());
    };

    match result {
        Ok(summary) => {
            let detail = serde_json::to_value(summary)?;
            store::finish_run(pool, run_id, summary.status(), None, &detail).await?;
        }
        Err(e) => {
            let message = format!("{:#}", e);
            if let Err(audit_err) =
                store::finish_run(pool, run_id, "failed", Some(&message), &serde_json::json!({})).await
            {
                warn!("could not record failed run {}: {:#}", run_id, audit_err);
            }
        }
    }

    Ok(())
}

fn apply_args(mut config: Config, args: &Args) -> Config {
    if let Some(url) = &args.catalog_url {
        config.catalog_url = url.clone();
    }
    if let Some(path) = &args.db_path {
        config.db_path = path.clone();
    }
    if let Some(sample) = args.sample {
        config.sample_size = sample;
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    config
}

async fn parse_local_file(pool: &SqlitePool, config: &Config, args: &Args, path: &Path) -> Result<RunSummary> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let source_url = args
        .source_url
        .clone()
        .unwrap_or_else(|| path.display().to_string());

    let ctx = RowContext::new(&source_url, &config.comment_url, Local::now().date_naive())
        .with_separator(&config.address_separator);
    let mut report = process_csv(pool, config.policy, &decode_body(&bytes), &ctx).await?;
    report.content_hash = Some(content_hash(&bytes));

    Ok(RunSummary {
        sources: vec![report],
        failed_downloads: Vec::new(),
    })
}

async fn crawl(pool: &SqlitePool, config: &Config, args: &Args) -> Result<RunSummary> {
    let fetcher = Fetcher::new()?;
    let html = fetcher
        .fetch_text(&config.catalog_url)
        .await
        .context("Failed to fetch catalog page")?;
    let links = discover_csv_links(&html, &args.selector, &config.catalog_url)?;

    let mut summary = RunSummary::default();

    if links.is_empty() {
        info!(catalog = %config.catalog_url, "no CSV resources found, nothing to do");
        return Ok(summary);
    }
    info!(count = links.len(), "discovered CSV resources");

    let mut selector = build_selector(config.sample_size, args.in_order, args.seed);

    let scrape_date = Local::now().date_naive();

    for link in selector.select(&links) {
        let download = match fetcher.download(&link).await {
            Ok(d) => d,
            Err(e) => {
                warn!(url = %link, "download failed: {:#}", e);
                summary.failed_downloads.push(link);
                continue;
            }
        };

        info!(url = %link, bytes = download.size_bytes, "parsing");
        let ctx = RowContext::new(&link, &config.comment_url, scrape_date)
            .with_separator(&config.address_separator);
        let mut report = process_csv(pool, config.policy, &download.text, &ctx).await?;
        report.content_hash = Some(download.content_hash);
        summary.sources.push(report);
    }

    Ok(summary)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = apply_args(Config::from_env()?, &args);

    info!(
        mode = if args.dry_run { "dry-run" } else { "live" },
        policy = ?config.policy,
        "starting"
    );

    let pool = if args.dry_run {
        store::connect_in_memory().await?
    } else {
        store::connect(&config.db_path).await?
    };
    store::ensure_schema(&pool).await?;

    let audit_url = match &args.file {
        Some(path) => path.display().to_string(),
        None => config.catalog_url.clone(),
    };
    let run_id = open_run(&pool, args.dry_run, &audit_url).await?;

    let result = match &args.file {
        Some(path) => parse_local_file(&pool, &config, &args, path).await,
        None => crawl(&pool, &config, &args).await,
    };

    if let Err(e) = &result {
        error!("run failed: {:#}", e);
    }
    close_run(&pool, run_id, &result).await?;

    let summary = result?;
    let stored = store::count(&pool).await?;
    info!(
        sources = summary.sources.len(),
        skipped = summary.sources.iter().filter(|r| r.skipped).count(),
        failed_downloads = summary.failed_downloads.len(),
        inserted = summary.total(|r| r.inserted),
        existing = summary.total(|r| r.already_existing),
        replaced = summary.total(|r| r.replaced),
        dropped = summary.total(|r| r.dropped),
        stored,
        "run complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["parser"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_args_override_config() {
        let config = apply_args(
            Config::default(),
            &args(&["--db-path", "/tmp/x.sqlite", "--sample", "5", "--policy", "replace"]),
        );
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.sample_size, 5);
        assert_eq!(config.policy, UpsertPolicy::Replace);
    }

    #[test]
    fn test_no_args_keep_config() {
        let config = apply_args(Config::default(), &args(&[]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_source_url_requires_file() {
        assert!(Args::try_parse_from(["parser", "--source-url", "https://x"]).is_err());
    }

    #[test]
    fn test_run_status() {
        let mut summary = RunSummary::default();
        assert_eq!(summary.status(), "ok");
        summary.failed_downloads.push("https://example.org/a.csv".to_string());
        assert_eq!(summary.status(), "partial");
    }

    #[tokio::test]
    async fn test_parse_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("da.csv");
        std::fs::write(
            &path,
            "\u{feff}ApplicationNumber,PropertyAddress,PropertySuburbPostCode,ApplicationDesc,LodgementDate\n\
             DA123,1 Smith St,Adelaide 5000,New shed,1/02/2020 9:00:00 AM\n",
        )
        .unwrap();

        let pool = store::connect_in_memory().await.unwrap();
        store::ensure_schema(&pool).await.unwrap();
        let a = args(&["--file", path.to_str().unwrap(), "--source-url", "https://example.org/da.csv"]);

        let summary = parse_local_file(&pool, &Config::default(), &a, &path).await.unwrap();
        assert_eq!(summary.sources.len(), 1);
        assert_eq!(summary.sources[0].inserted, 1);
        assert!(summary.sources[0].content_hash.is_some());

        let row = store::find(&pool, "DA123").await.unwrap().unwrap();
        assert_eq!(row.info_url, "https://example.org/da.csv");
        assert_eq!(row.address, "1 Smith St Adelaide 5000");
    }

    async fn run_count(pool: &SqlitePool) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scrape_runs")
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    #[tokio::test]
    async fn test_dry_run_writes_no_audit_row() {
        let pool = store::connect_in_memory().await.unwrap();
        store::ensure_schema(&pool).await.unwrap();

        let run_id = open_run(&pool, true, "https://example.org/catalog").await.unwrap();
        assert!(run_id.is_none());
        close_run(&pool, run_id, &Ok(RunSummary::default())).await.unwrap();
        assert_eq!(run_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_live_run_is_audited() {
        let pool = store::connect_in_memory().await.unwrap();
        store::ensure_schema(&pool).await.unwrap();

        let run_id = open_run(&pool, false, "https://example.org/catalog").await.unwrap();
        assert!(run_id.is_some());
        close_run(&pool, run_id, &Ok(RunSummary::default())).await.unwrap();

        let (status,): (String,) = sqlx::query_as("SELECT status FROM scrape_runs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "ok");
    }

    #[tokio::test]
    async fn test_failed_audit_write_keeps_run_error() {
        // no schema, so the audit update itself fails
        let pool = store::connect_in_memory().await.unwrap();
        let result: Result<RunSummary> = Err(anyhow::anyhow!("disk full"));

        close_run(&pool, Some(Uuid::new_v4()), &result).await.unwrap();
        assert_eq!(result.unwrap_err().to_string(), "disk full");
    }
}
