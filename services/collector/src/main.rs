//! Collector Service - Lists and downloads the CSV resources of a catalog page
//!
//! Usage:
//!   # List the CSV resources the catalog currently publishes:
//!   cargo run --bin collector -- --catalog-url https://...
//!
//!   # Download a sample of them into the raw directory:
//!   cargo run --bin collector -- --sample 2 --save

use anyhow::{Context, Result};
use clap::Parser;
use collector::{build_selector, discover_csv_links, Download, Fetcher};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CATALOG_URL: &str = "https://data.sa.gov.au/data/dataset/development-applications";

#[derive(Parser, Debug)]
#[command(name = "collector", about = "Discovers and downloads CSV resources from an open-data catalog")]
struct Args {
    /// Catalog page listing the dataset resources
    #[arg(long)]
    catalog_url: Option<String>,

    /// CSS selector identifying resource links
    #[arg(long, default_value = collector::DEFAULT_RESOURCE_SELECTOR)]
    selector: String,

    /// Number of CSVs to sample (the latest is always included)
    #[arg(long, default_value = "2")]
    sample: usize,

    /// Seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Take the first listed CSVs instead of sampling
    #[arg(long, default_value = "false")]
    in_order: bool,

    /// Download the sampled CSVs into RAW_FS_DIR
    #[arg(long, default_value = "false")]
    save: bool,
}

#[derive(Debug, Clone)]
struct Config {
    catalog_url: String,
    raw_fs_dir: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        Self {
            catalog_url: std::env::var("CATALOG_URL").unwrap_or_else(|_| DEFAULT_CATALOG_URL.to_string()),
            raw_fs_dir: PathBuf::from(std::env::var("RAW_FS_DIR").unwrap_or_else(|_| "./data/raw".to_string())),
        }
    }
}

/// Save a downloaded body, undecoded, under its content hash.
async fn save_to_fs(dir: &Path, download: &Download) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let digest = download.content_hash.trim_start_matches("sha256:");
    let path = dir.join(format!("{}.csv", digest));
    fs::write(&path, &download.raw).await?;

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    let catalog_url = args.catalog_url.unwrap_or(config.catalog_url);

    let fetcher = Fetcher::new()?;
    let html = fetcher.fetch_text(&catalog_url).await?;
    let links = discover_csv_links(&html, &args.selector, &catalog_url)?;

    if links.is_empty() {
        info!(catalog = %catalog_url, "no CSV resources found");
        return Ok(());
    }

    info!(count = links.len(), "discovered CSV resources");
    for link in &links {
        info!("  {}", link);
    }

    let mut selector = build_selector(args.sample, args.in_order, args.seed);
    let picked = selector.select(&links);
    info!(count = picked.len(), "sampled sources");

    if !args.save {
        for link in &picked {
            info!("  would collect {}", link);
        }
        return Ok(());
    }

    for link in &picked {
        let download = fetcher.download(link).await?;
        let path = save_to_fs(&config.raw_fs_dir, &download).await?;
        info!(
            url = %download.url,
            bytes = download.size_bytes,
            hash = %download.content_hash,
            path = %path.display(),
            "saved"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector::{content_hash, decode_body};

    fn download(body: &[u8]) -> Download {
        Download {
            url: "https://example.org/da.csv".to_string(),
            raw: body.to_vec(),
            text: decode_body(body),
            content_hash: content_hash(body),
            size_bytes: body.len(),
        }
    }

    #[tokio::test]
    async fn test_save_to_fs_names_file_by_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_to_fs(dir.path(), &download(b"ApplicationNumber\nDA1\n")).await.unwrap();

        let digest = content_hash(b"ApplicationNumber\nDA1\n");
        let expected = format!("{}.csv", digest.trim_start_matches("sha256:"));
        assert_eq!(path, dir.path().join(expected));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "ApplicationNumber\nDA1\n");
    }

    #[tokio::test]
    async fn test_save_to_fs_keeps_undecoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        // BOM plus a Windows-1252 byte: decoding would change both
        let body = b"\xEF\xBB\xBFApplicationNumber\nDA1 Caf\xE9\n";
        let path = save_to_fs(dir.path(), &download(body)).await.unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, body.to_vec());

        let name = path.file_stem().unwrap().to_str().unwrap();
        assert_eq!(content_hash(&on_disk), format!("sha256:{}", name));
    }
}
