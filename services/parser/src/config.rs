use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;

use crate::store::UpsertPolicy;

pub const DEFAULT_CATALOG_URL: &str = "https://data.sa.gov.au/data/dataset/development-applications";
pub const DEFAULT_COMMENT_URL: &str = "https://www.playford.sa.gov.au/contact-us";
pub const DEFAULT_DB_PATH: &str = "data.sqlite";
pub const DEFAULT_SAMPLE_SIZE: usize = 2;

/// Settings read from the environment (and `.env`), overridable on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub catalog_url: String,
    pub comment_url: String,
    pub sample_size: usize,
    pub policy: UpsertPolicy,
    pub address_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            comment_url: DEFAULT_COMMENT_URL.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            policy: UpsertPolicy::default(),
            address_separator: crate::address::DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let sample_size = match lookup("SAMPLE_SIZE") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("SAMPLE_SIZE must be a number, got '{}'", v))?,
            None => defaults.sample_size,
        };

        let policy = match lookup("UPSERT_POLICY") {
            Some(v) => UpsertPolicy::from_str(v.trim(), true)
                .map_err(|e| anyhow!("Invalid UPSERT_POLICY '{}': {}", v, e))?,
            None => defaults.policy,
        };

        Ok(Self {
            db_path: lookup("DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            catalog_url: lookup("CATALOG_URL").unwrap_or(defaults.catalog_url),
            comment_url: lookup("COMMENT_URL").unwrap_or(defaults.comment_url),
            sample_size,
            policy,
            address_separator: lookup("ADDRESS_SEPARATOR").unwrap_or(defaults.address_separator),
        })
    }
}
