use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = "DevelopmentApplicationsScraper/1.0 (open data collector)";

/// A downloaded resource, decoded to text.
#[derive(Debug, Clone)]
pub struct Download {
    pub url: String,
    /// Body exactly as served; `content_hash` is computed over these bytes.
    pub raw: Vec<u8>,
    pub text: String,
    pub content_hash: String,
    pub size_bytes: usize,
}

/// Thin wrapper over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch a URL and return its body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(self.download(url).await?.text)
    }

    /// Fetch a URL, keeping the content hash alongside the decoded body.
    pub async fn download(&self, url: &str) -> Result<Download> {
        info!(url, "fetching");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .context("HTTP request failed")?;

        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        let content_hash = content_hash(&bytes);
        debug!(url, size = bytes.len(), hash = %content_hash, "downloaded");

        Ok(Download {
            url: url.to_string(),
            raw: bytes.to_vec(),
            text: decode_body(&bytes),
            content_hash,
            size_bytes: bytes.len(),
        })
    }
}

/// `sha256:<hex>` digest of a body.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// Decode a response body. A UTF-8 BOM is dropped; bytes that are not valid
/// UTF-8 are read as Windows-1252, which is what spreadsheet exports tend to emit.
pub fn decode_body(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}
