//! Collector - retrieves open-data catalog pages and the CSV resources they list
//!
//! Responsibilities:
//! - Fetch resources from public URLs with a polite, identified client
//! - Decode response bodies into text (UTF-8, with a Windows-1252 fallback)
//! - Discover dataset resource links on a catalog page
//! - Choose a bounded sample of sources to process
//!
//! Nothing in here touches the database; the parser service owns storage.

pub mod catalog;
pub mod fetch;
pub mod select;

pub use catalog::{discover_csv_links, find_links, DEFAULT_RESOURCE_SELECTOR};
pub use fetch::{content_hash, decode_body, Download, Fetcher};
pub use select::{build_selector, FirstN, LatestPlusRandom, SourceSelector};
