//! Parser - turns development-application CSVs into stored records
//!
//! Responsibilities:
//! - Map each file's header row to the columns we need, by exact name
//! - Extract and clean one record per data row
//! - Normalize lodgement dates and addresses
//! - Store records idempotently, keyed by application number
//!
//! Given the same file and scrape date the output is always the same; the
//! only nondeterminism in a run is which sources the collector samples.

pub mod address;
pub mod columns;
pub mod config;
pub mod dates;
pub mod pipeline;
pub mod record;
pub mod store;

pub use address::{combine_address, combine_address_with};
pub use columns::{locate_columns, HeaderMapping};
pub use config::Config;
pub use dates::normalize_date;
pub use pipeline::{process_csv, CsvReport};
pub use record::{extract_record, DevelopmentApplication, RowContext, NO_DESCRIPTION};
pub use store::{UpsertOutcome, UpsertPolicy};
