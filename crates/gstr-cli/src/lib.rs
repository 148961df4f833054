//! # gstr-cli — Command-Line Interface for the Filing Engine
//!
//! ## Subcommands
//!
//! - `gstr map` — header mapping report and section suggestion.
//! - `gstr generate` — full filing from JSON rows, with processing summary.
//! - `gstr ranges` — document series audit.
//!
//! ```bash
//! gstr map --headers "Invoice No.,GSTIN of Recipient,Taxable Value"
//! gstr generate --input sales.json --returns returns.json \
//!     --filer-tax-id 27AAPFU0939F1ZV --period 042025 --out filing.json
//! gstr ranges --input numbers.txt
//! ```
//!
//! Exit code 0 is success and 2 an operational error. Exit code 1 means the
//! result needs attention: an unconfirmed mapping, a reconciliation failure
//! under `generate --strict`, or missing serials under `ranges --check`.

pub mod generate;
pub mod map;
pub mod ranges;

use std::path::Path;

use anyhow::{Context, Result};

use gstr_core::{FilingConfig, RawRow};

/// Load the configuration file, or the built-in defaults without one.
pub fn load_config(path: Option<&Path>) -> Result<FilingConfig> {
    match path {
        Some(path) => FilingConfig::load(path)
            .with_context(|| format!("failed to load configuration: {}", path.display())),
        None => Ok(FilingConfig::default()),
    }
}

/// Read a JSON array of row objects.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rows: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("expected a JSON array of objects: {}", path.display()))
}

/// Distinct column headers of `rows`, in order of first appearance.
pub fn headers_of(rows: &[RawRow]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for key in rows.iter().flat_map(|r| r.keys()) {
        if !headers.contains(key) {
            headers.push(key.clone());
        }
    }
    headers
}
