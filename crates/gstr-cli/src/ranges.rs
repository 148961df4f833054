//! # Ranges Subcommand
//!
//! Audits a list of document numbers for missing serials without running
//! the rest of the pipeline.
//!
//! Input is a text file with one document number per line. A line of the
//! form `series,number` groups the number under `series` (a document type,
//! a branch); numbers without a series share one group. Blank lines and
//! lines starting with `#` are ignored.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gstr_core::FilingConfig;
use gstr_filing::{detect, RangeLimits, RangeReport};

/// Arguments for the `gstr ranges` subcommand.
#[derive(Args, Debug)]
pub struct RangesArgs {
    /// File of document numbers.
    #[arg(long, short)]
    pub input: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Exit 1 when any serial is missing.
    #[arg(long)]
    pub check: bool,
}

/// Execute the ranges subcommand.
pub fn run_ranges(args: &RangesArgs, config: &FilingConfig) -> Result<u8> {
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let report = detect(parse_numbers(&content), &RangeLimits::from_config(config));

    tracing::info!(
        ranges = report.ranges.len(),
        missing = report.total_missing(),
        non_sequential = report.non_sequential_count,
        "ranges detected"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }

    if args.check && report.total_missing() > 0 {
        return Ok(1);
    }
    Ok(0)
}

/// `(series, number)` pairs from the input text.
pub fn parse_numbers(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| match l.split_once(',') {
            Some((series, number)) => (series.trim().to_string(), number.trim().to_string()),
            None => (String::new(), l.to_string()),
        })
        .collect()
}

/// Human-readable range report.
pub fn render(report: &RangeReport<String>) -> String {
    let mut out = String::new();
    for range in &report.ranges {
        let series = if range.key.is_empty() {
            String::new()
        } else {
            format!("[{}] ", range.key)
        };
        out.push_str(&format!(
            "{series}{} - {}: {} of {} present, {} missing\n",
            range.document_from,
            range.document_to,
            range.found_count,
            range.expected_count,
            range.missing_count
        ));
        if range.missing_count > 0 {
            out.push_str(&format!("  missing: {}\n", range.missing_display()));
        }
    }
    if report.non_sequential_count > 0 {
        out.push_str(&format!(
            "{} numbers without a serial:\n",
            report.non_sequential_count
        ));
        for entry in &report.non_sequential {
            out.push_str(&format!("  {}\n", entry.document_number));
        }
        let hidden = report.non_sequential_count - report.non_sequential.len();
        if hidden > 0 {
            out.push_str(&format!("  ... ({hidden} more)\n"));
        }
    }
    out
}
