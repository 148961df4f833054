//! # Map Subcommand
//!
//! Shows how a file's column headers resolve onto canonical fields, the
//! overall confidence, and which section the file most plausibly feeds.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use gstr_core::FilingConfig;
use gstr_filing::suggest_section;
use gstr_ingest::{HeaderMatcher, MappingReport};

/// Arguments for the `gstr map` subcommand.
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Comma-separated headers.
    #[arg(long, value_delimiter = ',')]
    pub headers: Vec<String>,

    /// Take headers from a JSON rows file instead.
    #[arg(long, conflicts_with = "headers")]
    pub input: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the map subcommand.
///
/// Returns 1 when the mapping needs confirmation before generation.
pub fn run_map(args: &MapArgs, config: &FilingConfig) -> Result<u8> {
    let headers = match &args.input {
        Some(path) => crate::headers_of(&crate::read_rows(path)?),
        None => args.headers.iter().map(|h| h.trim().to_string()).collect(),
    };
    if headers.is_empty() {
        bail!("no headers given; pass --headers or --input");
    }

    let report = HeaderMatcher::from_config(config).map_headers(&headers);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report, config));
    }
    Ok(u8::from(report.requires_confirmation()))
}

/// Human-readable mapping report.
pub fn render(report: &MappingReport, config: &FilingConfig) -> String {
    let mut out = String::new();
    for m in &report.mappings {
        out.push_str(&format!(
            "  {:<32} -> {:<28} {:.2} {}\n",
            m.source_header, m.canonical_field, m.confidence, m.match_kind
        ));
    }
    for header in &report.unmapped {
        out.push_str(&format!("  {header:<32} -> (unmapped)\n"));
    }
    out.push_str(&format!(
        "overall confidence {:.3} (threshold {:.2})\n",
        report.overall_confidence, report.threshold
    ));
    if report.requires_confirmation() {
        out.push_str("mapping needs confirmation: rerun generate with --confirm-mapping\n");
    }
    match suggest_section(report, config.section_suggestion_coverage) {
        Some(section) => out.push_str(&format!(
            "suggested section: {section} ({})\n",
            section.description()
        )),
        None => out.push_str("suggested section: none\n"),
    }
    out
}
