//! # Generate Subcommand
//!
//! Runs the full pipeline over JSON row files and writes the filing
//! document. The processing summary and digest go to stderr so the filing
//! can be piped from stdout.
//!
//! A file whose header mapping falls below the confidence threshold stops
//! the run with exit code 1 until rerun with `--confirm-mapping`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use gstr_core::{FilerContext, FilingConfig, FilingPeriod, RawRow, TaxId};
use gstr_filing::{FilingAssembler, FilingDocument, FilingError, RuleBasedAdvisor, SourceBatch};
use gstr_ingest::{HeaderMatcher, SourceContext};

/// Arguments for the `gstr generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Sales rows: a JSON array of objects keyed by source header.
    #[arg(long, short)]
    pub input: PathBuf,

    /// Returns rows. Every row in this file is treated as a return.
    #[arg(long)]
    pub returns: Option<PathBuf>,

    /// The filer's 15-character tax id.
    #[arg(long)]
    pub filer_tax_id: String,

    /// Filing period as MMYYYY.
    #[arg(long)]
    pub period: String,

    /// Sales channel the rows came from.
    #[arg(long, default_value = "manual")]
    pub channel: String,

    /// Accept header mappings below the confidence threshold.
    #[arg(long)]
    pub confirm_mapping: bool,

    /// Attach rule-based insights to the filing.
    #[arg(long)]
    pub advise: bool,

    /// Exit 1 when any reconciliation check fails.
    #[arg(long)]
    pub strict: bool,

    /// Output path. Writes to stdout when omitted.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Execute the generate subcommand.
pub fn run_generate(args: &GenerateArgs, config: &FilingConfig) -> Result<u8> {
    let tax_id = TaxId::new(&args.filer_tax_id).context("invalid --filer-tax-id")?;
    let period = FilingPeriod::new(&args.period).context("invalid --period")?;
    let filer = FilerContext::new(tax_id, period).context("invalid filer")?;

    let context = SourceContext::new(args.channel.as_str());
    let mut batches = vec![load_batch(&args.input, context.clone(), args, config)?];
    if let Some(returns) = &args.returns {
        batches.push(load_batch(returns, context.with_returns_file(true), args, config)?);
    }

    let mut assembler = FilingAssembler::new(config, &filer);
    if args.advise {
        assembler = assembler.with_advisor(Arc::new(RuleBasedAdvisor));
    }

    let document = match assembler.assemble(&batches) {
        Ok(document) => document,
        Err(FilingError::LowConfidenceMapping {
            source_name,
            confidence,
            threshold,
        }) => {
            eprintln!(
                "{source_name}: header mapping confidence {confidence:.3} is below {threshold:.2}"
            );
            if let Some(batch) = batches.iter().find(|b| b.name == source_name) {
                eprint!("{}", crate::map::render(&batch.mapping, config));
            }
            return Ok(1);
        }
        Err(e) => return Err(e).context("filing generation failed"),
    };

    write_document(&document, args.out.as_deref())?;
    eprint!("{}", document.body.summary);
    eprintln!("digest: {}", document.digest);

    if args.strict && !document.body.reconciliation.overall_pass {
        return Ok(1);
    }
    Ok(0)
}

fn load_batch(
    path: &Path,
    context: SourceContext,
    args: &GenerateArgs,
    config: &FilingConfig,
) -> Result<SourceBatch> {
    let rows: Vec<RawRow> = crate::read_rows(path)?;
    let headers = crate::headers_of(&rows);
    let mut mapping = HeaderMatcher::from_config(config).map_headers(&headers);
    if args.confirm_mapping {
        mapping = mapping.confirm();
    }
    tracing::info!(
        source = %path.display(),
        rows = rows.len(),
        confidence = mapping.overall_confidence,
        "source loaded"
    );
    Ok(SourceBatch::new(path.display().to_string(), rows, mapping, context))
}

fn write_document(document: &FilingDocument, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(document).context("failed to serialize filing")?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, json + "\n")
                .with_context(|| format!("failed to write filing: {}", path.display()))?;
            tracing::info!(path = %path.display(), "filing written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const SALES: &str = r#"[
        {"Invoice Number": "INV001", "GSTIN of Recipient": "29ABCDE1234F1Z5",
         "Taxable Value": "10,000", "Rate": 18, "Place Of Supply": "Karnataka", "HSN": "6109"},
        {"Invoice Number": "INV002", "GSTIN of Recipient": "",
         "Taxable Value": 500, "Rate": "5%", "Place Of Supply": "27", "HSN": "6109"}
    ]"#;

    fn args(dir: &Path, input: &str) -> GenerateArgs {
        let path = dir.join("sales.json");
        std::fs::write(&path, input).unwrap();
        GenerateArgs {
            input: path,
            returns: None,
            filer_tax_id: "27AAPFU0939F1ZV".to_string(),
            period: "042025".to_string(),
            channel: "manual".to_string(),
            confirm_mapping: false,
            advise: false,
            strict: false,
            out: Some(dir.join("out").join("filing.json")),
        }
    }

    fn written(args: &GenerateArgs) -> Value {
        let content = std::fs::read_to_string(args.out.as_ref().unwrap()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn writes_filing_json() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), SALES);
        assert_eq!(run_generate(&args, &FilingConfig::default()).unwrap(), 0);

        let json = written(&args);
        assert_eq!(json["header"]["period"], "042025");
        assert_eq!(json["summary"]["lines_classified"], 2);
        assert!(json["b2b"]["groups"].as_array().is_some_and(|g| g.len() == 1));
        assert!(json.get("insights").is_none());
    }

    #[test]
    fn returns_file_produces_notes() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), SALES);
        let returns = dir.path().join("returns.json");
        std::fs::write(
            &returns,
            r#"[{"Invoice Number": "CN001", "Document Type": "Credit Note",
                 "GSTIN of Recipient": "29ABCDE1234F1Z5", "Taxable Value": 1000,
                 "Rate": 18, "Place Of Supply": "29"}]"#,
        )
        .unwrap();
        args.returns = Some(returns);
        assert_eq!(run_generate(&args, &FilingConfig::default()).unwrap(), 0);
        assert_eq!(written(&args)["summary"]["lines_per_section"]["cdnr"], 1);
    }

    #[test]
    fn unconfirmed_low_confidence_mapping_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), r#"[{"Zzyzx": 1}]"#);
        assert_eq!(run_generate(&args, &FilingConfig::default()).unwrap(), 1);
        assert!(!args.out.as_ref().unwrap().exists());

        args.confirm_mapping = true;
        assert_eq!(run_generate(&args, &FilingConfig::default()).unwrap(), 0);
    }

    #[test]
    fn advise_attaches_insights() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), SALES);
        args.advise = true;
        assert_eq!(run_generate(&args, &FilingConfig::default()).unwrap(), 0);
        assert!(written(&args)["insights"]["compliance_score"].is_u64());
    }

    #[test]
    fn invalid_filer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), SALES);
        args.filer_tax_id = "NOTATAXID".to_string();
        let err = run_generate(&args, &FilingConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid --filer-tax-id"));
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), SALES);
        args.input = dir.path().join("absent.json");
        assert!(run_generate(&args, &FilingConfig::default()).is_err());
    }
}
