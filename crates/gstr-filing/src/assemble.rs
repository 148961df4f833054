//! # Filing Assembler
//!
//! Runs the deterministic pipeline over one filer's source batches and
//! produces the filing document:
//!
//! ```text
//! mapping gate → normalize → document pre-pass → classify → aggregate
//!   → derived tables → reconcile → summary → digest → advisory (optional)
//! ```
//!
//! The digest covers the [`FilingBody`] only. Advisory insights are attached
//! afterwards, so the body and its digest are identical whether or not an
//! advisor ran, timed out, or failed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use gstr_core::{
    CanonicalInvoiceLine, FilerContext, FilingConfig, FilingDigest, FilingPeriod,
    JurisdictionCode, RawRow, Section, TaxId,
};
use gstr_ingest::{MappingReport, Normalizer, RejectedRow, SourceContext};

use crate::advisory::{run_advisor, Advisor, Insights};
use crate::aggregate::{Amounts, FilingTables};
use crate::classify::classify_lines;
use crate::error::FilingError;
use crate::reconcile::{reconcile, ReconciliationReport};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Rows from one source file with their resolved header mapping.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    /// Label used in errors and logs, usually the file name.
    pub name: String,
    pub rows: Vec<RawRow>,
    pub mapping: MappingReport,
    pub context: SourceContext,
}

impl SourceBatch {
    pub fn new(
        name: impl Into<String>,
        rows: Vec<RawRow>,
        mapping: MappingReport,
        context: SourceContext,
    ) -> Self {
        Self {
            name: name.into(),
            rows,
            mapping,
            context,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Filer identity block at the top of the filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingHeader {
    pub tax_id: TaxId,
    pub period: FilingPeriod,
    pub jurisdiction: JurisdictionCode,
    pub schema_version: String,
}

/// What happened to the input, for the human filer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    pub rows_in: usize,
    pub lines_classified: usize,
    pub rows_rejected: usize,
    pub rejected: Vec<RejectedRow>,
    pub lines_per_section: BTreeMap<Section, usize>,
    /// Lines whose place of supply fell back to the filer's jurisdiction.
    pub jurisdiction_inferred: usize,
    pub totals: Amounts,
    pub reconciliation_warnings: Vec<String>,
}

impl ProcessingSummary {
    fn build(
        rows_in: usize,
        lines: &[CanonicalInvoiceLine],
        rejected: Vec<RejectedRow>,
        reconciliation: &ReconciliationReport,
    ) -> Self {
        let mut lines_per_section = BTreeMap::new();
        for section in lines.iter().filter_map(|l| l.section) {
            *lines_per_section.entry(section).or_insert(0) += 1;
        }
        Self {
            rows_in,
            lines_classified: lines.iter().filter(|l| l.section.is_some()).count(),
            rows_rejected: rejected.len(),
            rejected,
            lines_per_section,
            jurisdiction_inferred: lines
                .iter()
                .filter(|l| l.provenance.jurisdiction_inferred)
                .count(),
            totals: lines.iter().map(Amounts::of_line).sum::<Amounts>().rounded(),
            reconciliation_warnings: reconciliation.warnings.clone(),
        }
    }
}

impl std::fmt::Display for ProcessingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "rows in:            {}", self.rows_in)?;
        writeln!(f, "lines classified:   {}", self.lines_classified)?;
        writeln!(f, "rows rejected:      {}", self.rows_rejected)?;
        for r in &self.rejected {
            writeln!(
                f,
                "  row {} ({}){}: {}",
                r.row_index,
                r.origin_channel,
                r.document_number
                    .as_deref()
                    .map(|n| format!(" {n}"))
                    .unwrap_or_default(),
                r.reason
            )?;
        }
        for (section, count) in &self.lines_per_section {
            writeln!(f, "  {:<6} {count} lines", section.as_str())?;
        }
        if self.jurisdiction_inferred > 0 {
            writeln!(
                f,
                "place of supply inferred for {} lines",
                self.jurisdiction_inferred
            )?;
        }
        writeln!(
            f,
            "taxable value {}  tax {}  cess {}",
            self.totals.taxable_value,
            self.totals.total_tax(),
            self.totals.cess_amount
        )?;
        for w in &self.reconciliation_warnings {
            writeln!(f, "warning: {w}")?;
        }
        Ok(())
    }
}

/// The deterministic part of a filing. Contains no floating-point values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilingBody {
    pub header: FilingHeader,
    #[serde(flatten)]
    pub tables: FilingTables,
    /// Non-authoritative; must be shown to the filer before submission.
    pub reconciliation: ReconciliationReport,
    pub summary: ProcessingSummary,
}

/// A complete filing: body, its digest, and optional advisory insights.
#[derive(Debug, Clone, Serialize)]
pub struct FilingDocument {
    #[serde(flatten)]
    pub body: FilingBody,
    pub digest: FilingDigest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Builds filings for one filer under one configuration.
pub struct FilingAssembler<'a> {
    config: &'a FilingConfig,
    filer: &'a FilerContext,
    advisor: Option<Arc<dyn Advisor>>,
}

impl std::fmt::Debug for FilingAssembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilingAssembler")
            .field("filer", &self.filer.tax_id)
            .field("period", &self.filer.period)
            .field("advisor", &self.advisor.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}

impl<'a> FilingAssembler<'a> {
    pub fn new(config: &'a FilingConfig, filer: &'a FilerContext) -> Self {
        Self {
            config,
            filer,
            advisor: None,
        }
    }

    /// Attach an advisor that runs after the deterministic pipeline.
    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Normalize and assemble every batch into one filing.
    ///
    /// Fails before any processing when a batch's header mapping needs
    /// confirmation. Rejected rows are reported in the summary.
    pub fn assemble(&self, batches: &[SourceBatch]) -> Result<FilingDocument, FilingError> {
        if let Some(batch) = batches.iter().find(|b| b.mapping.requires_confirmation()) {
            return Err(FilingError::LowConfidenceMapping {
                source_name: batch.name.clone(),
                confidence: batch.mapping.overall_confidence,
                threshold: batch.mapping.threshold,
            });
        }

        let normalizer = Normalizer::new(self.config, self.filer);
        let mut lines = Vec::new();
        let mut rejected = Vec::new();
        let mut rows_in = 0;
        for batch in batches {
            rows_in += batch.rows.len();
            let normalized =
                normalizer.normalize_batch(&batch.rows, &batch.mapping.mappings, &batch.context);
            tracing::debug!(
                source = %batch.name,
                lines = normalized.lines.len(),
                rejected = normalized.rejected.len(),
                "source normalized"
            );
            lines.extend(normalized.lines);
            rejected.extend(normalized.rejected);
        }

        self.assemble_lines(lines, rejected, rows_in)
    }

    /// Assemble a filing from already-normalized lines.
    pub fn assemble_lines(
        &self,
        lines: Vec<CanonicalInvoiceLine>,
        rejected: Vec<RejectedRow>,
        rows_in: usize,
    ) -> Result<FilingDocument, FilingError> {
        for line in &lines {
            let untaxed_export = line.flags.is_export && !line.flags.export_with_payment;
            if !untaxed_export {
                line.computed_tax
                    .check_invariant(line.taxable_value, line.tax_rate_percent)?;
            }
        }

        let lines = classify_lines(self.config, lines);
        let tables = FilingTables::build(&lines, self.config);
        let reconciliation = reconcile(&tables, self.config.reconciliation_tolerance);
        let summary = ProcessingSummary::build(rows_in, &lines, rejected, &reconciliation);

        let body = FilingBody {
            header: FilingHeader {
                tax_id: self.filer.tax_id.clone(),
                period: self.filer.period.clone(),
                jurisdiction: self.filer.jurisdiction.clone(),
                schema_version: self.config.schema_version.clone(),
            },
            tables,
            reconciliation,
            summary,
        };
        let digest = FilingDigest::compute(&body)?;

        tracing::info!(
            filer = %self.filer.tax_id,
            period = %self.filer.period,
            rows_in = body.summary.rows_in,
            lines = body.summary.lines_classified,
            rejected = body.summary.rows_rejected,
            reconciled = body.reconciliation.overall_pass,
            digest = %digest,
            "filing assembled"
        );

        let (body, insights) = match &self.advisor {
            Some(advisor) => {
                let shared = Arc::new(body);
                let insights = run_advisor(
                    Arc::clone(advisor),
                    Arc::clone(&shared),
                    Duration::from_millis(self.config.advisory_timeout_ms),
                );
                // A timed-out advisor thread may still hold the body.
                let body = Arc::try_unwrap(shared).unwrap_or_else(|arc| {
                    tracing::debug!("advisor still running; copying filing body");
                    (*arc).clone()
                });
                (body, insights)
            }
            None => (body, None),
        };

        Ok(FilingDocument {
            body,
            digest,
            insights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{d, line};
    use gstr_core::money::split_tax;
    use gstr_ingest::HeaderMatcher;
    use serde_json::{json, Value};

    fn filer() -> FilerContext {
        FilerContext::new(
            TaxId::new("27AAPFU0939F1ZV").unwrap(),
            FilingPeriod::new("042025").unwrap(),
        )
        .unwrap()
    }

    fn row(pairs: &[(&str, Value)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn batch(rows: Vec<RawRow>) -> SourceBatch {
        let config = FilingConfig::default();
        let headers: Vec<String> = rows
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let mapping = HeaderMatcher::from_config(&config).map_headers(&headers);
        SourceBatch::new("sales.csv", rows, mapping, SourceContext::default())
    }

    fn sales_rows() -> Vec<RawRow> {
        vec![
            row(&[
                ("Invoice Number", json!("INV001")),
                ("GSTIN of Recipient", json!("29ABCDE1234F1Z5")),
                ("Taxable Value", json!("10,000")),
                ("Rate", json!(18)),
                ("Place Of Supply", json!("Karnataka")),
                ("HSN", json!("6109")),
            ]),
            row(&[
                ("Invoice Number", json!("INV002")),
                ("GSTIN of Recipient", json!("")),
                ("Taxable Value", json!(500)),
                ("Rate", json!("5%")),
                ("Place Of Supply", json!("27-Maharashtra")),
                ("HSN", json!("6109")),
            ]),
            row(&[
                ("Invoice Number", json!("")),
                ("GSTIN of Recipient", json!("")),
                ("Taxable Value", json!(10)),
                ("Rate", json!(5)),
                ("Place Of Supply", json!("27")),
                ("HSN", json!("6109")),
            ]),
        ]
    }

    // -- Pipeline --

    #[test]
    fn assembles_sections_and_summary() {
        let config = FilingConfig::default();
        let filer = filer();
        let doc = FilingAssembler::new(&config, &filer)
            .assemble(&[batch(sales_rows())])
            .unwrap();

        let summary = &doc.body.summary;
        assert_eq!(summary.rows_in, 3);
        assert_eq!(summary.lines_classified, 2);
        assert_eq!(summary.rows_rejected, 1);
        assert_eq!(summary.lines_per_section[&Section::B2b], 1);
        assert_eq!(summary.lines_per_section[&Section::B2cs], 1);
        assert_eq!(summary.totals.taxable_value, d("10500.00"));
        assert!(doc.body.reconciliation.overall_pass);

        let b2b = doc.body.tables.section(Section::B2b).unwrap();
        assert_eq!(b2b.totals.cross_jurisdiction_tax, d("1800.00"));
        assert!(doc.insights.is_none());
    }

    #[test]
    fn filing_json_has_one_key_per_section() {
        let config = FilingConfig::default();
        let filer = filer();
        let doc = FilingAssembler::new(&config, &filer)
            .assemble(&[batch(sales_rows())])
            .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        for section in Section::all() {
            assert!(json.get(section.as_str()).is_some(), "missing {section}");
        }
        assert_eq!(json["header"]["tax_id"], "27AAPFU0939F1ZV");
        assert_eq!(json["header"]["schema_version"], "GST3.1.6");
        assert!(json["digest"].as_str().unwrap().len() == 64);
        assert!(json.get("insights").is_none());
    }

    #[test]
    fn low_confidence_mapping_blocks_until_confirmed() {
        let config = FilingConfig::default();
        let filer = filer();
        let rows = vec![row(&[("txble vlue", json!(100)), ("Invoice Number", json!("A1"))])];
        let mut low = batch(rows);
        low.mapping.overall_confidence = 0.5;

        let err = FilingAssembler::new(&config, &filer)
            .assemble(std::slice::from_ref(&low))
            .unwrap_err();
        assert!(matches!(err, FilingError::LowConfidenceMapping { .. }));

        low.mapping = low.mapping.confirm();
        assert!(FilingAssembler::new(&config, &filer).assemble(&[low]).is_ok());
    }

    #[test]
    fn digest_is_stable_across_runs_and_input_order() {
        let config = FilingConfig::default();
        let filer = filer();
        let assembler = FilingAssembler::new(&config, &filer);
        let lines = vec![
            line("A1", "100", "18").build(),
            line("A2", "200", "5").registered().build(),
        ];
        let mut reversed = lines.clone();
        reversed.reverse();
        let a = assembler.assemble_lines(lines, Vec::new(), 2).unwrap();
        let b = assembler.assemble_lines(reversed, Vec::new(), 2).unwrap();
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn broken_tax_split_is_fatal() {
        let config = FilingConfig::default();
        let filer = filer();
        let mut bad = line("A1", "100.10", "5").build();
        bad.computed_tax = split_tax(d("100.10"), d("5"), true);
        bad.computed_tax.same_jurisdiction_tax_b = d("2.50");
        let err = FilingAssembler::new(&config, &filer)
            .assemble_lines(vec![bad], Vec::new(), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            FilingError::Core(gstr_core::GstrError::ArithmeticInvariant { .. })
        ));
    }

    #[test]
    fn empty_sections_omitted_when_configured() {
        let config = FilingConfig {
            emit_empty_sections: false,
            ..FilingConfig::default()
        };
        let filer = filer();
        let doc = FilingAssembler::new(&config, &filer)
            .assemble_lines(vec![line("A1", "100", "18").build()], Vec::new(), 1)
            .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("b2cs").is_some());
        assert!(json.get("b2b").is_none());
    }

    #[test]
    fn summary_renders() {
        let config = FilingConfig::default();
        let filer = filer();
        let doc = FilingAssembler::new(&config, &filer)
            .assemble(&[batch(sales_rows())])
            .unwrap();
        let text = doc.body.summary.to_string();
        assert!(text.contains("rows in:            3"));
        assert!(text.contains("row 2 (manual): row has no invoice/document number"));
        assert!(text.contains("b2b    1 lines"));
    }
}
