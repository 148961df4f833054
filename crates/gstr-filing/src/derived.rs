//! # Derived Tables
//!
//! Tables built from the whole classified line set rather than one section:
//!
//! - **HSN summary**: supplies by (HSN code, rate), split into registered and
//!   unregistered tables. Advances carry no goods detail and are excluded.
//! - **E-commerce operator tables**: supplies facilitated by an operator,
//!   per operator tax id, split by the section's registration status.
//! - **Documents issued**: serial ranges per document type from the range
//!   detector, with cancelled (missing) counts.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;

use gstr_core::{CanonicalInvoiceLine, DocumentType, FilingConfig, Section};

use crate::aggregate::Amounts;
use crate::ranges::{detect, MissingRange, NonSequential, RangeLimits};

// ---------------------------------------------------------------------------
// HSN summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HsnRow {
    pub num: u32,
    pub hsn_code: String,
    pub description: Option<String>,
    pub uqc: String,
    pub rate: Decimal,
    pub quantity: Decimal,
    #[serde(flatten)]
    pub amounts: Amounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HsnSummary {
    /// Supplies to registered buyers.
    pub b2b: Vec<HsnRow>,
    /// Supplies to everyone else.
    pub b2c: Vec<HsnRow>,
    /// Supply lines with no HSN code, left out of both tables.
    pub lines_missing_hsn: usize,
}

impl HsnSummary {
    pub fn totals(&self) -> Amounts {
        self.b2b.iter().chain(&self.b2c).map(|r| &r.amounts).sum()
    }
}

#[derive(Default)]
struct HsnBucket {
    description: Option<String>,
    uqc: Option<String>,
    quantity: Decimal,
    amounts: Amounts,
}

type HsnKey = (String, Decimal);

/// Build the HSN summary from classified lines.
pub fn hsn_summary(lines: &[CanonicalInvoiceLine], config: &FilingConfig) -> HsnSummary {
    let mut registered: BTreeMap<HsnKey, HsnBucket> = BTreeMap::new();
    let mut unregistered: BTreeMap<HsnKey, HsnBucket> = BTreeMap::new();
    let mut lines_missing_hsn = 0;

    for line in lines {
        let Some(section) = line.section else { continue };
        if !section.is_supply() {
            continue;
        }
        let Some(hsn) = line
            .item
            .hsn_code
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
        else {
            lines_missing_hsn += 1;
            continue;
        };

        let table = if line.is_registered() {
            &mut registered
        } else {
            &mut unregistered
        };
        let bucket = table
            .entry((hsn.to_string(), line.tax_rate_percent.normalize()))
            .or_default();
        bucket.quantity += line.item.quantity;
        bucket.amounts += Amounts::of_line(line);
        bucket.description = min_some(bucket.description.take(), line.item.description.clone());
        bucket.uqc = min_some(bucket.uqc.take(), line.item.uqc.clone());
    }

    if lines_missing_hsn > 0 {
        tracing::warn!(lines = lines_missing_hsn, "supply lines without HSN code");
    }

    HsnSummary {
        b2b: hsn_rows(registered, &config.default_uqc),
        b2c: hsn_rows(unregistered, &config.default_uqc),
        lines_missing_hsn,
    }
}

fn hsn_rows(buckets: BTreeMap<HsnKey, HsnBucket>, default_uqc: &str) -> Vec<HsnRow> {
    buckets
        .into_iter()
        .zip(1u32..)
        .map(|(((hsn_code, rate), bucket), num)| HsnRow {
            num,
            hsn_code,
            description: bucket.description,
            uqc: bucket.uqc.unwrap_or_else(|| default_uqc.to_string()),
            rate,
            quantity: bucket.quantity,
            amounts: bucket.amounts.rounded(),
        })
        .collect()
}

fn min_some(current: Option<String>, candidate: Option<String>) -> Option<String> {
    let candidate = candidate.filter(|c| !c.trim().is_empty());
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

// ---------------------------------------------------------------------------
// E-commerce operator tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorRow {
    pub operator_tax_id: String,
    pub document_count: usize,
    #[serde(flatten)]
    pub amounts: Amounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorTables {
    /// Operator supplies reported in `b2b` and `cdnr`.
    pub registered: Vec<OperatorRow>,
    /// Operator supplies reported in `b2cl`, `b2cs` and `cdnur`.
    pub unregistered: Vec<OperatorRow>,
}

impl OperatorTables {
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty() && self.unregistered.is_empty()
    }
}

/// Sections whose operator supplies go to the registered operator table.
pub const OPERATOR_REGISTERED_SECTIONS: [Section; 2] = [Section::B2b, Section::Cdnr];

/// Sections whose operator supplies go to the unregistered operator table.
pub const OPERATOR_UNREGISTERED_SECTIONS: [Section; 3] =
    [Section::B2cl, Section::B2cs, Section::Cdnur];

pub fn operator_tables(lines: &[CanonicalInvoiceLine]) -> OperatorTables {
    type Bucket<'a> = (BTreeSet<&'a str>, Amounts);
    let mut registered: BTreeMap<&str, Bucket<'_>> = BTreeMap::new();
    let mut unregistered: BTreeMap<&str, Bucket<'_>> = BTreeMap::new();

    for line in lines {
        let (Some(section), Some(operator)) =
            (line.section, line.provenance.ecommerce_operator.as_deref())
        else {
            continue;
        };
        let table = if OPERATOR_REGISTERED_SECTIONS.contains(&section) {
            &mut registered
        } else if OPERATOR_UNREGISTERED_SECTIONS.contains(&section) {
            &mut unregistered
        } else {
            continue;
        };
        let bucket = table.entry(operator).or_default();
        bucket.0.insert(line.document_number_normalized.as_str());
        bucket.1 += Amounts::of_line(line);
    }

    OperatorTables {
        registered: operator_rows(registered),
        unregistered: operator_rows(unregistered),
    }
}

fn operator_rows(table: BTreeMap<&str, (BTreeSet<&str>, Amounts)>) -> Vec<OperatorRow> {
    table
        .into_iter()
        .map(|(operator, (documents, amounts))| OperatorRow {
            operator_tax_id: operator.to_string(),
            document_count: documents.len(),
            amounts: amounts.rounded(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Documents issued
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocIssueEntry {
    pub num: u32,
    pub from: String,
    pub to: String,
    pub total_number: u64,
    pub cancelled: u64,
    pub net_issued: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cancelled_ranges: Vec<MissingRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocIssueCategory {
    /// Portal ordering number of the document type.
    pub doc_num: u8,
    pub doc_type: DocumentType,
    pub label: &'static str,
    pub entries: Vec<DocIssueEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocIssueTable {
    pub categories: Vec<DocIssueCategory>,
    pub non_sequential: Vec<NonSequential<DocumentType>>,
    pub non_sequential_count: usize,
}

impl DocIssueTable {
    pub fn total_cancelled(&self) -> u64 {
        self.categories
            .iter()
            .flat_map(|c| &c.entries)
            .map(|e| e.cancelled)
            .sum()
    }
}

/// Build the documents-issued table from every line's document number.
pub fn doc_issue(lines: &[CanonicalInvoiceLine], config: &FilingConfig) -> DocIssueTable {
    let report = detect(
        lines
            .iter()
            .map(|l| (l.document_type, l.document_number_normalized.as_str())),
        &RangeLimits::from_config(config),
    );

    let mut categories: BTreeMap<(u8, DocumentType), Vec<DocIssueEntry>> = BTreeMap::new();
    for range in report.ranges {
        let entries = categories
            .entry((range.key.portal_order(), range.key))
            .or_default();
        entries.push(DocIssueEntry {
            num: entries.len() as u32 + 1,
            from: range.document_from,
            to: range.document_to,
            total_number: range.expected_count,
            cancelled: range.missing_count,
            net_issued: range.found_count,
            cancelled_ranges: range.missing_ranges,
        });
    }

    DocIssueTable {
        categories: categories
            .into_iter()
            .map(|((doc_num, doc_type), entries)| DocIssueCategory {
                doc_num,
                doc_type,
                label: doc_type.portal_label(),
                entries,
            })
            .collect(),
        non_sequential: report.non_sequential,
        non_sequential_count: report.non_sequential_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{d, line, OPERATOR};

    fn sec(section: Section, b: crate::testing::LineBuilder) -> CanonicalInvoiceLine {
        b.build().with_section(section)
    }

    // -- HSN --

    #[test]
    fn hsn_groups_by_code_and_rate_per_registration() {
        let mut desc = line("A1", "100", "18").hsn("6109", "2").registered().build();
        desc.item.description = Some("T-shirt".into());
        let lines = vec![
            desc.with_section(Section::B2b),
            sec(Section::B2cs, line("A2", "200", "18").hsn("6109", "3")),
            sec(Section::B2cs, line("A3", "50", "18").hsn("6109", "1")),
            sec(Section::B2cs, line("A4", "80", "5").hsn("6109", "1")),
        ];
        let summary = hsn_summary(&lines, &FilingConfig::default());
        assert_eq!(summary.b2b.len(), 1);
        assert_eq!(summary.b2b[0].description.as_deref(), Some("T-shirt"));
        assert_eq!(summary.b2c.len(), 2);
        assert_eq!(summary.b2c[0].rate, d("5"));
        assert_eq!(summary.b2c[1].num, 2);
        assert_eq!(summary.b2c[1].quantity, d("4"));
        assert_eq!(summary.b2c[1].amounts.taxable_value, d("250.00"));
        assert_eq!(summary.b2c[1].uqc, "OTH");
        assert_eq!(summary.totals().taxable_value, d("430.00"));
    }

    #[test]
    fn hsn_excludes_advances_and_counts_missing() {
        let lines = vec![
            sec(Section::At, line("R1", "100", "18").advance().hsn("9983", "1")),
            sec(Section::B2cs, line("A1", "100", "18")),
        ];
        let summary = hsn_summary(&lines, &FilingConfig::default());
        assert!(summary.b2c.is_empty());
        assert_eq!(summary.lines_missing_hsn, 1);
    }

    #[test]
    fn hsn_description_is_order_independent() {
        let mut a = line("A1", "1", "5").hsn("1001", "1").build();
        a.item.description = Some("wheat".into());
        let mut b = line("A2", "1", "5").hsn("1001", "1").build();
        b.item.description = Some("atta".into());
        let forward = vec![a.clone().with_section(Section::B2cs), b.clone().with_section(Section::B2cs)];
        let backward = vec![b.with_section(Section::B2cs), a.with_section(Section::B2cs)];
        let config = FilingConfig::default();
        assert_eq!(hsn_summary(&forward, &config), hsn_summary(&backward, &config));
        assert_eq!(hsn_summary(&forward, &config).b2c[0].description.as_deref(), Some("atta"));
    }

    // -- Operators --

    #[test]
    fn operator_tables_split_by_section() {
        let lines = vec![
            sec(Section::B2cs, line("M1", "100", "5").operator("meesho")),
            sec(Section::B2cs, line("M2", "200", "5").operator("meesho")),
            sec(Section::B2b, line("M3", "300", "5").operator("meesho").registered()),
            sec(Section::B2cs, line("S1", "999", "5")),
        ];
        let tables = operator_tables(&lines);
        assert_eq!(tables.unregistered.len(), 1);
        assert_eq!(tables.unregistered[0].operator_tax_id, OPERATOR);
        assert_eq!(tables.unregistered[0].document_count, 2);
        assert_eq!(tables.unregistered[0].amounts.taxable_value, d("300.00"));
        assert_eq!(tables.registered[0].amounts.taxable_value, d("300.00"));
    }

    #[test]
    fn operator_tables_empty_without_operators() {
        let lines = vec![sec(Section::B2cs, line("S1", "1", "5"))];
        assert!(operator_tables(&lines).is_empty());
    }

    // -- Documents issued --

    #[test]
    fn doc_issue_in_portal_order() {
        let lines = vec![
            sec(
                Section::Cdnur,
                line("CN1", "10", "5").document_type(DocumentType::CreditNote),
            ),
            sec(Section::B2cs, line("INV001", "10", "5")),
            sec(Section::B2cs, line("INV002", "10", "5")),
            sec(Section::B2cs, line("INV005", "10", "5")),
            sec(Section::B2cs, line("MISC", "10", "5")),
        ];
        let table = doc_issue(&lines, &FilingConfig::default());
        let order: Vec<u8> = table.categories.iter().map(|c| c.doc_num).collect();
        assert_eq!(order, vec![1, 5]);

        let invoices = &table.categories[0].entries[0];
        assert_eq!(invoices.from, "INV001");
        assert_eq!(invoices.to, "INV005");
        assert_eq!(invoices.total_number, 5);
        assert_eq!(invoices.cancelled, 2);
        assert_eq!(invoices.net_issued, 3);
        assert_eq!(table.total_cancelled(), 2);
        assert_eq!(table.non_sequential_count, 1);
    }
}
