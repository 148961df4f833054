//! # Filing Pipeline End to End
//!
//! Mixed sales, returns, and marketplace files through header mapping,
//! normalization, classification, aggregation, derived tables,
//! reconciliation, digest, and the optional advisory step.

use std::str::FromStr;
use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use gstr_core::{FilerContext, FilingConfig, FilingPeriod, RawRow, Section, TaxId};
use gstr_filing::{FilingAssembler, FilingDocument, RuleBasedAdvisor, SourceBatch};
use gstr_ingest::{HeaderMatcher, SourceContext};

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn row(pairs: &[(&str, Value)]) -> RawRow {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn filer() -> FilerContext {
    FilerContext::new(
        TaxId::new("27AAPFU0939F1ZV").unwrap(),
        FilingPeriod::new("042025").unwrap(),
    )
    .unwrap()
}

fn batch(name: &str, rows: Vec<RawRow>, context: SourceContext) -> SourceBatch {
    let config = FilingConfig::default();
    let mut headers: Vec<String> = Vec::new();
    for key in rows.iter().flat_map(|r| r.keys()) {
        if !headers.contains(key) {
            headers.push(key.clone());
        }
    }
    let mapping = HeaderMatcher::from_config(&config).map_headers(&headers);
    SourceBatch::new(name, rows, mapping, context)
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
            ("Quantity", json!(10)),
        ]),
        row(&[
            ("Invoice Number", json!("INV001")),
            ("GSTIN of Recipient", json!("29ABCDE1234F1Z5")),
            ("Taxable Value", json!(2000)),
            ("Rate", json!("5%")),
            ("Place Of Supply", json!("Karnataka")),
            ("HSN", json!("6110")),
            ("Quantity", json!(2)),
        ]),
        row(&[
            ("Invoice Number", json!("INV002")),
            ("Taxable Value", json!(500)),
            ("Rate", json!(5)),
            ("Place Of Supply", json!("27")),
            ("HSN", json!("6109")),
        ]),
        row(&[
            ("Invoice Number", json!("INV004")),
            ("Taxable Value", json!(400000)),
            ("Rate", json!(12)),
            ("Place Of Supply", json!("Tamil Nadu")),
            ("HSN", json!("8471")),
        ]),
        row(&[
            ("Invoice Number", json!("EXP001")),
            ("Taxable Value", json!(5000)),
            ("Rate", json!(18)),
            ("Export Type", json!("WPAY")),
            ("Shipping Bill No", json!("SB9")),
            ("HSN", json!("6109")),
        ]),
        row(&[
            ("Invoice Number", json!("INV005")),
            ("Taxable Value", json!(700)),
            ("Rate", json!(0)),
            ("Supply Category", json!("Exempt")),
            ("Place Of Supply", json!("27")),
            ("HSN", json!("0401")),
        ]),
        row(&[
            ("Invoice Number", json!("ADV1")),
            ("Taxable Value", json!(1000)),
            ("Rate", json!(18)),
            ("Place Of Supply", json!("27")),
            ("Advance Received", json!("yes")),
        ]),
    ]
}

fn return_rows() -> Vec<RawRow> {
    vec![row(&[
        ("Invoice Number", json!("CN1")),
        ("Document Type", json!("Credit Note")),
        ("GSTIN of Recipient", json!("29ABCDE1234F1Z5")),
        ("Taxable Value", json!(1000)),
        ("Rate", json!(18)),
        ("Place Of Supply", json!("29")),
        ("HSN", json!("6109")),
    ])]
}

fn marketplace_rows() -> Vec<RawRow> {
    vec![row(&[
        ("Invoice Number", json!("M1")),
        ("Taxable Value", json!(300)),
        ("Rate", json!(5)),
        ("Place Of Supply", json!("Maharashtra")),
        ("HSN", json!("6109")),
    ])]
}

fn batches(sales: Vec<RawRow>) -> Vec<SourceBatch> {
    vec![
        batch("sales", sales, SourceContext::default()),
        batch(
            "returns",
            return_rows(),
            SourceContext::default().with_returns_file(true),
        ),
        batch("marketplace", marketplace_rows(), SourceContext::new("meesho")),
    ]
}

fn assemble(sales: Vec<RawRow>) -> FilingDocument {
    let config = FilingConfig::default();
    let filer = filer();
    FilingAssembler::new(&config, &filer)
        .assemble(&batches(sales))
        .unwrap()
}

// -- Classification and totals --

#[test]
fn every_row_lands_in_its_section() {
    let doc = assemble(sales_rows());
    let summary = &doc.body.summary;

    assert_eq!(summary.rows_in, 9);
    assert_eq!(summary.rows_rejected, 0);
    assert_eq!(summary.lines_classified, 9);

    let per = &summary.lines_per_section;
    assert_eq!(per.get(&Section::B2b), Some(&2));
    assert_eq!(per.get(&Section::B2cs), Some(&2));
    assert_eq!(per.get(&Section::B2cl), Some(&1));
    assert_eq!(per.get(&Section::Exp), Some(&1));
    assert_eq!(per.get(&Section::Exempt), Some(&1));
    assert_eq!(per.get(&Section::At), Some(&1));
    assert_eq!(per.get(&Section::Cdnr), Some(&1));
}

#[test]
fn itemized_document_keeps_rate_items() {
    let doc = assemble(sales_rows());
    let b2b = doc.body.tables.section(Section::B2b).unwrap();
    let (key, entry) = b2b.documents().next().unwrap();

    assert_eq!(key.text(gstr_filing::sections::KeyField::Counterparty), Some("29ABCDE1234F1Z5"));
    assert_eq!(entry.document_number, "INV001");
    assert_eq!(entry.items.len(), 2);
    assert_eq!(b2b.totals.taxable_value, d("12000.00"));
    assert_eq!(b2b.totals.cross_jurisdiction_tax, d("1900.00"));
}

#[test]
fn credit_note_is_negative() {
    let doc = assemble(sales_rows());
    let cdnr = doc.body.tables.section(Section::Cdnr).unwrap();
    assert_eq!(cdnr.totals.taxable_value, d("-1000.00"));
    assert_eq!(cdnr.totals.cross_jurisdiction_tax, d("-180.00"));
}

#[test]
fn marketplace_supply_reported_against_operator() {
    let doc = assemble(sales_rows());
    let ecommerce = &doc.body.tables.ecommerce;
    assert_eq!(ecommerce.unregistered.len(), 1);
    assert_eq!(ecommerce.unregistered[0].operator_tax_id, "07AARCM9332R1CQ");
    assert_eq!(ecommerce.unregistered[0].amounts.taxable_value, d("300.00"));
    assert!(ecommerce.registered.is_empty());
}

// -- Derived tables and reconciliation --

#[test]
fn documents_issued_reports_cancelled_serial() {
    let doc = assemble(sales_rows());
    let issued = &doc.body.tables.documents_issued;
    // INV003 is absent from the invoice series.
    assert_eq!(issued.total_cancelled(), 1);
}

#[test]
fn tables_reconcile() {
    let doc = assemble(sales_rows());
    let report = &doc.body.reconciliation;
    assert!(report.overall_pass, "warnings: {:?}", report.warnings);
    assert!(report
        .per_check
        .iter()
        .any(|c| c.name == "hsn_vs_sections_taxable_value"));
    assert!(report
        .per_check
        .iter()
        .any(|c| c.name == "ecommerce_unregistered_vs_sections"));
    assert_eq!(doc.body.tables.hsn.lines_missing_hsn, 0);
}

// -- Filing document --

#[test]
fn filing_json_layout() {
    let doc = assemble(sales_rows());
    let json = serde_json::to_value(&doc).unwrap();

    for section in Section::all() {
        assert!(json.get(section.as_str()).is_some(), "missing {section}");
    }
    for key in ["header", "hsn", "ecommerce", "documents_issued", "reconciliation", "summary"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["b2cs"]["shape"], "summarized");
    assert_eq!(json["b2b"]["shape"], "itemized");
    assert_eq!(json["digest"].as_str().map(str::len), Some(64));
}

#[test]
fn advisory_adds_insights_without_touching_the_digest() {
    let config = FilingConfig::default();
    let filer = filer();
    let plain = assemble(sales_rows());
    let advised = FilingAssembler::new(&config, &filer)
        .with_advisor(Arc::new(RuleBasedAdvisor))
        .assemble(&batches(sales_rows()))
        .unwrap();

    assert_eq!(plain.digest, advised.digest);
    let insights = advised.insights.unwrap();
    assert!(insights.compliance_score <= 100);
    assert!(!insights.insights.is_empty());
}

// -- Determinism --

#[test]
fn same_input_same_digest() {
    assert_eq!(assemble(sales_rows()).digest, assemble(sales_rows()).digest);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn digest_independent_of_row_order(sales in Just(sales_rows()).prop_shuffle()) {
        let expected = assemble(sales_rows());
        let shuffled = assemble(sales);
        prop_assert_eq!(expected.digest, shuffled.digest);
        prop_assert_eq!(expected.body.tables, shuffled.body.tables);
    }
}
