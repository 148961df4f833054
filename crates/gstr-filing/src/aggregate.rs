//! # Aggregation Engine
//!
//! Builds each section's output from classified lines, driven by the layout
//! table in [`crate::sections`].
//!
//! ## Shapes
//!
//! - **Itemized** (`b2b`, `b2cl`, `cdnr`, `cdnur`, `exp`): lines are grouped by
//!   the section key, then by document number. Each document carries a
//!   rate-wise item list numbered from 1.
//! - **Summarized** (`b2cs`, `at`, `atadj`, `exemp`): one row per bucket of
//!   the section key, with summed amounts and no document detail.
//!
//! Every amount is the exact decimal sum of its lines' already-rounded
//! amounts. Nothing is recomputed from an aggregate rate.
//!
//! ## Determinism
//!
//! Buckets live in `BTreeMap`s keyed by [`GroupKey`], and lines inside a
//! document are put in a canonical order before any per-document attribute
//! is picked. The same line set in any order produces byte-identical output.
//! Sections share nothing, so they aggregate in parallel.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use gstr_core::money::round_money;
use gstr_core::{
    CanonicalInvoiceLine, DocumentType, ExportDetail, FilingConfig, JurisdictionCode, Section,
    SupplyCategory,
};

use crate::derived::{doc_issue, hsn_summary, operator_tables, DocIssueTable, HsnSummary, OperatorTables};
use crate::sections::{spec_for, KeyField, SectionSpec, Shape};

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Summed monetary columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Amounts {
    pub taxable_value: Decimal,
    pub same_jurisdiction_tax_a: Decimal,
    pub same_jurisdiction_tax_b: Decimal,
    pub cross_jurisdiction_tax: Decimal,
    pub cess_amount: Decimal,
}

impl Amounts {
    pub fn of_line(line: &CanonicalInvoiceLine) -> Self {
        Self {
            taxable_value: line.taxable_value,
            same_jurisdiction_tax_a: line.computed_tax.same_jurisdiction_tax_a,
            same_jurisdiction_tax_b: line.computed_tax.same_jurisdiction_tax_b,
            cross_jurisdiction_tax: line.computed_tax.cross_jurisdiction_tax,
            cess_amount: line.cess_amount,
        }
    }

    pub fn total_tax(&self) -> Decimal {
        self.same_jurisdiction_tax_a + self.same_jurisdiction_tax_b + self.cross_jurisdiction_tax
    }

    /// Every column at money scale.
    pub fn rounded(self) -> Self {
        Self {
            taxable_value: round_money(self.taxable_value),
            same_jurisdiction_tax_a: round_money(self.same_jurisdiction_tax_a),
            same_jurisdiction_tax_b: round_money(self.same_jurisdiction_tax_b),
            cross_jurisdiction_tax: round_money(self.cross_jurisdiction_tax),
            cess_amount: round_money(self.cess_amount),
        }
    }
}

impl std::ops::AddAssign for Amounts {
    fn add_assign(&mut self, rhs: Self) {
        self.taxable_value += rhs.taxable_value;
        self.same_jurisdiction_tax_a += rhs.same_jurisdiction_tax_a;
        self.same_jurisdiction_tax_b += rhs.same_jurisdiction_tax_b;
        self.cross_jurisdiction_tax += rhs.cross_jurisdiction_tax;
        self.cess_amount += rhs.cess_amount;
    }
}

impl std::iter::Sum for Amounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, a| {
            acc += a;
            acc
        })
    }
}

impl<'a> std::iter::Sum<&'a Amounts> for Amounts {
    fn sum<I: Iterator<Item = &'a Amounts>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// ---------------------------------------------------------------------------
// Grouping keys
// ---------------------------------------------------------------------------

/// One component value of a grouping key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    Text(String),
    Rate(Decimal),
}

impl KeyPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Rate(_) => None,
        }
    }
}

impl Serialize for KeyPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Rate(r) => Serialize::serialize(r, serializer),
        }
    }
}

/// A section grouping key, ordered component-wise.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(Vec<(KeyField, KeyPart)>);

impl GroupKey {
    /// Key of `line` under `spec`'s grouping.
    pub fn of_line(spec: &SectionSpec, line: &CanonicalInvoiceLine) -> Self {
        Self(
            spec.grouping
                .iter()
                .map(|field| (*field, key_part(*field, line)))
                .collect(),
        )
    }

    pub fn get(&self, field: KeyField) -> Option<&KeyPart> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, part)| part)
    }

    pub fn text(&self, field: KeyField) -> Option<&str> {
        self.get(field).and_then(KeyPart::as_text)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, part) in &self.0 {
            map.serialize_entry(field.as_str(), part)?;
        }
        map.end()
    }
}

fn key_part(field: KeyField, line: &CanonicalInvoiceLine) -> KeyPart {
    let operator = line.provenance.ecommerce_operator.as_deref();
    let text = match field {
        KeyField::Counterparty => line.counterparty_tax_id.clone().unwrap_or_default(),
        KeyField::Jurisdiction => line.supply_jurisdiction_code.as_str().to_string(),
        KeyField::ExportType => {
            let export_type = if line.flags.export_with_payment { "WPAY" } else { "WOPAY" };
            export_type.to_string()
        }
        KeyField::SupplyDirection => {
            let direction = if line.is_intra_jurisdiction() { "INTRA" } else { "INTER" };
            direction.to_string()
        }
        KeyField::ChannelType => {
            let channel = if operator.is_some() { "E" } else { "OE" };
            channel.to_string()
        }
        KeyField::Operator => operator.unwrap_or_default().to_string(),
        KeyField::Rate => return KeyPart::Rate(line.tax_rate_percent.normalize()),
        KeyField::SupplyType => format!(
            "{}{}",
            if line.is_intra_jurisdiction() { "INTR" } else { "INTER" },
            if line.is_registered() { "B2B" } else { "B2C" },
        ),
    };
    KeyPart::Text(text)
}

/// Canonical order of lines within a document, independent of input order.
fn canonical_order(a: &&CanonicalInvoiceLine, b: &&CanonicalInvoiceLine) -> std::cmp::Ordering {
    (
        &a.provenance.origin_channel,
        a.provenance.source_row_index,
        &a.document_number_raw,
        a.tax_rate_percent,
        a.taxable_value,
    )
        .cmp(&(
            &b.provenance.origin_channel,
            b.provenance.source_row_index,
            &b.document_number_raw,
            b.tax_rate_percent,
            b.taxable_value,
        ))
}

// ---------------------------------------------------------------------------
// Section output
// ---------------------------------------------------------------------------

/// Credit or debit note marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NoteKind {
    #[serde(rename = "C")]
    Credit,
    #[serde(rename = "D")]
    Debit,
}

/// One rate-wise item inside a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateItem {
    pub num: u32,
    pub rate: Decimal,
    #[serde(flatten)]
    pub amounts: Amounts,
}

/// One document inside an itemized group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEntry {
    pub document_number: String,
    pub document_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_kind: Option<NoteKind>,
    pub document_date: Option<NaiveDate>,
    pub counterparty_name: Option<String>,
    pub place_of_supply: JurisdictionCode,
    pub reverse_charge: bool,
    pub ecommerce_operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportDetail>,
    /// Sum of taxable value, tax, and cess over the document's lines.
    pub document_value: Decimal,
    pub items: Vec<RateItem>,
}

impl DocumentEntry {
    pub fn amounts(&self) -> Amounts {
        self.items.iter().map(|item| &item.amounts).sum()
    }
}

/// Documents sharing one itemized grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemizedGroup {
    pub key: GroupKey,
    pub documents: Vec<DocumentEntry>,
}

/// Nil-rated, exempt and non-taxable split of an `exemp` row's taxable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExemptBreakdown {
    pub nil_rated: Decimal,
    pub exempt: Decimal,
    pub non_taxable: Decimal,
}

impl ExemptBreakdown {
    fn add_line(&mut self, line: &CanonicalInvoiceLine) {
        let bucket = match line.supply_category {
            SupplyCategory::Exempt => &mut self.exempt,
            SupplyCategory::NonTaxable => &mut self.non_taxable,
            SupplyCategory::NilRated | SupplyCategory::Taxable => &mut self.nil_rated,
        };
        *bucket += line.taxable_value;
    }

    fn rounded(self) -> Self {
        Self {
            nil_rated: round_money(self.nil_rated),
            exempt: round_money(self.exempt),
            non_taxable: round_money(self.non_taxable),
        }
    }
}

/// One bucket of a summarized section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub line_count: usize,
    #[serde(flatten)]
    pub amounts: Amounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ExemptBreakdown>,
}

/// Shape-specific body of a section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SectionBody {
    Itemized { groups: Vec<ItemizedGroup> },
    Summarized { rows: Vec<SummaryRow> },
}

/// Aggregated output of one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionOutput {
    pub section: Section,
    pub line_count: usize,
    pub document_count: usize,
    /// Sum over the section's items or rows.
    pub totals: Amounts,
    #[serde(flatten)]
    pub body: SectionBody,
}

impl SectionOutput {
    pub fn empty(section: Section) -> Self {
        let body = match spec_for(section).shape {
            Shape::Itemized => SectionBody::Itemized { groups: Vec::new() },
            Shape::Summarized => SectionBody::Summarized { rows: Vec::new() },
        };
        Self {
            section,
            line_count: 0,
            document_count: 0,
            totals: Amounts::default().rounded(),
            body,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    /// Every document of an itemized section, in output order.
    pub fn documents(&self) -> impl Iterator<Item = (&GroupKey, &DocumentEntry)> {
        let groups: &[ItemizedGroup] = match &self.body {
            SectionBody::Itemized { groups } => groups,
            SectionBody::Summarized { .. } => &[],
        };
        groups
            .iter()
            .flat_map(|g| g.documents.iter().map(move |d| (&g.key, d)))
    }

    /// Rows of a summarized section.
    pub fn rows(&self) -> &[SummaryRow] {
        match &self.body {
            SectionBody::Summarized { rows } => rows,
            SectionBody::Itemized { .. } => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregate the lines classified into `section`. Other lines are ignored.
pub fn aggregate(lines: &[CanonicalInvoiceLine], section: Section) -> SectionOutput {
    let spec = spec_for(section);
    let members: Vec<&CanonicalInvoiceLine> =
        lines.iter().filter(|l| l.section == Some(section)).collect();
    if members.is_empty() {
        return SectionOutput::empty(section);
    }

    let document_count = members
        .iter()
        .map(|l| l.document_number_normalized.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let body = match spec.shape {
        Shape::Itemized => SectionBody::Itemized {
            groups: itemize(spec, &members),
        },
        Shape::Summarized => SectionBody::Summarized {
            rows: summarize(spec, &members),
        },
    };
    let totals = match &body {
        SectionBody::Itemized { groups } => groups
            .iter()
            .flat_map(|g| g.documents.iter().flat_map(|d| d.items.iter()))
            .map(|item| &item.amounts)
            .sum::<Amounts>(),
        SectionBody::Summarized { rows } => rows.iter().map(|r| &r.amounts).sum::<Amounts>(),
    };

    SectionOutput {
        section,
        line_count: members.len(),
        document_count,
        totals: totals.rounded(),
        body,
    }
}

/// Aggregate every section in parallel.
///
/// Sections with no lines are present (empty) when
/// `emit_empty_sections` is set and absent otherwise.
pub fn aggregate_sections(
    lines: &[CanonicalInvoiceLine],
    config: &FilingConfig,
) -> BTreeMap<Section, SectionOutput> {
    Section::all()
        .par_iter()
        .map(|section| (*section, aggregate(lines, *section)))
        .filter(|(_, output)| config.emit_empty_sections || !output.is_empty())
        .collect()
}

/// Everything aggregation produces for one filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilingTables {
    /// One key per section at the top level of the filing.
    #[serde(flatten)]
    pub sections: BTreeMap<Section, SectionOutput>,
    pub hsn: HsnSummary,
    pub ecommerce: OperatorTables,
    pub documents_issued: DocIssueTable,
}

impl FilingTables {
    /// Aggregate sections and derive the cross-section tables.
    pub fn build(lines: &[CanonicalInvoiceLine], config: &FilingConfig) -> Self {
        let (sections, (hsn, (ecommerce, documents_issued))) = rayon::join(
            || aggregate_sections(lines, config),
            || {
                rayon::join(
                    || hsn_summary(lines, config),
                    || rayon::join(|| operator_tables(lines), || doc_issue(lines, config)),
                )
            },
        );
        Self {
            sections,
            hsn,
            ecommerce,
            documents_issued,
        }
    }

    /// Output of a section; `None` when it was omitted as empty.
    pub fn section(&self, section: Section) -> Option<&SectionOutput> {
        self.sections.get(&section)
    }
}

fn itemize(spec: &SectionSpec, members: &[&CanonicalInvoiceLine]) -> Vec<ItemizedGroup> {
    let mut buckets: BTreeMap<GroupKey, BTreeMap<&str, Vec<&CanonicalInvoiceLine>>> =
        BTreeMap::new();
    for line in members {
        buckets
            .entry(GroupKey::of_line(spec, line))
            .or_default()
            .entry(line.document_number_normalized.as_str())
            .or_default()
            .push(*line);
    }

    buckets
        .into_iter()
        .map(|(key, documents)| ItemizedGroup {
            key,
            documents: documents
                .into_iter()
                .map(|(number, lines)| document_entry(number, lines))
                .collect(),
        })
        .collect()
}

fn document_entry(number: &str, mut lines: Vec<&CanonicalInvoiceLine>) -> DocumentEntry {
    lines.sort_by(canonical_order);
    let first = lines[0];

    let mut by_rate: BTreeMap<Decimal, Amounts> = BTreeMap::new();
    for line in &lines {
        *by_rate.entry(line.tax_rate_percent.normalize()).or_default() += Amounts::of_line(line);
    }
    let items = by_rate
        .into_iter()
        .zip(1u32..)
        .map(|((rate, amounts), num)| RateItem {
            num,
            rate,
            amounts: amounts.rounded(),
        })
        .collect();

    // Lines of one document can disagree on these; the smallest value wins
    // so the entry never depends on source row order.
    let document_type = lines
        .iter()
        .map(|l| l.document_type)
        .min()
        .unwrap_or(first.document_type);
    let place_of_supply = lines
        .iter()
        .map(|l| &l.supply_jurisdiction_code)
        .min()
        .unwrap_or(&first.supply_jurisdiction_code)
        .clone();

    let note_kind = match document_type {
        DocumentType::CreditNote => Some(NoteKind::Credit),
        DocumentType::DebitNote => Some(NoteKind::Debit),
        _ => None,
    };

    DocumentEntry {
        document_number: number.to_string(),
        document_type,
        note_kind,
        document_date: lines.iter().filter_map(|l| l.document_date).min(),
        counterparty_name: lines.iter().filter_map(|l| l.counterparty_name.clone()).min(),
        place_of_supply,
        reverse_charge: lines.iter().any(|l| l.flags.is_reverse_charge),
        ecommerce_operator: lines
            .iter()
            .filter_map(|l| l.provenance.ecommerce_operator.clone())
            .min(),
        export: lines.iter().filter_map(|l| l.export.clone()).min(),
        document_value: round_money(lines.iter().map(|l| l.line_value()).sum()),
        items,
    }
}

fn summarize(spec: &SectionSpec, members: &[&CanonicalInvoiceLine]) -> Vec<SummaryRow> {
    let with_breakdown = spec.section == Section::Exempt;
    let mut buckets: BTreeMap<GroupKey, (usize, Amounts, ExemptBreakdown)> = BTreeMap::new();
    for line in members {
        let bucket = buckets.entry(GroupKey::of_line(spec, line)).or_default();
        bucket.0 += 1;
        bucket.1 += Amounts::of_line(line);
        if with_breakdown {
            bucket.2.add_line(line);
        }
    }

    buckets
        .into_iter()
        .map(|(key, (line_count, amounts, breakdown))| SummaryRow {
            key,
            line_count,
            amounts: amounts.rounded(),
            breakdown: with_breakdown.then(|| breakdown.rounded()),
        })
        .collect()
}
