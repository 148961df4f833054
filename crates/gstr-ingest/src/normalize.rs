//! # Canonical Normalizer
//!
//! Turns one mapped raw row into a [`CanonicalInvoiceLine`], or rejects it
//! with a recorded reason. A rejected row never aborts the batch.
//!
//! ## Steps
//!
//! 1. Reverse-apply header mappings so raw columns carry canonical names.
//!    Columns already named canonically pass through.
//! 2. Reject empty rows and rows without a document number.
//! 3. Parse money and rates exactly.
//! 4. Resolve the place of supply; fall back to the filer's jurisdiction and
//!    flag the fallback in provenance.
//! 5. Determine direction: a returns file, an explicit return flag, a
//!    negative value, or a credit note makes the line negative.
//! 6. Compute tax on the absolute value and reapply the sign to every
//!    component.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use gstr_core::fields;
use gstr_core::identity::UNREGISTERED_MARKER;
use gstr_core::money::{negate_money, parse_money, parse_rate, split_tax};
use gstr_core::{
    compute_tax_split, normalize_document_number, resolve_document_type, CanonicalInvoiceLine,
    DocumentType, ExportDetail, FilerContext, FilingConfig, ItemDetail, JurisdictionCode,
    JurisdictionTable, LineFlags, Provenance, RawRow, SupplyCategory, TaxSplit,
};

use crate::headers::HeaderMapping;

/// Place-of-supply code for supplies outside the country.
const EXPORT_JURISDICTION: &str = "96";

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d-%b-%Y", "%d %b %Y",
];

/// Facts about the source file a row came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
    /// Sales channel (`manual` when the file is not from a marketplace).
    pub origin_channel: String,
    /// Every row in the file is a return.
    pub returns_file: bool,
    /// Document type for rows with no type column.
    pub default_document_type: DocumentType,
}

impl Default for SourceContext {
    fn default() -> Self {
        Self {
            origin_channel: "manual".to_string(),
            returns_file: false,
            default_document_type: DocumentType::TaxInvoice,
        }
    }
}

impl SourceContext {
    pub fn new(origin_channel: impl Into<String>) -> Self {
        Self {
            origin_channel: origin_channel.into(),
            ..Self::default()
        }
    }

    pub fn with_returns_file(mut self, returns_file: bool) -> Self {
        self.returns_file = returns_file;
        self
    }

    pub fn with_default_document_type(mut self, document_type: DocumentType) -> Self {
        self.default_document_type = document_type;
        self
    }
}

/// Why a row was not turned into a line.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("row has no values")]
    EmptyRow,

    #[error("row has no invoice/document number")]
    MissingDocumentNumber,

    #[error("negative tax rate {rate}")]
    NegativeRate { rate: Decimal },
}

/// A row the normalizer skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub row_index: usize,
    pub origin_channel: String,
    pub document_number: Option<String>,
    pub reason: RejectReason,
}

/// Lines and rejections from one source batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub lines: Vec<CanonicalInvoiceLine>,
    pub rejected: Vec<RejectedRow>,
}

/// Row normalizer bound to one configuration and filer.
pub struct Normalizer<'a> {
    config: &'a FilingConfig,
    filer: &'a FilerContext,
    jurisdictions: JurisdictionTable,
}

impl std::fmt::Debug for Normalizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("filer", &self.filer.tax_id)
            .field("jurisdictions", &self.jurisdictions.len())
            .finish()
    }
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a FilingConfig, filer: &'a FilerContext) -> Self {
        Self {
            config,
            filer,
            jurisdictions: config.jurisdiction_table(),
        }
    }

    /// Normalize every row of a batch.
    pub fn normalize_batch(
        &self,
        rows: &[RawRow],
        mappings: &[HeaderMapping],
        ctx: &SourceContext,
    ) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        for (idx, row) in rows.iter().enumerate() {
            match self.normalize(idx, row, mappings, ctx) {
                Ok(line) => batch.lines.push(line),
                Err(rejected) => {
                    tracing::warn!(
                        row = idx,
                        channel = %rejected.origin_channel,
                        reason = %rejected.reason,
                        "row rejected"
                    );
                    batch.rejected.push(rejected);
                }
            }
        }
        tracing::debug!(
            channel = %ctx.origin_channel,
            lines = batch.lines.len(),
            rejected = batch.rejected.len(),
            "batch normalized"
        );
        batch
    }

    /// Normalize one row.
    pub fn normalize(
        &self,
        row_index: usize,
        raw: &RawRow,
        mappings: &[HeaderMapping],
        ctx: &SourceContext,
    ) -> Result<CanonicalInvoiceLine, RejectedRow> {
        let channel = channel_name(&ctx.origin_channel);
        let reject = |reason: RejectReason, document_number: Option<String>| RejectedRow {
            row_index,
            origin_channel: channel.clone(),
            document_number,
            reason,
        };

        if raw.values().all(is_blank) {
            return Err(reject(RejectReason::EmptyRow, None));
        }

        let row = CanonicalRow::build(raw, mappings, &self.config.field_synonyms);

        let document_number_raw = row
            .text(fields::DOCUMENT_NUMBER)
            .ok_or_else(|| reject(RejectReason::MissingDocumentNumber, None))?;
        let document_number_normalized = normalize_document_number(&document_number_raw);

        let rate = row.rate(fields::TAX_RATE_PERCENT);
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(reject(
                RejectReason::NegativeRate { rate },
                Some(document_number_normalized),
            ));
        }

        let document_type = row
            .text(fields::DOCUMENT_TYPE)
            .and_then(|label| resolve_document_type(&label, &self.config.document_type_aliases))
            .unwrap_or(ctx.default_document_type);

        // Direction.
        let parsed_value = row.money(fields::TAXABLE_VALUE);
        let is_return = ctx.returns_file
            || row.flag(fields::IS_RETURN)
            || (parsed_value.is_sign_negative() && !parsed_value.is_zero());
        let negative = is_return || document_type == DocumentType::CreditNote;
        let signed = |amount: Decimal| {
            if negative {
                negate_money(amount.abs())
            } else {
                amount.abs()
            }
        };
        let taxable_value = signed(parsed_value);

        // Export.
        let export_type = row.text(fields::EXPORT_TYPE).map(|t| t.to_uppercase());
        let shipping_bill_number = row.text(fields::SHIPPING_BILL_NUMBER);
        let is_export = export_type.is_some() || shipping_bill_number.is_some();
        let export_with_payment = export_type
            .as_deref()
            .is_some_and(|t| !t.contains("WOPAY") && t.contains("WPAY"));

        // Place of supply.
        let resolved = row
            .text(fields::SUPPLY_JURISDICTION)
            .and_then(|text| self.jurisdictions.resolve(&text));
        let (supply_jurisdiction_code, jurisdiction_inferred) = match resolved {
            Some(code) => (code, false),
            None if is_export => (export_jurisdiction(&self.filer.jurisdiction), false),
            None => {
                tracing::warn!(
                    row = row_index,
                    document = %document_number_normalized,
                    fallback = %self.filer.jurisdiction,
                    "place of supply unresolved; using filer jurisdiction"
                );
                (self.filer.jurisdiction.clone(), true)
            }
        };

        // Tax.
        let base = taxable_value.abs();
        let split = if is_export {
            if export_with_payment {
                split_tax(base, rate, false)
            } else {
                TaxSplit::zero(false)
            }
        } else {
            compute_tax_split(base, rate, &self.filer.jurisdiction, &supply_jurisdiction_code)
        };
        let computed_tax = if negative { split.negate() } else { split };

        let flags = LineFlags {
            is_return,
            is_reverse_charge: row.flag(fields::REVERSE_CHARGE),
            is_export,
            export_with_payment,
            is_advance: document_type == DocumentType::ReceiptVoucher || row.flag(fields::IS_ADVANCE),
            is_advance_adjustment: row.flag(fields::IS_ADVANCE_ADJUSTMENT),
        };

        let export = is_export.then(|| ExportDetail {
            shipping_bill_number,
            shipping_bill_date: row.date(fields::SHIPPING_BILL_DATE),
            port_code: row.text(fields::PORT_CODE).map(|p| p.to_uppercase()),
        });

        let ecommerce_operator = row
            .text(fields::ECOMMERCE_OPERATOR_TAX_ID)
            .map(|id| id.to_uppercase())
            .or_else(|| self.config.operator_for_channel(&channel).map(str::to_string));

        Ok(CanonicalInvoiceLine {
            document_number_raw,
            document_number_normalized,
            document_type,
            document_date: row.date(fields::DOCUMENT_DATE),
            counterparty_tax_id: row
                .text(fields::COUNTERPARTY_TAX_ID)
                .map(|id| id.replace(char::is_whitespace, "").to_uppercase())
                .filter(|id| !id.is_empty() && !id.starts_with(UNREGISTERED_MARKER)),
            counterparty_name: row.text(fields::COUNTERPARTY_NAME),
            supply_jurisdiction_code,
            origin_jurisdiction_code: self.filer.jurisdiction.clone(),
            taxable_value,
            tax_rate_percent: rate,
            computed_tax,
            cess_amount: signed(row.money(fields::CESS_AMOUNT)),
            flags,
            supply_category: row
                .text(fields::SUPPLY_CATEGORY)
                .map(|t| parse_supply_category(&t))
                .unwrap_or_default(),
            item: ItemDetail {
                hsn_code: row
                    .text(fields::HSN_CODE)
                    .map(|h| h.replace(char::is_whitespace, "")),
                description: row.text(fields::DESCRIPTION),
                uqc: row.text(fields::UQC).map(|u| u.to_uppercase()),
                quantity: signed(row.money(fields::QUANTITY)),
            },
            export,
            section: None,
            provenance: Provenance {
                origin_channel: channel,
                ecommerce_operator,
                jurisdiction_inferred,
                source_row_index: row_index,
                raw_source_row: raw.clone(),
            },
        })
    }
}

fn channel_name(channel: &str) -> String {
    let c = channel.trim().to_lowercase();
    if c.is_empty() {
        "manual".to_string()
    } else {
        c
    }
}

fn export_jurisdiction(fallback: &JurisdictionCode) -> JurisdictionCode {
    JurisdictionCode::new(EXPORT_JURISDICTION).unwrap_or_else(|_| fallback.clone())
}

fn parse_supply_category(text: &str) -> SupplyCategory {
    let t = text.to_lowercase();
    if t.contains("nil") {
        SupplyCategory::NilRated
    } else if t.contains("non") {
        SupplyCategory::NonTaxable
    } else if t.contains("exempt") {
        SupplyCategory::Exempt
    } else {
        SupplyCategory::Taxable
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// A raw row viewed through canonical field names.
struct CanonicalRow<'r> {
    values: BTreeMap<&'r str, &'r Value>,
}

impl<'r> CanonicalRow<'r> {
    fn build(
        raw: &'r RawRow,
        mappings: &'r [HeaderMapping],
        synonyms: &'r [gstr_core::FieldSynonyms],
    ) -> Self {
        let mut values = BTreeMap::new();
        for m in mappings {
            if let Some(v) = raw.get(&m.source_header) {
                values.insert(m.canonical_field.as_str(), v);
            }
        }
        for fs in synonyms {
            if let Some(v) = raw.get(&fs.field) {
                values.entry(fs.field.as_str()).or_insert(v);
            }
        }
        Self { values }
    }

    fn get(&self, field: &str) -> Option<&'r Value> {
        self.values.get(field).copied()
    }

    fn text(&self, field: &str) -> Option<String> {
        let s = match self.get(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!s.is_empty()).then_some(s)
    }

    fn money(&self, field: &str) -> Decimal {
        self.get(field).map(parse_money).unwrap_or(Decimal::ZERO)
    }

    fn rate(&self, field: &str) -> Decimal {
        self.get(field).map(parse_rate).unwrap_or(Decimal::ZERO)
    }

    fn flag(&self, field: &str) -> bool {
        match self.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(
                s.trim().to_lowercase().as_str(),
                "y" | "yes" | "true" | "t" | "1"
            ),
            _ => false,
        }
    }

    fn date(&self, field: &str) -> Option<NaiveDate> {
        let text = self.text(field)?;
        let parsed = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
            .or_else(|| {
                // Timestamps: keep the date part.
                text.get(..10)
                    .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
            });
        if parsed.is_none() {
            tracing::debug!(field, value = %text, "unparseable date ignored");
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMatcher;
    use gstr_core::{FilingPeriod, TaxId};
    use serde_json::json;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn filer() -> FilerContext {
        FilerContext::new(
            TaxId::new("27AAPFU0939F1ZV").unwrap(),
            FilingPeriod::new("032025").unwrap(),
        )
        .unwrap()
    }

    fn row(pairs: &[(&str, Value)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn mapped(raw: &RawRow) -> Vec<HeaderMapping> {
        let headers: Vec<&str> = raw.keys().map(String::as_str).collect();
        HeaderMatcher::from_config(&FilingConfig::default())
            .map_headers(&headers)
            .mappings
    }

    fn normalize(raw: &RawRow, ctx: &SourceContext) -> Result<CanonicalInvoiceLine, RejectedRow> {
        let config = FilingConfig::default();
        let filer = filer();
        let normalizer = Normalizer::new(&config, &filer);
        normalizer.normalize(0, raw, &mapped(raw), ctx)
    }

    // -- Happy path --

    #[test]
    fn intra_state_invoice() {
        let raw = row(&[
            ("Invoice No", json!(" inv-001 ")),
            ("Invoice Date", json!("15/03/2025")),
            ("Taxable Value", json!("₹10,000")),
            ("GST Rate", json!("18%")),
            ("Place of Supply", json!("Maharashtra")),
            ("GSTIN", json!("29abcde1234f1z5")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert_eq!(line.document_number_raw, "inv-001");
        assert_eq!(line.document_number_normalized, "INV-001");
        assert_eq!(line.document_date, NaiveDate::from_ymd_opt(2025, 3, 15));
        assert_eq!(line.taxable_value, d("10000"));
        assert_eq!(line.computed_tax.same_jurisdiction_tax_a, d("900.00"));
        assert_eq!(line.computed_tax.same_jurisdiction_tax_b, d("900.00"));
        assert_eq!(line.counterparty_tax_id.as_deref(), Some("29ABCDE1234F1Z5"));
        assert!(!line.provenance.jurisdiction_inferred);
        assert_eq!(line.provenance.origin_channel, "manual");
        assert_eq!(line.provenance.raw_source_row, raw);
    }

    #[test]
    fn inter_state_invoice() {
        let raw = row(&[
            ("Invoice No", json!("A1")),
            ("Taxable Value", json!(5000)),
            ("Rate", json!(12)),
            ("POS", json!("29-Karnataka")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert_eq!(line.supply_jurisdiction_code.as_str(), "29");
        assert_eq!(line.computed_tax.cross_jurisdiction_tax, d("600.00"));
        assert!(!line.is_intra_jurisdiction());
    }

    #[test]
    fn canonical_column_names_pass_through() {
        let raw = row(&[
            ("document_number", json!("X9")),
            ("taxable_value", json!("100")),
            ("tax_rate_percent", json!("5")),
            ("supply_jurisdiction", json!("27")),
        ]);
        let config = FilingConfig::default();
        let filer = filer();
        let line = Normalizer::new(&config, &filer)
            .normalize(3, &raw, &[], &SourceContext::default())
            .unwrap();
        assert_eq!(line.document_number_normalized, "X9");
        assert_eq!(line.computed_tax.total(), d("5.00"));
        assert_eq!(line.provenance.source_row_index, 3);
    }

    // -- Direction --

    #[test]
    fn negative_value_marks_return_and_negates_tax() {
        let raw = row(&[
            ("Invoice No", json!("R1")),
            ("Taxable Value", json!("(1,000)")),
            ("Rate", json!(18)),
            ("State", json!("Maharashtra")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert!(line.flags.is_return);
        assert_eq!(line.taxable_value, d("-1000"));
        assert_eq!(line.computed_tax.same_jurisdiction_tax_a, d("-90.00"));
        assert_eq!(line.computed_tax.same_jurisdiction_tax_b, d("-90.00"));
    }

    #[test]
    fn returns_file_negates_positive_values() {
        let raw = row(&[
            ("Invoice No", json!("R2")),
            ("Taxable Value", json!(500)),
            ("Rate", json!(5)),
            ("State", json!("Delhi")),
        ]);
        let ctx = SourceContext::new("Meesho").with_returns_file(true);
        let line = normalize(&raw, &ctx).unwrap();
        assert!(line.flags.is_return);
        assert_eq!(line.taxable_value, d("-500"));
        assert_eq!(line.computed_tax.cross_jurisdiction_tax, d("-25.00"));
        assert_eq!(line.provenance.origin_channel, "meesho");
        assert_eq!(line.provenance.ecommerce_operator.as_deref(), Some("07AARCM9332R1CQ"));
    }

    #[test]
    fn credit_notes_are_negative() {
        let raw = row(&[
            ("Note No", json!("CN-7")),
            ("Document Type", json!("Credit Note")),
            ("Taxable Value", json!(200)),
            ("Rate", json!(18)),
            ("State", json!("Maharashtra")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert_eq!(line.document_type, DocumentType::CreditNote);
        assert!(!line.flags.is_return);
        assert_eq!(line.taxable_value, d("-200"));
        assert!(line.computed_tax.total().is_sign_negative());
    }

    // -- Jurisdiction fallback --

    #[test]
    fn unresolved_place_of_supply_is_flagged() {
        let raw = row(&[
            ("Invoice No", json!("J1")),
            ("Taxable Value", json!(100)),
            ("Rate", json!(18)),
            ("Place of Supply", json!("Atlantis")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert!(line.provenance.jurisdiction_inferred);
        assert_eq!(line.supply_jurisdiction_code.as_str(), "27");
        assert!(line.is_intra_jurisdiction());
    }

    // -- Exports, advances, categories --

    #[test]
    fn export_with_payment_is_cross_jurisdiction() {
        let raw = row(&[
            ("Invoice No", json!("E1")),
            ("Taxable Value", json!(1000)),
            ("Rate", json!(18)),
            ("Export Type", json!("wpay")),
            ("Shipping Bill No", json!("SB123")),
            ("Port Code", json!("inbom4")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert!(line.flags.is_export && line.flags.export_with_payment);
        assert_eq!(line.supply_jurisdiction_code.as_str(), "96");
        assert!(!line.provenance.jurisdiction_inferred);
        assert_eq!(line.computed_tax.cross_jurisdiction_tax, d("180.00"));
        assert_eq!(line.export.unwrap().port_code.as_deref(), Some("INBOM4"));
    }

    #[test]
    fn export_without_payment_carries_no_tax() {
        let raw = row(&[
            ("Invoice No", json!("E2")),
            ("Taxable Value", json!(1000)),
            ("Rate", json!(18)),
            ("Export Type", json!("WOPAY")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert!(line.flags.is_export);
        assert!(!line.flags.export_with_payment);
        assert!(line.computed_tax.total().is_zero());
    }

    #[test]
    fn receipt_voucher_is_advance() {
        let raw = row(&[
            ("Invoice No", json!("RV1")),
            ("Doc Type", json!("Receipt Voucher")),
            ("Taxable Value", json!(1000)),
            ("Rate", json!(18)),
            ("State", json!("Maharashtra")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert!(line.flags.is_advance);
    }

    #[test]
    fn supply_category_and_urp() {
        let raw = row(&[
            ("Invoice No", json!("N1")),
            ("Taxable Value", json!(100)),
            ("Supply Category", json!("Nil Rated")),
            ("GSTIN", json!("URP")),
            ("State", json!("27")),
        ]);
        let line = normalize(&raw, &SourceContext::default()).unwrap();
        assert_eq!(line.supply_category, SupplyCategory::NilRated);
        assert_eq!(line.counterparty_tax_id, None);
    }

    #[test]
    fn supply_category_parsing() {
        assert_eq!(parse_supply_category("Exempted"), SupplyCategory::Exempt);
        assert_eq!(parse_supply_category("Non-GST"), SupplyCategory::NonTaxable);
        assert_eq!(parse_supply_category("nil"), SupplyCategory::NilRated);
        assert_eq!(parse_supply_category("regular"), SupplyCategory::Taxable);
    }

    // -- Rejections --

    #[test]
    fn missing_document_number_rejected() {
        let raw = row(&[("Invoice No", json!("  ")), ("Taxable Value", json!(10))]);
        let err = normalize(&raw, &SourceContext::default()).unwrap_err();
        assert_eq!(err.reason, RejectReason::MissingDocumentNumber);
    }

    #[test]
    fn empty_row_rejected() {
        let raw = row(&[("Invoice No", Value::Null), ("Taxable Value", json!(""))]);
        let err = normalize(&raw, &SourceContext::default()).unwrap_err();
        assert_eq!(err.reason, RejectReason::EmptyRow);
    }

    #[test]
    fn negative_rate_rejected() {
        let raw = row(&[
            ("Invoice No", json!("B1")),
            ("Taxable Value", json!(10)),
            ("Rate", json!(-5)),
        ]);
        let err = normalize(&raw, &SourceContext::default()).unwrap_err();
        assert!(matches!(err.reason, RejectReason::NegativeRate { .. }));
        assert_eq!(err.document_number.as_deref(), Some("B1"));
    }

    #[test]
    fn batch_keeps_going_after_rejections() {
        let config = FilingConfig::default();
        let filer = filer();
        let normalizer = Normalizer::new(&config, &filer);
        let rows = vec![
            row(&[("Invoice No", json!("OK1")), ("Taxable Value", json!(10)), ("State", json!("27"))]),
            row(&[("Invoice No", json!("")), ("Taxable Value", json!(10)), ("State", json!("27"))]),
            row(&[("Invoice No", json!("OK2")), ("Taxable Value", json!(20)), ("State", json!("27"))]),
        ];
        let batch = normalizer.normalize_batch(&rows, &mapped(&rows[0]), &SourceContext::default());
        assert_eq!(batch.lines.len(), 2);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].row_index, 1);
    }

    #[test]
    fn reject_reason_serializes_tagged() {
        let json = serde_json::to_value(RejectReason::NegativeRate { rate: d("-5") }).unwrap();
        assert_eq!(json["kind"], "negative_rate");
        assert_eq!(json["rate"], "-5");
    }
}
