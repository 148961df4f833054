//! # Canonical Invoice Line
//!
//! One line of a transaction after normalization. Created once by the
//! normalizer, assigned a section once by the classifier, and read-only
//! everywhere after that.
//!
//! ## Sign Convention
//!
//! `taxable_value`, every `computed_tax` component, and `cess_amount` carry
//! the line's true direction: negative for returns and credit notes. Tax is
//! computed on the absolute value and the sign reapplied uniformly.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::DocumentType;
use crate::identity::is_registered_counterparty;
use crate::jurisdiction::JurisdictionCode;
use crate::money::TaxSplit;
use crate::section::Section;

/// A raw source row: column header to cell value.
pub type RawRow = BTreeMap<String, Value>;

/// Tax treatment category of a supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SupplyCategory {
    /// Ordinary taxable supply.
    #[default]
    Taxable,
    /// Exempt supply.
    Exempt,
    /// Nil-rated supply.
    NilRated,
    /// Supply outside the tax (non-GST).
    NonTaxable,
}

impl SupplyCategory {
    /// Snake-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taxable => "taxable",
            Self::Exempt => "exempt",
            Self::NilRated => "nil_rated",
            Self::NonTaxable => "non_taxable",
        }
    }
}

impl std::fmt::Display for SupplyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean attributes of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LineFlags {
    /// Sales return, either flagged at source or inferred from a negative value.
    pub is_return: bool,
    /// Tax payable by the recipient.
    pub is_reverse_charge: bool,
    /// Export of goods or services.
    pub is_export: bool,
    /// Export made with payment of tax.
    pub export_with_payment: bool,
    /// Advance received with no linked invoice yet.
    pub is_advance: bool,
    /// Adjustment of an advance received in an earlier period.
    pub is_advance_adjustment: bool,
}

/// Goods/services detail used by the HSN summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemDetail {
    pub hsn_code: Option<String>,
    pub description: Option<String>,
    pub uqc: Option<String>,
    pub quantity: Decimal,
}

/// Shipping detail for export lines.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ExportDetail {
    pub shipping_bill_number: Option<String>,
    pub shipping_bill_date: Option<NaiveDate>,
    pub port_code: Option<String>,
}

/// Where a line came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// Sales channel the source file came from (`manual` when unknown).
    pub origin_channel: String,
    /// Tax id of the e-commerce operator that facilitated the supply.
    pub ecommerce_operator: Option<String>,
    /// True when the place of supply could not be resolved and the filer's
    /// own jurisdiction was substituted.
    pub jurisdiction_inferred: bool,
    /// Zero-based row index in the source batch.
    pub source_row_index: usize,
    /// The source row exactly as received.
    pub raw_source_row: RawRow,
}

/// One normalized invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalInvoiceLine {
    pub document_number_raw: String,
    pub document_number_normalized: String,
    pub document_type: DocumentType,
    pub document_date: Option<NaiveDate>,

    pub counterparty_tax_id: Option<String>,
    pub counterparty_name: Option<String>,
    pub supply_jurisdiction_code: JurisdictionCode,
    pub origin_jurisdiction_code: JurisdictionCode,

    pub taxable_value: Decimal,
    pub tax_rate_percent: Decimal,
    pub computed_tax: TaxSplit,
    pub cess_amount: Decimal,

    pub flags: LineFlags,
    pub supply_category: SupplyCategory,
    pub item: ItemDetail,
    pub export: Option<ExportDetail>,

    /// Set exactly once by the classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,

    pub provenance: Provenance,
}

impl CanonicalInvoiceLine {
    /// Whether the counterparty is a registered buyer.
    pub fn is_registered(&self) -> bool {
        is_registered_counterparty(self.counterparty_tax_id.as_deref())
    }

    /// Whether origin and place of supply coincide.
    pub fn is_intra_jurisdiction(&self) -> bool {
        self.computed_tax.is_intra_jurisdiction
    }

    /// Total tax on the line, signed.
    pub fn total_tax(&self) -> Decimal {
        self.computed_tax.total()
    }

    /// Taxable value plus tax plus cess, signed.
    pub fn line_value(&self) -> Decimal {
        self.taxable_value + self.total_tax() + self.cess_amount
    }

    /// Consume the line and return it with its section assigned.
    ///
    /// A line that already carries a section keeps it.
    pub fn with_section(mut self, section: Section) -> Self {
        if self.section.is_none() {
            self.section = Some(section);
        } else if self.section != Some(section) {
            tracing::warn!(
                document = %self.document_number_normalized,
                existing = ?self.section,
                attempted = %section,
                "line already classified; keeping existing section"
            );
        }
        self
    }
}
