//! # Document Types
//!
//! The six document types a line can belong to, the alias table that maps
//! free-text labels onto them, and document-number normalization.

use serde::{Deserialize, Serialize};

/// Kind of document an invoice line was issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Outward tax invoice.
    TaxInvoice,
    /// Credit note reducing an earlier invoice.
    CreditNote,
    /// Debit note increasing an earlier invoice.
    DebitNote,
    /// Delivery challan (job work, approval, and similar).
    DeliveryChallan,
    /// Refund voucher against an advance.
    RefundVoucher,
    /// Receipt voucher for an advance received.
    ReceiptVoucher,
}

impl DocumentType {
    /// All document types in declaration order.
    pub fn all() -> &'static [DocumentType] {
        &[
            Self::TaxInvoice,
            Self::CreditNote,
            Self::DebitNote,
            Self::DeliveryChallan,
            Self::RefundVoucher,
            Self::ReceiptVoucher,
        ]
    }

    /// Snake-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaxInvoice => "tax_invoice",
            Self::CreditNote => "credit_note",
            Self::DebitNote => "debit_note",
            Self::DeliveryChallan => "delivery_challan",
            Self::RefundVoucher => "refund_voucher",
            Self::ReceiptVoucher => "receipt_voucher",
        }
    }

    /// Whether this is a credit or debit note.
    pub fn is_note(&self) -> bool {
        matches!(self, Self::CreditNote | Self::DebitNote)
    }

    /// Nature-of-document label used by the documents-issued table.
    pub fn portal_label(&self) -> &'static str {
        match self {
            Self::TaxInvoice => "Invoices for outward supply",
            Self::DebitNote => "Debit Note",
            Self::CreditNote => "Credit Note",
            Self::ReceiptVoucher => "Receipt Voucher",
            Self::RefundVoucher => "Refund Voucher",
            Self::DeliveryChallan => "Delivery Challan for job work",
        }
    }

    /// Position in the documents-issued table.
    pub fn portal_order(&self) -> u8 {
        match self {
            Self::TaxInvoice => 1,
            Self::DebitNote => 4,
            Self::CreditNote => 5,
            Self::ReceiptVoucher => 6,
            Self::RefundVoucher => 8,
            Self::DeliveryChallan => 9,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured alias for a document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeAlias {
    /// Free-text label as it appears in source data.
    pub alias: String,
    /// Document type the label denotes.
    pub document_type: DocumentType,
}

/// Resolve a free-text document type label.
///
/// Tries the canonical snake-case names, then an exact alias match, then the
/// longest alias contained in the label.
pub fn resolve_document_type(label: &str, aliases: &[DocumentTypeAlias]) -> Option<DocumentType> {
    let normalized: String = label
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if normalized.is_empty() {
        return None;
    }

    if let Some(dt) = DocumentType::all()
        .iter()
        .find(|dt| dt.as_str().replace('_', " ") == normalized)
    {
        return Some(*dt);
    }

    if let Some(a) = aliases.iter().find(|a| a.alias == normalized) {
        return Some(a.document_type);
    }

    aliases
        .iter()
        .filter(|a| {
            // Short aliases ("cn", "dn") only count as whole words.
            if a.alias.len() <= 2 {
                normalized.split(' ').any(|w| w == a.alias)
            } else {
                normalized.contains(a.alias.as_str())
            }
        })
        .max_by_key(|a| a.alias.len())
        .map(|a| a.document_type)
}

/// Trimmed, uppercased document number used for grouping and ranges.
pub fn normalize_document_number(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Default alias table.
pub fn default_aliases() -> Vec<DocumentTypeAlias> {
    [
        ("invoice", DocumentType::TaxInvoice),
        ("tax invoice", DocumentType::TaxInvoice),
        ("inv", DocumentType::TaxInvoice),
        ("credit note", DocumentType::CreditNote),
        ("credit", DocumentType::CreditNote),
        ("cn", DocumentType::CreditNote),
        ("debit note", DocumentType::DebitNote),
        ("debit", DocumentType::DebitNote),
        ("dn", DocumentType::DebitNote),
        ("delivery challan", DocumentType::DeliveryChallan),
        ("challan", DocumentType::DeliveryChallan),
        ("refund voucher", DocumentType::RefundVoucher),
        ("refund", DocumentType::RefundVoucher),
        ("receipt voucher", DocumentType::ReceiptVoucher),
        ("receipt", DocumentType::ReceiptVoucher),
        ("advance receipt", DocumentType::ReceiptVoucher),
    ]
    .into_iter()
    .map(|(alias, document_type)| DocumentTypeAlias {
        alias: alias.to_string(),
        document_type,
    })
    .collect()
}
