//! # Filing Sections
//!
//! The mutually exclusive sections a classified line can land in. Derived
//! tables (HSN summary, e-commerce operator tables, documents issued) are
//! not sections: they are computed from lines that already belong to one.

use serde::{Deserialize, Serialize};

/// A filing section. Every classified line belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Invoices to registered buyers.
    B2b,
    /// Large invoices to unregistered buyers.
    B2cl,
    /// Small supplies to unregistered buyers, summarized.
    B2cs,
    /// Credit/debit notes to registered buyers.
    Cdnr,
    /// Credit/debit notes to unregistered buyers.
    Cdnur,
    /// Exports with payment of tax.
    Exp,
    /// Advances received.
    At,
    /// Adjustment of advances.
    Atadj,
    /// Nil-rated, exempt, and non-taxable supplies.
    #[serde(rename = "exemp")]
    Exempt,
}

impl Section {
    /// All sections in filing order.
    pub fn all() -> &'static [Section] {
        &[
            Self::B2b,
            Self::B2cl,
            Self::B2cs,
            Self::Cdnr,
            Self::Cdnur,
            Self::Exp,
            Self::At,
            Self::Atadj,
            Self::Exempt,
        ]
    }

    /// Wire key of the section.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B2b => "b2b",
            Self::B2cl => "b2cl",
            Self::B2cs => "b2cs",
            Self::Cdnr => "cdnr",
            Self::Cdnur => "cdnur",
            Self::Exp => "exp",
            Self::At => "at",
            Self::Atadj => "atadj",
            Self::Exempt => "exemp",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::B2b => "Invoices to registered buyers",
            Self::B2cl => "Large invoices to unregistered buyers",
            Self::B2cs => "Small supplies to unregistered buyers",
            Self::Cdnr => "Credit/debit notes to registered buyers",
            Self::Cdnur => "Credit/debit notes to unregistered buyers",
            Self::Exp => "Exports with payment of tax",
            Self::At => "Advances received",
            Self::Atadj => "Adjustment of advances",
            Self::Exempt => "Nil-rated, exempt, and non-taxable supplies",
        }
    }

    /// Whether the section reports supplies (as opposed to advances).
    pub fn is_supply(&self) -> bool {
        !matches!(self, Self::At | Self::Atadj)
    }

    /// Whether the section's lines go to registered buyers.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::B2b | Self::Cdnr)
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
