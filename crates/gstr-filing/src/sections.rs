//! # Section Layout Table
//!
//! One row per filing section: its output shape, the key its rows are
//! grouped by, and the canonical fields a source file needs to feed it. The
//! aggregation engine reads this table instead of carrying one code path per
//! section.

use serde::{Deserialize, Serialize};

use gstr_core::fields;
use gstr_core::Section;
use gstr_ingest::MappingReport;

/// How a section's output is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Per-document detail with a rate-wise item breakdown.
    Itemized,
    /// One row per bucket, no document detail.
    Summarized,
}

/// A component of a section grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyField {
    /// Counterparty tax id.
    Counterparty,
    /// Place-of-supply code.
    Jurisdiction,
    /// `WPAY` or `WOPAY`.
    ExportType,
    /// `INTRA` or `INTER`.
    SupplyDirection,
    /// `E` for operator-facilitated supplies, `OE` otherwise.
    ChannelType,
    /// E-commerce operator tax id, empty when none.
    Operator,
    /// Tax rate in percent.
    Rate,
    /// Registration by direction: `INTRB2B`, `INTERB2B`, `INTRB2C`, `INTERB2C`.
    SupplyType,
}

impl KeyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counterparty => "counterparty",
            Self::Jurisdiction => "jurisdiction",
            Self::ExportType => "export_type",
            Self::SupplyDirection => "supply_direction",
            Self::ChannelType => "channel_type",
            Self::Operator => "operator",
            Self::Rate => "rate",
            Self::SupplyType => "supply_type",
        }
    }
}

impl std::fmt::Display for KeyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub section: Section,
    pub shape: Shape,
    /// Grouping key, outermost first. Itemized sections additionally group
    /// by document number inside each key.
    pub grouping: &'static [KeyField],
    pub required_fields: &'static [&'static str],
}

/// Layout of every section, in [`Section::all`] order.
pub const SECTION_SPECS: [SectionSpec; 9] = [
    SectionSpec {
        section: Section::B2b,
        shape: Shape::Itemized,
        grouping: &[KeyField::Counterparty],
        required_fields: &[
            fields::COUNTERPARTY_TAX_ID,
            fields::DOCUMENT_NUMBER,
            fields::DOCUMENT_DATE,
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
            fields::SUPPLY_JURISDICTION,
        ],
    },
    SectionSpec {
        section: Section::B2cl,
        shape: Shape::Itemized,
        grouping: &[KeyField::Jurisdiction],
        required_fields: &[
            fields::DOCUMENT_NUMBER,
            fields::DOCUMENT_DATE,
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
            fields::SUPPLY_JURISDICTION,
        ],
    },
    SectionSpec {
        section: Section::B2cs,
        shape: Shape::Summarized,
        grouping: &[
            KeyField::SupplyDirection,
            KeyField::Jurisdiction,
            KeyField::ChannelType,
            KeyField::Operator,
            KeyField::Rate,
        ],
        required_fields: &[
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
            fields::SUPPLY_JURISDICTION,
        ],
    },
    SectionSpec {
        section: Section::Cdnr,
        shape: Shape::Itemized,
        grouping: &[KeyField::Counterparty],
        required_fields: &[
            fields::COUNTERPARTY_TAX_ID,
            fields::DOCUMENT_NUMBER,
            fields::DOCUMENT_TYPE,
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
        ],
    },
    SectionSpec {
        section: Section::Cdnur,
        shape: Shape::Itemized,
        grouping: &[],
        required_fields: &[
            fields::DOCUMENT_NUMBER,
            fields::DOCUMENT_TYPE,
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
        ],
    },
    SectionSpec {
        section: Section::Exp,
        shape: Shape::Itemized,
        grouping: &[KeyField::ExportType],
        required_fields: &[
            fields::DOCUMENT_NUMBER,
            fields::EXPORT_TYPE,
            fields::SHIPPING_BILL_NUMBER,
            fields::PORT_CODE,
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
        ],
    },
    SectionSpec {
        section: Section::At,
        shape: Shape::Summarized,
        grouping: &[KeyField::Jurisdiction, KeyField::SupplyDirection, KeyField::Rate],
        required_fields: &[
            fields::IS_ADVANCE,
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
            fields::SUPPLY_JURISDICTION,
        ],
    },
    SectionSpec {
        section: Section::Atadj,
        shape: Shape::Summarized,
        grouping: &[KeyField::Jurisdiction, KeyField::SupplyDirection, KeyField::Rate],
        required_fields: &[
            fields::IS_ADVANCE_ADJUSTMENT,
            fields::TAXABLE_VALUE,
            fields::TAX_RATE_PERCENT,
            fields::SUPPLY_JURISDICTION,
        ],
    },
    SectionSpec {
        section: Section::Exempt,
        shape: Shape::Summarized,
        grouping: &[KeyField::SupplyType],
        required_fields: &[fields::SUPPLY_CATEGORY, fields::TAXABLE_VALUE],
    },
];

/// Layout for a section.
pub fn spec_for(section: Section) -> &'static SectionSpec {
    SECTION_SPECS
        .iter()
        .find(|spec| spec.section == section)
        .unwrap_or(&SECTION_SPECS[0])
}

/// Pick the section a source file most plausibly feeds.
///
/// The section whose required fields are best covered by the mapping wins;
/// equal coverage goes to the section requiring more fields, then to table
/// order. Returns `None` when no section reaches `min_coverage`.
pub fn suggest_section(report: &MappingReport, min_coverage: f64) -> Option<Section> {
    let mut best: Option<(f64, usize, Section)> = None;
    for spec in &SECTION_SPECS {
        let coverage = report.coverage(spec.required_fields);
        let specificity = spec.required_fields.len();
        let better = match best {
            None => true,
            Some((c, s, _)) => coverage > c || (coverage == c && specificity > s),
        };
        if better {
            best = Some((coverage, specificity, spec.section));
        }
    }
    best.filter(|(coverage, _, _)| *coverage >= min_coverage)
        .map(|(_, _, section)| section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gstr_ingest::HeaderMatcher;
    use gstr_core::FilingConfig;

    #[test]
    fn table_covers_every_section_in_order() {
        let sections: Vec<Section> = SECTION_SPECS.iter().map(|s| s.section).collect();
        assert_eq!(sections, Section::all().to_vec());
        for section in Section::all() {
            assert_eq!(spec_for(*section).section, *section);
        }
    }

    #[test]
    fn shapes() {
        assert_eq!(spec_for(Section::B2b).shape, Shape::Itemized);
        assert_eq!(spec_for(Section::Exp).shape, Shape::Itemized);
        assert_eq!(spec_for(Section::B2cs).shape, Shape::Summarized);
        assert_eq!(spec_for(Section::Exempt).shape, Shape::Summarized);
    }

    #[test]
    fn suggests_b2b_for_registered_sales_file() {
        let matcher = HeaderMatcher::from_config(&FilingConfig::default());
        let report = matcher.map_headers(&[
            "GSTIN of Recipient",
            "Invoice Number",
            "Invoice Date",
            "Taxable Value",
            "Rate",
            "Place Of Supply",
        ]);
        assert_eq!(suggest_section(&report, 0.75), Some(Section::B2b));
    }

    #[test]
    fn suggests_nothing_below_coverage() {
        let matcher = HeaderMatcher::from_config(&FilingConfig::default());
        let report = matcher.map_headers(&["Remarks"]);
        assert_eq!(suggest_section(&report, 0.75), None);
    }
}
