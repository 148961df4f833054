//! # Section Classifier
//!
//! Assigns every canonical line to exactly one filing section by an ordered
//! decision list. The first matching rule wins:
//!
//! 1. Credit/debit note: registered counterparty → `cdnr`, else `cdnur`.
//! 2. Export with payment of tax → `exp`.
//! 3. Advance received → `at`; advance adjustment → `atadj`.
//! 4. Zero rate, an export without payment of tax, or an
//!    exempt/nil-rated/non-taxable supply → `exemp`.
//! 5. Registered counterparty → `b2b`.
//! 6. Unregistered counterparty: the document's total taxable value decides
//!    between `b2cl` (strictly above the threshold) and `b2cs`.
//!
//! ## Document Pre-pass
//!
//! Rule 6 is document-level: a line of 120,000 on an invoice whose lines sum
//! to 300,000 is large. [`DocumentTotals`] sums absolute taxable values per
//! (document number, direction) before any line is classified, so a return
//! is measured against the returned document rather than its own line, and
//! a partial return never shrinks the original invoice. The pre-pass shards
//! by document number across the rayon pool.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rust_decimal::Decimal;

use gstr_core::{CanonicalInvoiceLine, FilingConfig, Section, SupplyCategory};

/// Whether a line increases or reverses a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Direction {
    Forward,
    Reversal,
}

impl Direction {
    fn of(line: &CanonicalInvoiceLine) -> Self {
        if line.taxable_value.is_sign_negative() && !line.taxable_value.is_zero() {
            Self::Reversal
        } else {
            Self::Forward
        }
    }
}

type TotalsMap = BTreeMap<(String, Direction), Decimal>;

/// Absolute taxable value per document number and direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTotals {
    totals: TotalsMap,
}

impl DocumentTotals {
    /// Run the pre-pass over a full line set.
    pub fn from_lines(lines: &[CanonicalInvoiceLine]) -> Self {
        let totals = lines
            .par_iter()
            .fold(TotalsMap::new, |mut acc, line| {
                *acc.entry((line.document_number_normalized.clone(), Direction::of(line)))
                    .or_default() += line.taxable_value.abs();
                acc
            })
            .reduce(TotalsMap::new, |mut left, right| {
                for (key, value) in right {
                    *left.entry(key).or_default() += value;
                }
                left
            });
        Self { totals }
    }

    /// The document total a line is measured against.
    pub fn for_line(&self, line: &CanonicalInvoiceLine) -> Decimal {
        self.totals
            .get(&(line.document_number_normalized.clone(), Direction::of(line)))
            .copied()
            .unwrap_or_else(|| line.taxable_value.abs())
    }

    /// Number of distinct (document, direction) groups.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Section classifier bound to a completed document pre-pass.
#[derive(Debug, Clone)]
pub struct Classifier {
    large_threshold: Decimal,
    totals: DocumentTotals,
}

impl Classifier {
    /// Run the document pre-pass over `lines` and bind the threshold.
    pub fn new(config: &FilingConfig, lines: &[CanonicalInvoiceLine]) -> Self {
        Self::with_totals(config.large_unregistered_threshold, DocumentTotals::from_lines(lines))
    }

    pub fn with_totals(large_threshold: Decimal, totals: DocumentTotals) -> Self {
        Self {
            large_threshold,
            totals,
        }
    }

    /// Section for one line. Pure and total.
    pub fn classify(&self, line: &CanonicalInvoiceLine) -> Section {
        if line.document_type.is_note() {
            return if line.is_registered() {
                Section::Cdnr
            } else {
                Section::Cdnur
            };
        }
        if line.flags.is_export && line.flags.export_with_payment {
            return Section::Exp;
        }
        if line.flags.is_advance {
            return Section::At;
        }
        if line.flags.is_advance_adjustment {
            return Section::Atadj;
        }
        let zero_rated = line.tax_rate_percent.is_zero()
            || (line.flags.is_export && !line.flags.export_with_payment);
        if zero_rated || line.supply_category != SupplyCategory::Taxable {
            return Section::Exempt;
        }
        if line.is_registered() {
            return Section::B2b;
        }
        if self.totals.for_line(line) > self.large_threshold {
            Section::B2cl
        } else {
            Section::B2cs
        }
    }

    /// Assign a section to every line.
    pub fn classify_all(&self, lines: Vec<CanonicalInvoiceLine>) -> Vec<CanonicalInvoiceLine> {
        lines
            .into_par_iter()
            .map(|line| {
                let section = self.classify(&line);
                line.with_section(section)
            })
            .collect()
    }
}

/// Classify a line set with a fresh pre-pass.
pub fn classify_lines(
    config: &FilingConfig,
    lines: Vec<CanonicalInvoiceLine>,
) -> Vec<CanonicalInvoiceLine> {
    let classifier = Classifier::new(config, &lines);
    classifier.classify_all(lines)
}
