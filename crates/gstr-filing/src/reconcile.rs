//! # Reconciliation
//!
//! Cross-checks totals that report the same transactions in two places,
//! using only aggregated outputs. Each table sums its own rounded rows, so
//! two correct tables can still differ by a few paise; comparisons use an
//! absolute tolerance.
//!
//! Checks:
//!
//! - HSN summary vs supply sections, taxable value and tax. Skipped with a
//!   warning when some supply line has no HSN code, since the HSN tables
//!   then cover only part of the supplies.
//! - Unregistered operator table vs operator rows of `b2cs` plus operator
//!   documents of `b2cl` and `cdnur`.
//! - Registered operator table vs operator documents of `b2b` and `cdnr`.
//!
//! The report is advisory. A failed check adds a warning and clears
//! `overall_pass`; it never stops assembly.

use rust_decimal::Decimal;
use serde::Serialize;

use gstr_core::money::round_money;
use gstr_core::Section;

use crate::aggregate::{Amounts, FilingTables};
use crate::derived::{OPERATOR_REGISTERED_SECTIONS, OPERATOR_UNREGISTERED_SECTIONS};
use crate::sections::KeyField;

/// Outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationCheck {
    pub name: String,
    pub expected_total: Decimal,
    pub actual_total: Decimal,
    /// Absolute difference.
    pub difference: Decimal,
    pub within_tolerance: bool,
}

impl ReconciliationCheck {
    fn compare(name: &str, expected: Decimal, actual: Decimal, tolerance: Decimal) -> Self {
        let expected_total = round_money(expected);
        let actual_total = round_money(actual);
        let difference = round_money((expected_total - actual_total).abs());
        Self {
            name: name.to_string(),
            expected_total,
            actual_total,
            within_tolerance: difference <= tolerance,
            difference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub per_check: Vec<ReconciliationCheck>,
    pub overall_pass: bool,
    pub warnings: Vec<String>,
}

impl ReconciliationReport {
    pub fn failures(&self) -> impl Iterator<Item = &ReconciliationCheck> {
        self.per_check.iter().filter(|c| !c.within_tolerance)
    }
}

/// Run every applicable check over aggregated tables.
pub fn reconcile(tables: &FilingTables, tolerance: Decimal) -> ReconciliationReport {
    let mut per_check = Vec::new();
    let mut warnings = Vec::new();

    if tables.hsn.lines_missing_hsn == 0 {
        let supplies: Amounts = tables
            .sections
            .values()
            .filter(|s| s.section.is_supply())
            .map(|s| &s.totals)
            .sum();
        let hsn = tables.hsn.totals();
        per_check.push(ReconciliationCheck::compare(
            "hsn_vs_sections_taxable_value",
            supplies.taxable_value,
            hsn.taxable_value,
            tolerance,
        ));
        per_check.push(ReconciliationCheck::compare(
            "hsn_vs_sections_tax",
            supplies.total_tax(),
            hsn.total_tax(),
            tolerance,
        ));
    } else {
        warnings.push(format!(
            "hsn reconciliation skipped: {} supply lines have no HSN code",
            tables.hsn.lines_missing_hsn
        ));
    }

    let (unregistered_expected, unregistered_sources) = operator_section_total(
        tables,
        &OPERATOR_UNREGISTERED_SECTIONS,
    );
    if unregistered_sources > 0 || !tables.ecommerce.unregistered.is_empty() {
        let actual: Amounts = tables.ecommerce.unregistered.iter().map(|r| &r.amounts).sum();
        per_check.push(ReconciliationCheck::compare(
            "ecommerce_unregistered_vs_sections",
            unregistered_expected,
            actual.taxable_value,
            tolerance,
        ));
    }

    let (registered_expected, registered_sources) =
        operator_section_total(tables, &OPERATOR_REGISTERED_SECTIONS);
    if registered_sources > 0 || !tables.ecommerce.registered.is_empty() {
        let actual: Amounts = tables.ecommerce.registered.iter().map(|r| &r.amounts).sum();
        per_check.push(ReconciliationCheck::compare(
            "ecommerce_registered_vs_sections",
            registered_expected,
            actual.taxable_value,
            tolerance,
        ));
    }

    for check in per_check.iter().filter(|c| !c.within_tolerance) {
        tracing::warn!(
            check = %check.name,
            expected = %check.expected_total,
            actual = %check.actual_total,
            difference = %check.difference,
            "reconciliation mismatch"
        );
        warnings.push(format!(
            "{}: expected {}, found {} (difference {} exceeds tolerance {})",
            check.name, check.expected_total, check.actual_total, check.difference, tolerance
        ));
    }

    ReconciliationReport {
        overall_pass: per_check.iter().all(|c| c.within_tolerance),
        per_check,
        warnings,
    }
}

/// Taxable value of operator-facilitated rows and documents in `sections`,
/// with the number of contributing rows/documents.
fn operator_section_total(tables: &FilingTables, sections: &[Section]) -> (Decimal, usize) {
    let mut total = Decimal::ZERO;
    let mut sources = 0;
    for output in sections.iter().filter_map(|s| tables.section(*s)) {
        for row in output.rows() {
            if row.key.text(KeyField::ChannelType) == Some("E") {
                total += row.amounts.taxable_value;
                sources += 1;
            }
        }
        for (_, document) in output.documents() {
            if document.ecommerce_operator.is_some() {
                total += document.amounts().taxable_value;
                sources += 1;
            }
        }
    }
    (total, sources)
}
