//! # Money & Tax Arithmetic
//!
//! Exact decimal parsing, half-up rounding, and the intra-/inter-jurisdiction
//! tax split. Every monetary figure in the engine is a [`Decimal`]; binary
//! floating point never touches an amount.
//!
//! ## Rounding
//!
//! Tax authorities specify round-half-up (ties away from zero). This module
//! uses `RoundingStrategy::MidpointAwayFromZero` exclusively. Banker's
//! rounding would drift by a paisa on ties and misfile returns.
//!
//! ## Split Rule
//!
//! For a same-jurisdiction supply the rounded tax is divided into two legs:
//! the first leg is `round(raw / 2)` and the second leg is
//! `round(raw) - first`. The legs therefore always sum exactly to
//! `round(raw)` and the rounding remainder is zero for every input.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GstrError;
use crate::jurisdiction::JurisdictionCode;

/// Decimal places carried by every rounded monetary figure.
pub const MONEY_SCALE: u32 = 2;

const CURRENCY_MARKERS: [&str; 7] = ["₹", "$", "€", "£", "Rs.", "Rs", "INR"];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a loosely formatted monetary value into an exact decimal.
///
/// Accepts JSON numbers, decimal strings, currency-prefixed strings,
/// comma-grouped strings, and accounting-style parenthesized negatives.
/// Returns exact zero for null, empty, boolean, or unparseable input and
/// never fails.
pub fn parse_money(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Decimal::from(i)
            } else if let Some(u) = n.as_u64() {
                Decimal::from(u)
            } else {
                parse_money_str(&n.to_string())
            }
        }
        Value::String(s) => parse_money_str(s),
        _ => Decimal::ZERO,
    }
}

/// String form of [`parse_money`].
pub fn parse_money_str(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let mut cleaned = body.to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    let cleaned: String = cleaned
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let parsed = Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned));
    match parsed {
        Ok(d) if negative => negate_money(d.abs()),
        Ok(d) => d,
        Err(_) => {
            tracing::debug!(input = %raw, "unparseable monetary value treated as zero");
            Decimal::ZERO
        }
    }
}

/// Parse a tax rate in percent. Accepts a trailing `%` and normalizes the
/// scale so `18`, `18.0`, and `"18%"` compare and group identically.
pub fn parse_rate(value: &Value) -> Decimal {
    let rate = match value {
        Value::String(s) => parse_money_str(s.trim().trim_end_matches('%')),
        other => parse_money(other),
    };
    rate.normalize()
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to `places` decimal places, ties away from zero.
pub fn round_half_up(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Round half-up to [`MONEY_SCALE`] and fix the scale so the value always
/// renders with two decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = round_half_up(value, MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    if rounded.is_zero() {
        // Drop a negative sign on zero so it renders as "0.00".
        return money_zero();
    }
    rounded
}

/// Zero at monetary scale (`0.00`).
pub fn money_zero() -> Decimal {
    Decimal::new(0, MONEY_SCALE)
}

/// Negate an amount without producing a signed zero.
pub fn negate_money(value: Decimal) -> Decimal {
    if value.is_zero() {
        value.abs()
    } else {
        -value
    }
}

// ---------------------------------------------------------------------------
// Tax split
// ---------------------------------------------------------------------------

/// Result of splitting tax on one line between jurisdictions.
///
/// Exactly one side is populated: the same-jurisdiction pair for an intra
/// supply, or the cross-jurisdiction component for an inter supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxSplit {
    /// First same-jurisdiction leg (`round(raw / 2)`).
    pub same_jurisdiction_tax_a: Decimal,
    /// Second same-jurisdiction leg (`round(raw) - a`).
    pub same_jurisdiction_tax_b: Decimal,
    /// Cross-jurisdiction tax (`round(raw)`).
    pub cross_jurisdiction_tax: Decimal,
    /// `round(raw) - (a + b + cross)`. Always zero.
    pub rounding_remainder: Decimal,
    /// Whether the supply stayed inside one jurisdiction.
    pub is_intra_jurisdiction: bool,
}

impl TaxSplit {
    /// A split carrying no tax.
    pub fn zero(is_intra_jurisdiction: bool) -> Self {
        Self {
            same_jurisdiction_tax_a: money_zero(),
            same_jurisdiction_tax_b: money_zero(),
            cross_jurisdiction_tax: money_zero(),
            rounding_remainder: money_zero(),
            is_intra_jurisdiction,
        }
    }

    /// Sum of all three components.
    pub fn total(&self) -> Decimal {
        self.same_jurisdiction_tax_a + self.same_jurisdiction_tax_b + self.cross_jurisdiction_tax
    }

    /// The same split with every component sign-flipped.
    pub fn negate(&self) -> Self {
        Self {
            same_jurisdiction_tax_a: negate_money(self.same_jurisdiction_tax_a),
            same_jurisdiction_tax_b: negate_money(self.same_jurisdiction_tax_b),
            cross_jurisdiction_tax: negate_money(self.cross_jurisdiction_tax),
            rounding_remainder: negate_money(self.rounding_remainder),
            is_intra_jurisdiction: self.is_intra_jurisdiction,
        }
    }

    /// Check the zero-remainder invariant against the inputs the split was
    /// computed from.
    pub fn check_invariant(&self, taxable_value: Decimal, rate: Decimal) -> Result<(), GstrError> {
        let expected = round_money(raw_tax(taxable_value.abs(), rate).unwrap_or(Decimal::ZERO));
        let remainder = expected - self.total().abs();
        let one_sided = if self.is_intra_jurisdiction {
            self.cross_jurisdiction_tax.is_zero()
        } else {
            self.same_jurisdiction_tax_a.is_zero() && self.same_jurisdiction_tax_b.is_zero()
        };
        if remainder.is_zero() && self.rounding_remainder.is_zero() && one_sided {
            Ok(())
        } else {
            Err(GstrError::ArithmeticInvariant {
                taxable_value,
                rate,
                remainder,
            })
        }
    }
}

fn raw_tax(taxable_value: Decimal, rate_percent: Decimal) -> Option<Decimal> {
    taxable_value
        .checked_mul(rate_percent)?
        .checked_div(Decimal::ONE_HUNDRED)
}

/// Compute the tax split for one line.
///
/// `raw = taxable_value * rate_percent / 100` is carried unrounded. When the
/// origin and destination match, `raw` is split into two legs; otherwise the
/// whole rounded amount is cross-jurisdiction tax.
pub fn compute_tax_split(
    taxable_value: Decimal,
    rate_percent: Decimal,
    origin: &JurisdictionCode,
    destination: &JurisdictionCode,
) -> TaxSplit {
    split_tax(taxable_value, rate_percent, origin == destination)
}

/// [`compute_tax_split`] with the jurisdiction relation already decided.
pub fn split_tax(taxable_value: Decimal, rate_percent: Decimal, is_intra: bool) -> TaxSplit {
    let Some(raw) = raw_tax(taxable_value, rate_percent) else {
        tracing::warn!(
            taxable_value = %taxable_value,
            rate = %rate_percent,
            "tax computation overflowed; line carries zero tax"
        );
        return TaxSplit::zero(is_intra);
    };
    let total = round_money(raw);

    let split = if is_intra {
        let a = round_money(raw / Decimal::TWO);
        let b = round_money(total - a);
        TaxSplit {
            same_jurisdiction_tax_a: a,
            same_jurisdiction_tax_b: b,
            cross_jurisdiction_tax: money_zero(),
            rounding_remainder: round_money(total - (a + b)),
            is_intra_jurisdiction: true,
        }
    } else {
        TaxSplit {
            same_jurisdiction_tax_a: money_zero(),
            same_jurisdiction_tax_b: money_zero(),
            cross_jurisdiction_tax: total,
            rounding_remainder: money_zero(),
            is_intra_jurisdiction: false,
        }
    };
    debug_assert!(split.rounding_remainder.is_zero());
    split
}
