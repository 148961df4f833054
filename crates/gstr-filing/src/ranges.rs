//! # Document Range Detector
//!
//! Gap detection over sparse serial sets. Each document number splits into
//! an alphabetic prefix and a trailing serial of 1-12 digits; numbers within
//! one (key, prefix) group form a range from the smallest to the largest
//! serial, and every absent integer in between is a missing (cancelled)
//! serial.
//!
//! ## Complexity
//!
//! Distinct serials are collected into a `BTreeSet` and gaps are found
//! between sorted neighbours: O(n log n) in the number of documents,
//! independent of the numeric span. A group spanning `INV1..INV999999999999`
//! costs the same as one spanning `INV1..INV3`.
//!
//! ## Invariant
//!
//! For every range, `found_count + missing_count == expected_count`.
//! `missing_serials` and `missing_ranges` are display lists truncated to the
//! configured limits; the counts are never truncated.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use gstr_core::FilingConfig;

const MAX_SERIAL_DIGITS: usize = 12;

/// A document number split into prefix and serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSerial {
    pub prefix: String,
    pub serial: u64,
    pub pad_width: usize,
}

/// Split off the trailing run of digits.
///
/// The serial is at most the last twelve digits; longer runs fold their
/// leading digits into the prefix. Returns `None` when the number has no
/// trailing digit.
pub fn split_document_number(number: &str) -> Option<SplitSerial> {
    let digits = number
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .take(MAX_SERIAL_DIGITS)
        .count();
    if digits == 0 {
        return None;
    }
    let (prefix, tail) = number.split_at(number.len() - digits);
    let serial = tail.parse().ok()?;
    Some(SplitSerial {
        prefix: prefix.to_string(),
        serial,
        pad_width: digits,
    })
}

/// Display bounds for range output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeLimits {
    pub missing_serials: usize,
    pub missing_ranges: usize,
    pub non_sequential: usize,
}

impl RangeLimits {
    pub fn from_config(config: &FilingConfig) -> Self {
        Self {
            missing_serials: config.missing_serial_display_limit,
            missing_ranges: config.missing_range_display_limit,
            non_sequential: config.non_sequential_display_limit,
        }
    }
}

impl Default for RangeLimits {
    fn default() -> Self {
        Self::from_config(&FilingConfig::default())
    }
}

/// A contiguous run of missing serials, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRange {
    pub start: u64,
    pub end: u64,
}

impl MissingRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// The detected range for one (key, prefix) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRange<K> {
    pub key: K,
    pub prefix: String,
    pub first_serial: u64,
    pub last_serial: u64,
    pub pad_width: usize,
    /// `first_serial` formatted back with prefix and padding.
    pub document_from: String,
    /// `last_serial` formatted back with prefix and padding.
    pub document_to: String,
    pub found_count: u64,
    pub expected_count: u64,
    pub missing_count: u64,
    /// Missing serials, ascending, truncated to the display limit.
    pub missing_serials: Vec<u64>,
    /// Compressed missing runs, ascending, truncated to the display limit.
    pub missing_ranges: Vec<MissingRange>,
    /// Missing runs omitted from `missing_ranges`.
    pub more_missing_ranges: usize,
}

impl<K> DocumentRange<K> {
    /// Format a serial in this range's prefix and padding.
    pub fn format_serial(&self, serial: u64) -> String {
        format!("{}{:0width$}", self.prefix, serial, width = self.pad_width)
    }

    /// Compact human-readable summary of missing runs, e.g.
    /// `INV003, INV007-INV009 ... (2 more ranges)`.
    pub fn missing_display(&self) -> String {
        let mut parts: Vec<String> = self
            .missing_ranges
            .iter()
            .map(|r| {
                if r.start == r.end {
                    self.format_serial(r.start)
                } else {
                    format!("{}-{}", self.format_serial(r.start), self.format_serial(r.end))
                }
            })
            .collect();
        if self.more_missing_ranges > 0 {
            parts.push(format!("... ({} more ranges)", self.more_missing_ranges));
        }
        parts.join(", ")
    }
}

/// A document number with no trailing serial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonSequential<K> {
    pub key: K,
    pub document_number: String,
}

/// Output of one detection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeReport<K> {
    /// Ranges ordered by (key, prefix).
    pub ranges: Vec<DocumentRange<K>>,
    /// Distinct non-sequential numbers, truncated to the display limit.
    pub non_sequential: Vec<NonSequential<K>>,
    pub non_sequential_count: usize,
}

impl<K> RangeReport<K> {
    pub fn total_missing(&self) -> u64 {
        self.ranges.iter().map(|r| r.missing_count).sum()
    }
}

/// Detect ranges over `(key, document_number)` pairs.
///
/// Document numbers are trimmed and uppercased before splitting. Duplicate
/// numbers collapse to one serial. Input order never affects the output.
pub fn detect<K, S, I>(documents: I, limits: &RangeLimits) -> RangeReport<K>
where
    K: Ord + Clone,
    S: AsRef<str>,
    I: IntoIterator<Item = (K, S)>,
{
    let mut groups: BTreeMap<(K, String), (BTreeSet<u64>, usize)> = BTreeMap::new();
    let mut non_sequential: BTreeSet<NonSequential<K>> = BTreeSet::new();

    for (key, number) in documents {
        let normalized = number.as_ref().trim().to_uppercase();
        if normalized.is_empty() {
            continue;
        }
        match split_document_number(&normalized) {
            Some(split) => {
                let entry = groups.entry((key, split.prefix)).or_default();
                entry.0.insert(split.serial);
                entry.1 = entry.1.max(split.pad_width);
            }
            None => {
                non_sequential.insert(NonSequential {
                    key,
                    document_number: normalized,
                });
            }
        }
    }

    let ranges = groups
        .into_iter()
        .filter_map(|((key, prefix), (serials, pad_width))| {
            build_range(key, prefix, &serials, pad_width, limits)
        })
        .collect();

    let non_sequential_count = non_sequential.len();
    RangeReport {
        ranges,
        non_sequential: non_sequential.into_iter().take(limits.non_sequential).collect(),
        non_sequential_count,
    }
}

/// [`detect`] over arbitrary items with a key function.
pub fn detect_with<T, K, F>(items: &[T], limits: &RangeLimits, key_fn: F) -> RangeReport<K>
where
    K: Ord + Clone,
    F: Fn(&T) -> (K, &str),
{
    detect(items.iter().map(key_fn), limits)
}

fn build_range<K>(
    key: K,
    prefix: String,
    serials: &BTreeSet<u64>,
    pad_width: usize,
    limits: &RangeLimits,
) -> Option<DocumentRange<K>> {
    let first = *serials.first()?;
    let last = *serials.last()?;

    let mut missing_count = 0u64;
    let mut missing_serials = Vec::new();
    let mut missing_ranges = Vec::new();
    let mut more_missing_ranges = 0usize;

    let sorted: Vec<u64> = serials.iter().copied().collect();
    for pair in sorted.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a <= 1 {
            continue;
        }
        let gap = MissingRange {
            start: a + 1,
            end: b - 1,
        };
        missing_count += gap.len();

        let mut serial = gap.start;
        while missing_serials.len() < limits.missing_serials && serial <= gap.end {
            missing_serials.push(serial);
            serial += 1;
        }

        if missing_ranges.len() < limits.missing_ranges {
            missing_ranges.push(gap);
        } else {
            more_missing_ranges += 1;
        }
    }

    let format = |serial: u64| format!("{prefix}{serial:0pad_width$}");
    Some(DocumentRange {
        document_from: format(first),
        document_to: format(last),
        key,
        first_serial: first,
        last_serial: last,
        pad_width,
        found_count: serials.len() as u64,
        expected_count: last - first + 1,
        missing_count,
        missing_serials,
        missing_ranges,
        more_missing_ranges,
        prefix,
    })
}
