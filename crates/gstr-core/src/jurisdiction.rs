//! # Jurisdiction Codes
//!
//! [`JurisdictionCode`] is the two-character code identifying a state or
//! union territory (the place-of-supply key). [`JurisdictionTable`] resolves
//! free-text names such as `"Maharashtra"`, `"27-Maharashtra"`, or `"7"` to
//! a code.
//!
//! ## Resolution Order
//!
//! 1. A bare code (one or two digits, zero-padded) or a code-prefixed label.
//! 2. Exact case-insensitive name match.
//! 3. Partial containment in either direction, first table entry wins.
//!    Fragments shorter than three characters never match partially.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A two-character jurisdiction code, e.g. `"27"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JurisdictionCode(String);

impl JurisdictionCode {
    /// Validate and construct a jurisdiction code. Letters are uppercased.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let s = value.as_ref().trim().to_ascii_uppercase();
        if s.len() != 2 || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidJurisdictionCode(
                value.as_ref().to_string(),
            ));
        }
        Ok(Self(s))
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JurisdictionCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JurisdictionCode> for String {
    fn from(code: JurisdictionCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for JurisdictionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named jurisdiction in a [`JurisdictionTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionEntry {
    /// Human-readable name, matched case-insensitively.
    pub name: String,
    /// Code the name resolves to.
    pub code: JurisdictionCode,
}

/// Ordered name-to-code lookup table.
#[derive(Debug, Clone, Default)]
pub struct JurisdictionTable {
    entries: Vec<(String, JurisdictionCode)>,
}

const MIN_PARTIAL_LEN: usize = 3;

impl JurisdictionTable {
    /// Build a table from configured entries, preserving their order.
    pub fn new(entries: &[JurisdictionEntry]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|e| (normalize_name(&e.name), e.code.clone()))
                .collect(),
        }
    }

    /// Number of named entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `code` appears in the table.
    pub fn contains_code(&self, code: &JurisdictionCode) -> bool {
        self.entries.iter().any(|(_, c)| c == code)
    }

    /// Resolve free text to a code, or `None` if nothing matches.
    pub fn resolve(&self, text: &str) -> Option<JurisdictionCode> {
        let normalized = normalize_name(text);
        if normalized.is_empty() {
            return None;
        }

        if let Some(code) = self.leading_code(&normalized) {
            return Some(code);
        }

        if let Some((_, code)) = self.entries.iter().find(|(name, _)| *name == normalized) {
            return Some(code.clone());
        }

        // Code-prefixed labels like "27-maharashtra" fall through to here when
        // the digits are unknown; strip them before partial matching.
        let name_part = normalized
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start_matches(|c: char| c == '-' || c == ' ')
            .to_string();
        if name_part.len() < MIN_PARTIAL_LEN {
            return None;
        }
        self.entries
            .iter()
            .find(|(name, _)| {
                name.len() >= MIN_PARTIAL_LEN
                    && (name.contains(name_part.as_str()) || name_part.contains(name.as_str()))
            })
            .map(|(_, code)| code.clone())
    }

    fn leading_code(&self, normalized: &str) -> Option<JurisdictionCode> {
        let digits: String = normalized
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() || digits.len() > 2 {
            return None;
        }
        let rest = &normalized[digits.len()..];
        if !rest.is_empty() && !rest.starts_with(['-', ' ']) {
            return None;
        }
        let code = JurisdictionCode::new(format!("{:0>2}", digits)).ok()?;
        self.contains_code(&code).then_some(code)
    }
}

fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Indian states and union territories with their GST state codes.
pub fn default_entries() -> Vec<JurisdictionEntry> {
    const TABLE: [(&str, &str); 36] = [
        ("andhra pradesh", "37"),
        ("arunachal pradesh", "12"),
        ("assam", "18"),
        ("bihar", "10"),
        ("chhattisgarh", "22"),
        ("goa", "30"),
        ("gujarat", "24"),
        ("haryana", "06"),
        ("himachal pradesh", "02"),
        ("jharkhand", "20"),
        ("karnataka", "29"),
        ("kerala", "32"),
        ("madhya pradesh", "23"),
        ("maharashtra", "27"),
        ("manipur", "14"),
        ("meghalaya", "17"),
        ("mizoram", "15"),
        ("nagaland", "13"),
        ("odisha", "21"),
        ("punjab", "03"),
        ("rajasthan", "08"),
        ("sikkim", "11"),
        ("tamil nadu", "33"),
        ("telangana", "36"),
        ("tripura", "16"),
        ("uttar pradesh", "09"),
        ("uttarakhand", "05"),
        ("west bengal", "19"),
        ("andaman and nicobar islands", "35"),
        ("chandigarh", "04"),
        ("dadra and nagar haveli and daman and diu", "26"),
        ("delhi", "07"),
        ("jammu and kashmir", "01"),
        ("ladakh", "38"),
        ("lakshadweep", "31"),
        ("puducherry", "34"),
    ];
    TABLE
        .iter()
        .filter_map(|(name, code)| {
            JurisdictionCode::new(code).ok().map(|code| JurisdictionEntry {
                name: (*name).to_string(),
                code,
            })
        })
        .collect()
}
