//! # Filer Identity
//!
//! Validated newtypes for the filer's registration identifier and the
//! reporting period, plus [`FilerContext`] which carries both along with the
//! filer's own jurisdiction into every engine component.
//!
//! Counterparty identifiers on invoice lines are deliberately *not* wrapped
//! in [`TaxId`]: source data carries malformed ids routinely, and the
//! classifier must see them to route the line. Only the filer's own
//! identifier is validated up front.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::jurisdiction::JurisdictionCode;

/// Length of a registered tax identifier.
pub const TAX_ID_LEN: usize = 15;

/// Prefix marking an unregistered person in place of a tax identifier.
pub const UNREGISTERED_MARKER: &str = "URP";

/// A 15-character registration identifier (GSTIN-shaped).
///
/// The first two characters are the code of the registering jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

impl TaxId {
    /// Validate and construct. Input is trimmed and uppercased.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let s = value.as_ref().trim().to_ascii_uppercase();
        if s.len() != TAX_ID_LEN || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidTaxId(value.as_ref().to_string()));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Jurisdiction the identifier was registered in, if its first two
    /// characters form a valid code.
    pub fn registered_jurisdiction(&self) -> Option<JurisdictionCode> {
        JurisdictionCode::new(&self.0[..2]).ok()
    }
}

impl TryFrom<String> for TaxId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaxId> for String {
    fn from(id: TaxId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a counterparty identifier denotes a registered buyer.
pub fn is_registered_counterparty(tax_id: Option<&str>) -> bool {
    tax_id.is_some_and(|id| id.chars().count() == TAX_ID_LEN)
}

/// A reporting period token in `MMYYYY` form, e.g. `"032025"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilingPeriod(String);

impl FilingPeriod {
    /// Validate and construct.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let s = value.as_ref().trim();
        let invalid = || ValidationError::InvalidFilingPeriod(value.as_ref().to_string());
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let month: u32 = s[..2].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }

    /// Month, 1-12.
    pub fn month(&self) -> u32 {
        self.0[..2].parse().unwrap_or(1)
    }

    /// Four-digit year.
    pub fn year(&self) -> i32 {
        self.0[2..].parse().unwrap_or(0)
    }

    /// Access the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FilingPeriod {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FilingPeriod> for String {
    fn from(p: FilingPeriod) -> Self {
        p.0
    }
}

impl std::fmt::Display for FilingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is filing, for which period, from which jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilerContext {
    /// The filer's own registration identifier.
    pub tax_id: TaxId,
    /// Reporting period.
    pub period: FilingPeriod,
    /// Origin jurisdiction for every supply, and the fallback place of supply.
    pub jurisdiction: JurisdictionCode,
}

impl FilerContext {
    /// Build a context whose jurisdiction is derived from the tax id prefix.
    pub fn new(tax_id: TaxId, period: FilingPeriod) -> Result<Self, ValidationError> {
        let jurisdiction = tax_id
            .registered_jurisdiction()
            .ok_or_else(|| ValidationError::InvalidTaxId(tax_id.to_string()))?;
        Ok(Self {
            tax_id,
            period,
            jurisdiction,
        })
    }

    /// Override the origin jurisdiction.
    pub fn with_jurisdiction(mut self, jurisdiction: JurisdictionCode) -> Self {
        self.jurisdiction = jurisdiction;
        self
    }
}
