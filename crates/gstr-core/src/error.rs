//! # Error Hierarchy
//!
//! Structured error types for the filing engine, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Row-level problems (an unparseable amount, a missing document number) are
//! not errors at this level. They are recorded as data by the normalizer so a
//! single bad row never aborts a batch. The types here cover configuration,
//! domain-primitive validation, canonicalization, and programming-error
//! invariants. Configuration loading reports [`ConfigError`] directly.

use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level error type for the filing engine core.
#[derive(Error, Debug)]
pub enum GstrError {
    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A tax split left a non-zero rounding remainder.
    ///
    /// This is a programming error: the split rule guarantees a zero
    /// remainder for every input.
    #[error("tax split invariant violated for {taxable_value} @ {rate}%: remainder {remainder}")]
    ArithmeticInvariant {
        /// Taxable value the split was computed for.
        taxable_value: Decimal,
        /// Rate in percent.
        rate: Decimal,
        /// The non-zero remainder observed.
        remainder: Decimal,
    },
}

/// Validation errors for domain primitive newtypes.
///
/// Each carries the rejected input and the expected format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Registration identifier is not 15 alphanumeric characters.
    #[error("invalid tax id: \"{0}\" (expected 15 alphanumeric characters)")]
    InvalidTaxId(String),

    /// Jurisdiction code is not two alphanumeric characters.
    #[error("invalid jurisdiction code: \"{0}\" (expected 2 alphanumeric characters)")]
    InvalidJurisdictionCode(String),

    /// Reporting period is not a valid `MMYYYY` token.
    #[error("invalid filing period: \"{0}\" (expected MMYYYY with month 01-12)")]
    InvalidFilingPeriod(String),
}

/// Errors while loading or validating a [`FilingConfig`](crate::FilingConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// YAML parsing failed.
    #[error("failed to parse YAML in {path}: {source}")]
    YamlParse {
        /// Path of the malformed file (`<inline>` for string input).
        path: PathBuf,
        /// Underlying parser error.
        source: serde_yaml::Error,
    },

    /// The configuration parsed but holds inconsistent values.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be decimal strings or integers.
    #[error("float values are not permitted in canonical representations; use decimal strings for amounts: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
