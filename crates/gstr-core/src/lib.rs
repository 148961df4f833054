//! # gstr-core — Foundational Types for the GSTR Filing Engine
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Exact money.** Every amount is a `rust_decimal::Decimal`, rounded
//!    half-up at two places by [`money::round_money`]. Floats never carry an
//!    amount and are rejected by [`CanonicalBytes`].
//!
//! 2. **Newtype wrappers for identifiers.** [`JurisdictionCode`], [`TaxId`],
//!    and [`FilingPeriod`] validate at construction and on deserialization.
//!
//! 3. **Explicit configuration.** Thresholds and lookup tables live in
//!    [`FilingConfig`], passed by reference. There is no global state.
//!
//! 4. **[`GstrError`] hierarchy.** Structured errors with `thiserror`; row-level
//!    problems are data, not errors.

pub mod canonical;
pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod identity;
pub mod jurisdiction;
pub mod line;
pub mod money;
pub mod section;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::{CanonicalBytes, FilingDigest};
pub use config::{EcommerceOperator, FieldSynonyms, FilingConfig};
pub use document::{normalize_document_number, resolve_document_type, DocumentType, DocumentTypeAlias};
pub use error::{CanonicalizationError, ConfigError, GstrError, ValidationError};
pub use identity::{is_registered_counterparty, FilerContext, FilingPeriod, TaxId};
pub use jurisdiction::{JurisdictionCode, JurisdictionEntry, JurisdictionTable};
pub use line::{
    CanonicalInvoiceLine, ExportDetail, ItemDetail, LineFlags, Provenance, RawRow, SupplyCategory,
};
pub use money::{compute_tax_split, parse_money, round_half_up, round_money, TaxSplit};
pub use section::Section;
