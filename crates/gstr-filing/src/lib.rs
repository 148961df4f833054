//! # gstr-filing — Filing Engine
//!
//! Turns normalized lines into a filing document:
//!
//! - **Ranges** (`ranges.rs`): serial gap detection over document numbers,
//!   O(n log n) in the number of documents regardless of numeric span.
//!
//! - **Classify** (`classify.rs`): ordered decision list assigning each line
//!   to one section, with a document-level pre-pass for the large/small
//!   unregistered-buyer split.
//!
//! - **Sections** (`sections.rs`): the per-section layout table (shape,
//!   grouping key, required fields) and source-file section suggestion.
//!
//! - **Aggregate** (`aggregate.rs`): table-driven itemized and summarized
//!   section outputs, deterministic and parallel per section.
//!
//! - **Derived** (`derived.rs`): HSN summary, e-commerce operator tables and
//!   the documents-issued table.
//!
//! - **Reconcile** (`reconcile.rs`): tolerance-based cross-checks between
//!   tables that report the same transactions. Advisory only.
//!
//! - **Assemble** (`assemble.rs`): the full pipeline, processing summary and
//!   filing digest.
//!
//! - **Advisory** (`advisory.rs`): optional insights produced off the
//!   critical path under a deadline.
//!
//! ## Crate Policy
//!
//! - Depends on `gstr-core` and `gstr-ingest` internally.
//! - Every amount is a `Decimal`; the filing body never contains a float.
//! - Output ordering comes from `BTreeMap` keys, never from input order.

pub mod advisory;
pub mod aggregate;
pub mod assemble;
pub mod classify;
pub mod derived;
pub mod error;
pub mod ranges;
pub mod reconcile;
pub mod sections;

#[cfg(test)]
mod testing;

pub use advisory::{Advisor, AdvisoryError, Insights, RuleBasedAdvisor};
pub use aggregate::{aggregate, aggregate_sections, Amounts, FilingTables, SectionOutput};
pub use assemble::{FilingAssembler, FilingBody, FilingDocument, ProcessingSummary, SourceBatch};
pub use classify::{classify_lines, Classifier, DocumentTotals};
pub use error::FilingError;
pub use ranges::{detect, DocumentRange, RangeLimits, RangeReport};
pub use reconcile::{reconcile, ReconciliationCheck, ReconciliationReport};
pub use sections::{suggest_section, SectionSpec, Shape};
