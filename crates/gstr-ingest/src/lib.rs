//! # gstr-ingest — Row Ingestion
//!
//! Two stages sit between a parsed spreadsheet row and the filing engine:
//!
//! - [`headers`]: tiered matching of source column headers onto canonical
//!   field names, with an overall confidence the caller must confirm when it
//!   falls below the configured threshold.
//! - [`normalize`]: conversion of a mapped row into a
//!   [`CanonicalInvoiceLine`](gstr_core::CanonicalInvoiceLine) with exact tax,
//!   or a recorded rejection.
//!
//! Spreadsheet/CSV parsing itself is out of scope; rows arrive as
//! [`RawRow`](gstr_core::RawRow) maps.

pub mod headers;
pub mod normalize;

pub use headers::{normalize_header, HeaderMapping, HeaderMatcher, MappingReport, MatchKind};
pub use normalize::{NormalizedBatch, Normalizer, RejectReason, RejectedRow, SourceContext};
