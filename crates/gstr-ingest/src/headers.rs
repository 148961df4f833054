//! # Header Matcher
//!
//! Maps free-text source column headers onto canonical field names.
//!
//! ## Scoring Tiers
//!
//! For each candidate field, tiers are tried in strict order and the first
//! tier that produces a score is the field's score:
//!
//! | Tier | Condition | Score |
//! |------|-----------|-------|
//! | exact | normalized header equals a synonym | `1.0` |
//! | substring | one contains the other | `0.85 + 0.1 * shorter/longer`, below `0.95` |
//! | fuzzy | normalized Levenshtein ratio `r >= 0.75` | `0.70 + (r - 0.75) * 0.6`, below `0.85` |
//!
//! The tiers do not overlap, so an exact match always beats a substring or
//! fuzzy match against another field. A header maps to the field with the
//! highest score; on a tie the field listed first in configuration wins.
//! Headers scoring below the configured minimum stay unmapped and must be
//! resolved by a human.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use gstr_core::FilingConfig;

/// How a header was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Substring,
    Fuzzy,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Substring => "substring",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved source header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderMapping {
    pub source_header: String,
    pub canonical_field: String,
    pub confidence: f64,
    pub match_kind: MatchKind,
}

const EXACT_SCORE: f64 = 1.0;
const SUBSTRING_BASE: f64 = 0.85;
const SUBSTRING_SPAN: f64 = 0.1;
const FUZZY_FLOOR: f64 = 0.75;
const FUZZY_BASE: f64 = 0.70;
const FUZZY_SCALE: f64 = 0.6;

/// Lowercase, strip bracket/quote punctuation and periods, collapse whitespace.
pub fn normalize_header(header: &str) -> String {
    let stripped: String = header
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\'' | '°' | '.'))
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Scores headers against the configured synonym table.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    fields: Vec<(String, Vec<String>)>,
    minimum_score: f64,
    confidence_threshold: f64,
}

impl HeaderMatcher {
    /// Build from explicit synonyms. Synonyms are normalized on the way in.
    pub fn new(
        synonyms: impl IntoIterator<Item = (String, Vec<String>)>,
        minimum_score: f64,
        confidence_threshold: f64,
    ) -> Self {
        let fields = synonyms
            .into_iter()
            .map(|(field, syns)| {
                let normalized = syns
                    .iter()
                    .map(|s| normalize_header(s))
                    .filter(|s| !s.is_empty())
                    .collect();
                (field, normalized)
            })
            .collect();
        Self {
            fields,
            minimum_score,
            confidence_threshold,
        }
    }

    pub fn from_config(config: &FilingConfig) -> Self {
        Self::new(
            config
                .field_synonyms
                .iter()
                .map(|fs| (fs.field.clone(), fs.synonyms.clone())),
            config.minimum_match_score,
            config.mapping_confidence_threshold,
        )
    }

    /// Canonical field names known to this matcher, in configuration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(f, _)| f.as_str())
    }

    /// Best mapping for one header, or `None` if nothing reaches the minimum.
    pub fn match_header(&self, header: &str) -> Option<HeaderMapping> {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<(&str, f64, MatchKind)> = None;
        for (field, synonyms) in &self.fields {
            if let Some((score, kind)) = score_field(&normalized, synonyms) {
                if best.map_or(true, |(_, s, _)| score > s) {
                    best = Some((field.as_str(), score, kind));
                }
            }
        }

        let (field, confidence, match_kind) = best?;
        if confidence < self.minimum_score {
            return None;
        }
        Some(HeaderMapping {
            source_header: header.to_string(),
            canonical_field: field.to_string(),
            confidence,
            match_kind,
        })
    }

    /// Map every header of a source file.
    ///
    /// Each canonical field binds to at most one header: the one with the
    /// highest confidence, earliest header on a tie. Displaced headers are
    /// reported as unmapped.
    pub fn map_headers<S: AsRef<str>>(&self, headers: &[S]) -> MappingReport {
        let mut by_field: BTreeMap<String, (usize, HeaderMapping)> = BTreeMap::new();
        let mut unmapped = Vec::new();

        for (idx, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            let Some(mapping) = self.match_header(header) else {
                unmapped.push(header.to_string());
                continue;
            };
            let stronger = by_field
                .get(&mapping.canonical_field)
                .filter(|(_, existing)| existing.confidence >= mapping.confidence)
                .map(|(_, existing)| existing.source_header.clone());
            if let Some(kept) = stronger {
                tracing::debug!(
                    header = %header,
                    field = %mapping.canonical_field,
                    kept = %kept,
                    "field already bound to a stronger header"
                );
                unmapped.push(header.to_string());
            } else if let Some((_, displaced)) =
                by_field.insert(mapping.canonical_field.clone(), (idx, mapping))
            {
                unmapped.push(displaced.source_header);
            }
        }

        let mut mappings: Vec<(usize, HeaderMapping)> = by_field.into_values().collect();
        mappings.sort_by_key(|(idx, _)| *idx);
        let mappings: Vec<HeaderMapping> = mappings.into_iter().map(|(_, m)| m).collect();

        let overall_confidence = if mappings.is_empty() {
            0.0
        } else {
            mappings.iter().map(|m| m.confidence).sum::<f64>() / mappings.len() as f64
        };

        if !unmapped.is_empty() {
            tracing::warn!(count = unmapped.len(), "headers left unmapped for manual resolution");
        }

        MappingReport {
            mappings,
            unmapped,
            overall_confidence,
            threshold: self.confidence_threshold,
            confirmed: false,
        }
    }
}

fn score_field(header: &str, synonyms: &[String]) -> Option<(f64, MatchKind)> {
    if synonyms.iter().any(|s| s == header) {
        return Some((EXACT_SCORE, MatchKind::Exact));
    }

    let substring = synonyms
        .iter()
        .filter_map(|s| substring_score(header, s))
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));
    if let Some(score) = substring {
        return Some((score, MatchKind::Substring));
    }

    synonyms
        .iter()
        .map(|s| strsim::normalized_levenshtein(header, s))
        .filter(|r| *r >= FUZZY_FLOOR && *r < 1.0)
        .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.max(r))))
        .map(|r| (FUZZY_BASE + (r - FUZZY_FLOOR) * FUZZY_SCALE, MatchKind::Fuzzy))
}

fn substring_score(header: &str, synonym: &str) -> Option<f64> {
    if header.is_empty() || synonym.is_empty() || header == synonym {
        return None;
    }
    if !(header.contains(synonym) || synonym.contains(header)) {
        return None;
    }
    let (h, s) = (header.chars().count() as f64, synonym.chars().count() as f64);
    Some(SUBSTRING_BASE + SUBSTRING_SPAN * h.min(s) / h.max(s))
}

/// Outcome of mapping one source file's headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    pub mappings: Vec<HeaderMapping>,
    pub unmapped: Vec<String>,
    /// Mean confidence over resolved headers; zero when none resolved.
    pub overall_confidence: f64,
    pub threshold: f64,
    pub confirmed: bool,
}

impl MappingReport {
    /// Whether a human must confirm the mapping before processing.
    pub fn requires_confirmation(&self) -> bool {
        !self.confirmed && self.overall_confidence < self.threshold
    }

    /// Record explicit human confirmation.
    pub fn confirm(mut self) -> Self {
        self.confirmed = true;
        self
    }

    /// Canonical field a source header resolved to.
    pub fn field_for(&self, source_header: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.source_header == source_header)
            .map(|m| m.canonical_field.as_str())
    }

    /// Set of canonical fields present in the file.
    pub fn mapped_fields(&self) -> BTreeSet<&str> {
        self.mappings.iter().map(|m| m.canonical_field.as_str()).collect()
    }

    /// Fraction of `required` fields that were mapped. Empty input counts as
    /// fully covered.
    pub fn coverage(&self, required: &[&str]) -> f64 {
        if required.is_empty() {
            return 1.0;
        }
        let mapped = self.mapped_fields();
        let hits = required.iter().filter(|f| mapped.contains(*f)).count();
        hits as f64 / required.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> HeaderMatcher {
        HeaderMatcher::from_config(&FilingConfig::default())
    }

    fn tiny(fields: &[(&str, &[&str])]) -> HeaderMatcher {
        HeaderMatcher::new(
            fields
                .iter()
                .map(|(f, s)| (f.to_string(), s.iter().map(|x| x.to_string()).collect())),
            0.70,
            0.75,
        )
    }

    // -- Normalization --

    #[test]
    fn normalize_strips_punctuation_and_collapses() {
        assert_eq!(normalize_header("  Inv   No. "), "inv no");
        assert_eq!(normalize_header("Rate (%)"), "rate %");
        assert_eq!(normalize_header("\"Place of  Supply\""), "place of supply");
        assert_eq!(normalize_header("[GSTIN]"), "gstin");
    }

    // -- Tiers --

    #[test]
    fn inv_no_period_is_exact() {
        let m = matcher().match_header("Inv No.").unwrap();
        assert_eq!(m.canonical_field, "document_number");
        assert_eq!(m.match_kind, MatchKind::Exact);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn substring_scores_between_tiers() {
        let m = matcher().match_header("Buyer GSTIN Number").unwrap();
        assert_eq!(m.canonical_field, "counterparty_tax_id");
        assert_eq!(m.match_kind, MatchKind::Substring);
        assert!(m.confidence >= 0.85 && m.confidence < 0.95);
    }

    #[test]
    fn fuzzy_scores_in_lowest_tier() {
        let m = tiny(&[("taxable_value", &["taxable value"])])
            .match_header("taxabel value")
            .unwrap();
        assert_eq!(m.match_kind, MatchKind::Fuzzy);
        assert!(m.confidence >= 0.70 && m.confidence < 0.85);
    }

    #[test]
    fn exact_beats_closer_fuzzy() {
        // Field a is listed first and matches fuzzily; field b matches exactly.
        let m = tiny(&[("a", &["invoice date"]), ("b", &["invoce dt"])])
            .match_header("Invoce Dt")
            .unwrap();
        assert_eq!(m.canonical_field, "b");
        assert_eq!(m.match_kind, MatchKind::Exact);
    }

    #[test]
    fn tie_keeps_first_field() {
        let m = tiny(&[("first", &["qty"]), ("second", &["qty"])])
            .match_header("QTY")
            .unwrap();
        assert_eq!(m.canonical_field, "first");
    }

    #[test]
    fn unrelated_header_is_unmapped() {
        assert!(matcher().match_header("Warehouse Shelf").is_none());
        assert!(matcher().match_header("   ").is_none());
    }

    // -- Reports --

    #[test]
    fn report_confidence_is_mean_of_resolved() {
        let report = matcher().map_headers(&["Invoice No", "Taxable Value", "Zzyzx"]);
        assert_eq!(report.mappings.len(), 2);
        assert_eq!(report.unmapped, vec!["Zzyzx".to_string()]);
        assert_eq!(report.overall_confidence, 1.0);
        assert!(!report.requires_confirmation());
    }

    #[test]
    fn low_confidence_requires_confirmation_until_confirmed() {
        let report = tiny(&[("taxable_value", &["taxable value"])]).map_headers(&["txble vlue"]);
        assert!(report.overall_confidence < 0.75);
        assert!(report.requires_confirmation());
        assert!(!report.confirm().requires_confirmation());
    }

    #[test]
    fn empty_report_requires_confirmation() {
        let report = matcher().map_headers::<&str>(&[]);
        assert_eq!(report.overall_confidence, 0.0);
        assert!(report.requires_confirmation());
    }

    #[test]
    fn field_binds_to_strongest_header() {
        let report = matcher().map_headers(&["Total Invoice Value", "Taxable Value"]);
        assert_eq!(report.field_for("Taxable Value"), Some("taxable_value"));
        assert_eq!(report.field_for("Total Invoice Value"), None);
        assert!(report.unmapped.contains(&"Total Invoice Value".to_string()));
    }

    #[test]
    fn gross_invoice_value_never_outranks_taxable_value() {
        let report = matcher().map_headers(&["Invoice Value", "Taxable Value"]);
        assert_eq!(report.field_for("Taxable Value"), Some("taxable_value"));
        assert_eq!(report.field_for("Invoice Value"), None);

        let alone = matcher().match_header("Invoice Value").unwrap();
        assert_eq!(alone.canonical_field, "taxable_value");
        assert_eq!(alone.match_kind, MatchKind::Substring);
        assert!(alone.confidence < 1.0);
    }

    #[test]
    fn mappings_keep_header_order() {
        let report = matcher().map_headers(&["Rate", "GSTIN", "Invoice Date"]);
        let headers: Vec<&str> = report.mappings.iter().map(|m| m.source_header.as_str()).collect();
        assert_eq!(headers, vec!["Rate", "GSTIN", "Invoice Date"]);
    }

    #[test]
    fn coverage_counts_required_fields() {
        let report = matcher().map_headers(&["GSTIN", "Invoice No"]);
        let cov = report.coverage(&["counterparty_tax_id", "document_number", "taxable_value"]);
        assert!((cov - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.coverage(&[]), 1.0);
    }
}
