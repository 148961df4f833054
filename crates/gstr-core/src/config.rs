//! # Filing Configuration
//!
//! [`FilingConfig`] holds every threshold, limit, and lookup table the engine
//! consults. It is constructed once (from defaults or a YAML file), validated,
//! and passed by reference into each component. Nothing in the engine reads
//! module-level constants for these values.
//!
//! ```yaml
//! schema_version: GST3.1.6
//! large_unregistered_threshold: "250000"
//! reconciliation_tolerance: "0.50"
//! ecommerce_operators:
//!   - channel: meesho
//!     tax_id: 07AARCM9332R1CQ
//! ```
//!
//! Omitted keys take their defaults.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::{default_aliases, DocumentTypeAlias};
use crate::error::ConfigError;
use crate::fields;
use crate::jurisdiction::{default_entries, JurisdictionEntry, JurisdictionTable};

/// Synonyms for one canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSynonyms {
    pub field: String,
    pub synonyms: Vec<String>,
}

/// A sales channel operated by an e-commerce operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcommerceOperator {
    /// Channel name as it appears in source context (case-insensitive).
    pub channel: String,
    /// The operator's tax id.
    pub tax_id: String,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingConfig {
    /// Return schema version written into the filing header.
    pub schema_version: String,
    /// Document total above which an unregistered-buyer invoice is "large".
    pub large_unregistered_threshold: Decimal,
    /// Absolute tolerance for reconciliation checks.
    pub reconciliation_tolerance: Decimal,
    /// Mean mapping confidence below which the caller must confirm.
    pub mapping_confidence_threshold: f64,
    /// Lowest header score that still resolves to a field.
    pub minimum_match_score: f64,
    /// Required-field coverage needed to suggest a section for a file.
    pub section_suggestion_coverage: f64,
    /// Missing serials listed per range before truncation.
    pub missing_serial_display_limit: usize,
    /// Compressed missing sub-ranges listed per range before truncation.
    pub missing_range_display_limit: usize,
    /// Non-sequential document numbers listed before truncation.
    pub non_sequential_display_limit: usize,
    /// Emit every section key, empty when no line landed in it.
    pub emit_empty_sections: bool,
    /// Unit code used in the HSN summary when a line has none.
    pub default_uqc: String,
    /// Upper bound on the advisory step.
    pub advisory_timeout_ms: u64,
    pub jurisdictions: Vec<JurisdictionEntry>,
    pub field_synonyms: Vec<FieldSynonyms>,
    pub document_type_aliases: Vec<DocumentTypeAlias>,
    pub ecommerce_operators: Vec<EcommerceOperator>,
}

impl Default for FilingConfig {
    fn default() -> Self {
        Self {
            schema_version: "GST3.1.6".to_string(),
            large_unregistered_threshold: Decimal::from(250_000),
            reconciliation_tolerance: Decimal::new(50, 2),
            mapping_confidence_threshold: 0.75,
            minimum_match_score: 0.70,
            section_suggestion_coverage: 0.75,
            missing_serial_display_limit: 100,
            missing_range_display_limit: 10,
            non_sequential_display_limit: 50,
            emit_empty_sections: true,
            default_uqc: "OTH".to_string(),
            advisory_timeout_ms: 10_000,
            jurisdictions: default_entries(),
            field_synonyms: default_field_synonyms(),
            document_type_aliases: default_aliases(),
            ecommerce_operators: vec![EcommerceOperator {
                channel: "meesho".to_string(),
                tax_id: "07AARCM9332R1CQ".to_string(),
            }],
        }
    }
}

impl FilingConfig {
    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded filing configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::YamlParse {
            path: "<inline>".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engine misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {v}")))
            }
        };
        unit("mapping_confidence_threshold", self.mapping_confidence_threshold)?;
        unit("minimum_match_score", self.minimum_match_score)?;
        unit("section_suggestion_coverage", self.section_suggestion_coverage)?;

        if self.large_unregistered_threshold.is_sign_negative() {
            return Err(ConfigError::Invalid(
                "large_unregistered_threshold must not be negative".into(),
            ));
        }
        if self.reconciliation_tolerance.is_sign_negative() {
            return Err(ConfigError::Invalid(
                "reconciliation_tolerance must not be negative".into(),
            ));
        }
        if self.jurisdictions.is_empty() {
            return Err(ConfigError::Invalid("jurisdictions table is empty".into()));
        }
        if let Some(fs) = self.field_synonyms.iter().find(|fs| fs.synonyms.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "field {} has no synonyms",
                fs.field
            )));
        }
        Ok(())
    }

    /// Jurisdiction lookup table built from [`Self::jurisdictions`].
    pub fn jurisdiction_table(&self) -> JurisdictionTable {
        JurisdictionTable::new(&self.jurisdictions)
    }

    /// Operator tax id for a sales channel, if the channel is an operator.
    pub fn operator_for_channel(&self, channel: &str) -> Option<&str> {
        self.ecommerce_operators
            .iter()
            .find(|op| op.channel.eq_ignore_ascii_case(channel.trim()))
            .map(|op| op.tax_id.as_str())
    }
}

/// Default synonyms per canonical field, in matching order.
pub fn default_field_synonyms() -> Vec<FieldSynonyms> {
    let table: [(&str, &[&str]); 23] = [
        (
            fields::COUNTERPARTY_TAX_ID,
            &[
                "gstin of recipient", "recipient gstin", "bill to gstin", "buyer gstin",
                "customer gstin", "ctin", "gstin/uin", "gstin", "uin",
            ],
        ),
        (
            fields::COUNTERPARTY_NAME,
            &["receiver name", "recipient name", "customer name", "buyer name", "party name"],
        ),
        (
            fields::DOCUMENT_NUMBER,
            &[
                "invoice number", "invoice no.", "inv no", "invoice no", "inv_no", "bill no",
                "bill number", "document number", "doc no", "note number", "note no",
                "credit note no", "debit note no", "cn no", "dn no",
            ],
        ),
        (
            fields::DOCUMENT_DATE,
            &[
                "invoice date", "date", "inv date", "bill date", "transaction date",
                "note date", "cn date", "dn date", "order date",
            ],
        ),
        (
            fields::DOCUMENT_TYPE,
            &["document type", "doc type", "invoice type", "note type", "type"],
        ),
        (
            fields::TAXABLE_VALUE,
            &[
                "taxable value", "total_taxable_sale_value", "txval", "taxable val",
                "assessable value", "value",
            ],
        ),
        (
            fields::SUPPLY_JURISDICTION,
            &[
                "place of supply", "pos", "state", "end_customer_state_new", "customer state",
                "supply state", "destination state",
            ],
        ),
        (
            fields::TAX_RATE_PERCENT,
            &["gst rate", "gst_rate", "rate", "tax rate", "gst %", "rate %"],
        ),
        (fields::CESS_AMOUNT, &["cess", "cess amount", "csamt"]),
        (
            fields::REVERSE_CHARGE,
            &["reverse charge", "rcm", "is reverse charge", "rev charge"],
        ),
        (fields::IS_RETURN, &["is return", "return flag", "returned"]),
        (
            fields::SUPPLY_CATEGORY,
            &["supply category", "nil/exempt/non gst", "exempt type", "tax category"],
        ),
        (fields::IS_ADVANCE, &["advance received", "is advance", "advance"]),
        (
            fields::IS_ADVANCE_ADJUSTMENT,
            &["advance adjusted", "advance adjustment", "is advance adjustment"],
        ),
        (fields::EXPORT_TYPE, &["export type", "exp typ", "wpay/wopay"]),
        (
            fields::SHIPPING_BILL_NUMBER,
            &["shipping bill no", "shipping bill number", "sb no"],
        ),
        (fields::SHIPPING_BILL_DATE, &["shipping bill date", "sb date"]),
        (fields::PORT_CODE, &["port code", "port"]),
        (fields::HSN_CODE, &["hsn", "hsn code", "hsn_sc", "sac", "sac code"]),
        (
            fields::DESCRIPTION,
            &["description", "desc", "item description", "goods description", "product name"],
        ),
        (fields::UQC, &["uqc", "unit", "unit of measurement", "uom"]),
        (fields::QUANTITY, &["quantity", "qty", "total quantity"]),
        (
            fields::ECOMMERCE_OPERATOR_TAX_ID,
            &["ecommerce gstin", "e-commerce gstin", "etin", "operator gstin"],
        ),
    ];
    table
        .iter()
        .map(|(field, synonyms)| FieldSynonyms {
            field: (*field).to_string(),
            synonyms: synonyms.iter().map(|s| (*s).to_string()).collect(),
        })
        .collect()
}
