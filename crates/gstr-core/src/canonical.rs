//! # Canonical Bytes & Filing Digest
//!
//! [`CanonicalBytes`] is the only input accepted by [`FilingDigest::of`].
//! A filing produced twice from the same lines must hash identically, so the
//! bytes are produced by RFC 8785 (JSON Canonicalization Scheme) serialization
//! via `serde_jcs`: sorted keys, compact separators.
//!
//! ## Float Rejection
//!
//! Amounts are `Decimal` and serialize as strings. A float reaching this
//! module means some amount bypassed `Decimal`; canonicalization refuses it
//! rather than hashing a binary approximation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with float rejection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a non-integer number,
    /// `SerializationFailed` if serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Number(n) if n.is_f64() => Err(CanonicalizationError::FloatRejected(
            n.as_f64().unwrap_or(f64::NAN),
        )),
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
        _ => Ok(()),
    }
}

/// SHA-256 digest of a canonical filing body, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilingDigest(String);

impl FilingDigest {
    /// Digest canonical bytes.
    pub fn of(bytes: &CanonicalBytes) -> Self {
        let hash = Sha256::digest(bytes.as_bytes());
        Self(hash.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Canonicalize and digest in one step.
    pub fn compute(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        Ok(Self::of(&CanonicalBytes::new(obj)?))
    }

    /// Hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FilingDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}
