//! Errors raised by filing generation.
//!
//! Per-row problems and reconciliation mismatches are reported inside the
//! filing, not here. These variants stop a run before it starts.

use thiserror::Error;

use gstr_core::{CanonicalizationError, GstrError};

/// Filing generation failure.
#[derive(Error, Debug)]
pub enum FilingError {
    /// A source batch's header mapping is below the confidence threshold and
    /// has not been confirmed.
    #[error(
        "header mapping for source \"{source_name}\" needs confirmation: \
         confidence {confidence:.3} below threshold {threshold:.3}"
    )]
    LowConfidenceMapping {
        source_name: String,
        confidence: f64,
        threshold: f64,
    },

    #[error(transparent)]
    Core(#[from] GstrError),

    #[error("filing digest: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
