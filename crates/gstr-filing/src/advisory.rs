//! # Advisory Step
//!
//! Optional, best-effort commentary on a finished filing body. An
//! [`Advisor`] runs on its own thread after the deterministic pipeline, under
//! a deadline. A timeout, an error, or a panic yields no insights; it never
//! fails the filing and never touches an amount.
//!
//! [`RuleBasedAdvisor`] is the built-in implementation. Other advisors (a
//! hosted model, for instance) implement the same trait.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assemble::FilingBody;

/// Commentary attached to a filing for human review.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insights {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    /// 0 to 100.
    pub compliance_score: u8,
}

/// Advisor failure.
#[derive(Error, Debug)]
pub enum AdvisoryError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),

    #[error("advisor failed: {0}")]
    Failed(String),
}

/// Produces insights from a filing body.
pub trait Advisor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn advise(&self, body: &FilingBody) -> Result<Insights, AdvisoryError>;
}

/// Run `advisor` on a worker thread, waiting at most `timeout`.
///
/// On timeout the worker is abandoned, not joined: it keeps its clone of
/// `body` until the advisor returns, and its result is dropped. Callers that
/// need `body` back must expect the `Arc` to still be shared.
pub fn run_advisor(
    advisor: Arc<dyn Advisor>,
    body: Arc<FilingBody>,
    timeout: Duration,
) -> Option<Insights> {
    let name = advisor.name().to_string();
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("advisor-{name}"))
        .spawn(move || {
            // The receiver is gone after a timeout; nothing to report then.
            let _ = tx.send(advisor.advise(&body));
        });
    if let Err(e) = spawned {
        tracing::warn!(advisor = %name, error = %e, "could not start advisor thread");
        return None;
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(insights)) => {
            tracing::debug!(advisor = %name, score = insights.compliance_score, "advisory complete");
            Some(insights)
        }
        Ok(Err(e)) => {
            tracing::warn!(advisor = %name, error = %e, "advisory failed; omitting insights");
            None
        }
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(
                advisor = %name,
                timeout_ms = timeout.as_millis() as u64,
                "advisory timed out; omitting insights"
            );
            None
        }
        Err(RecvTimeoutError::Disconnected) => {
            tracing::warn!(advisor = %name, "advisor exited without a result");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Rule-based advisor
// ---------------------------------------------------------------------------

/// Deterministic advisor deriving insights from the filing's own tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAdvisor;

const RECONCILIATION_PENALTY: u32 = 15;
const REJECTED_PENALTY: u32 = 10;
const INFERRED_PENALTY: u32 = 10;
const MISSING_HSN_PENALTY: u32 = 10;
const CANCELLED_PENALTY: u32 = 5;

impl Advisor for RuleBasedAdvisor {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn advise(&self, body: &FilingBody) -> Result<Insights, AdvisoryError> {
        let summary = &body.summary;
        let tables = &body.tables;
        let mut out = Insights::default();
        let mut penalty = 0u32;

        let active: Vec<_> = tables.sections.values().filter(|s| !s.is_empty()).collect();
        out.insights.push(format!(
            "{} lines across {} sections, taxable value {}",
            summary.lines_classified,
            active.len(),
            summary.totals.taxable_value
        ));
        if let Some(largest) = active.iter().max_by_key(|s| s.totals.taxable_value.abs()) {
            out.insights.push(format!(
                "largest section is {} ({}) with taxable value {}",
                largest.section,
                largest.section.description(),
                largest.totals.taxable_value
            ));
        }
        if !tables.ecommerce.is_empty() {
            out.insights.push(format!(
                "{} e-commerce operators facilitated supplies this period",
                tables.ecommerce.registered.len() + tables.ecommerce.unregistered.len()
            ));
        }

        let failed = body.reconciliation.failures().count() as u32;
        if failed > 0 {
            penalty += RECONCILIATION_PENALTY * failed;
            out.recommendations
                .push("resolve reconciliation mismatches before submission".to_string());
        }
        out.warnings.extend(body.reconciliation.warnings.iter().cloned());

        if summary.rows_rejected > 0 {
            penalty += REJECTED_PENALTY;
            out.recommendations.push(format!(
                "fix {} rejected rows and regenerate",
                summary.rows_rejected
            ));
        }
        if summary.jurisdiction_inferred > 0 {
            penalty += INFERRED_PENALTY;
            out.recommendations.push(format!(
                "verify place of supply for {} lines defaulted to {}",
                summary.jurisdiction_inferred, body.header.jurisdiction
            ));
        }
        if tables.hsn.lines_missing_hsn > 0 {
            penalty += MISSING_HSN_PENALTY;
            out.recommendations.push(format!(
                "add HSN codes to {} supply lines",
                tables.hsn.lines_missing_hsn
            ));
        }
        let cancelled = tables.documents_issued.total_cancelled();
        if cancelled > 0 {
            penalty += CANCELLED_PENALTY;
            out.warnings.push(format!(
                "{cancelled} document serials are missing and will be reported as cancelled"
            ));
        }

        out.compliance_score = 100u32.saturating_sub(penalty) as u8;
        Ok(out)
    }
}
