//! Semantic tier: an external language-model judge behind a trait
//!
//! The engine ships no client. Callers plug one in with
//! `TemporalChecker::with_semantic`; it is only consulted when the config
//! switch is on, the document text is available and the complexity router
//! says the text is worth the cost.

use std::sync::Arc;

use tracing::warn;

use super::{AssessingMethod, DetectionContext, InconsistencyCandidate, Severity};
use crate::consensus::TemporalMethod;
use crate::error::EngineResult;
use crate::timeline::Timeline;

/// External judge for one candidate
pub trait SemanticValidator: Send + Sync {
    /// Probability in [0, 1] that the candidate is a real inconsistency,
    /// given the surrounding text and a one-line timeline summary.
    fn validate(&self, candidate: &InconsistencyCandidate, context: &str, timeline_summary: &str) -> EngineResult<f64>;
}

pub struct SemanticMethod {
    validator: Arc<dyn SemanticValidator>,
}

impl SemanticMethod {
    pub fn new(validator: Arc<dyn SemanticValidator>) -> Self {
        Self { validator }
    }
}

impl AssessingMethod for SemanticMethod {
    fn method(&self) -> TemporalMethod {
        TemporalMethod::Semantic
    }

    fn assess(&self, candidate: &InconsistencyCandidate, ctx: &DetectionContext<'_>) -> Option<f64> {
        if candidate.severity < Severity::Medium {
            return None;
        }
        let text = ctx.text?;
        let context = context_window(text, candidate.position, ctx.config.context_radius);

        match self.validator.validate(candidate, context, &timeline_line(ctx.timeline)) {
            Ok(score) if score.is_finite() => Some(score.clamp(0.0, 1.0)),
            Ok(score) => {
                warn!(subject = %candidate.subject(), score, "semantic validator returned a non-finite score");
                None
            }
            Err(e) => {
                warn!(subject = %candidate.subject(), error = %e, "semantic validator failed, abstaining");
                None
            }
        }
    }
}

/// Slice of `text` within `radius` bytes of `position`, widened to char
/// boundaries
pub fn context_window(text: &str, position: usize, radius: usize) -> &str {
    let mut start = position.saturating_sub(radius).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = position.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

fn timeline_line(timeline: &Timeline) -> String {
    let summary = timeline.summary();
    let span = summary
        .time_span
        .map(|s| format!(", from {} to {}", s.earliest, s.latest))
        .unwrap_or_default();
    format!(
        "{} events ({} resolved), {} analepses, {} prolepses{}",
        summary.total_events, summary.resolved_events, summary.analepsis, summary.prolepsis, span
    )
}
