//! Narrative heuristics: how believable is each kind of candidate?

use super::{AssessingMethod, DetectionContext, InconsistencyCandidate, InconsistencyKind};
use crate::consensus::TemporalMethod;

/// Kind-specific priors. Stated ages are hard facts; jumps at a chapter
/// opening and historical references are often deliberate.
pub struct HeuristicMethod;

impl AssessingMethod for HeuristicMethod {
    fn method(&self) -> TemporalMethod {
        TemporalMethod::Heuristic
    }

    fn assess(&self, candidate: &InconsistencyCandidate, ctx: &DetectionContext<'_>) -> Option<f64> {
        let score = match candidate.kind {
            InconsistencyKind::AgeContradiction | InconsistencyKind::LifePhaseRegression => 0.7,
            InconsistencyKind::AgeDateMismatch => 0.6,
            InconsistencyKind::ImpossibleSequence => 0.65,
            InconsistencyKind::Anachronism => 0.4,
            InconsistencyKind::SuspiciousJump => {
                if opens_chapter(candidate, ctx) {
                    0.3
                } else {
                    0.5
                }
            }
            InconsistencyKind::MarkerConflict => {
                if years_follow_chapters(candidate, ctx) {
                    0.3
                } else {
                    0.5
                }
            }
        };
        Some(score)
    }
}

/// The candidate sits on the first narrated event of its chapter
fn opens_chapter(candidate: &InconsistencyCandidate, ctx: &DetectionContext<'_>) -> bool {
    ctx.timeline
        .events_in_chapter(candidate.chapter)
        .iter()
        .map(|e| e.discourse_position)
        .min()
        .map_or(false, |first| first >= candidate.position)
}

/// Two dated markers whose years increase with the chapter number read like
/// an ordinary progression, not a contradiction
fn years_follow_chapters(candidate: &InconsistencyCandidate, ctx: &DetectionContext<'_>) -> bool {
    let &[first, second] = candidate.markers.as_slice() else {
        return false;
    };
    let (Some(a), Some(b)) = (ctx.markers.get(first), ctx.markers.get(second)) else {
        return false;
    };
    match (a.year(), b.year()) {
        (Some(year_a), Some(year_b)) => {
            a.span.chapter != b.span.chapter && year_b.cmp(&year_a) == b.span.chapter.cmp(&a.span.chapter)
        }
        _ => false,
    }
}
