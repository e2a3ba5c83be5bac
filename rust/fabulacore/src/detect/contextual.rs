//! Contextual validation: is there a cue that the oddity is intentional?

use super::{AssessingMethod, DetectionContext, InconsistencyCandidate};
use crate::consensus::TemporalMethod;
use crate::timeline::{LexiconKind, NarrativeOrder};

/// Looks at the markers around a candidate for transition vocabulary and at
/// the declared narrative order of the involved events.
///
/// Starts at 0.5; every time-shift cue lowers the score by 0.2, every
/// non-chronological event by 0.3. No cue at all raises it by 0.1.
pub struct ContextualMethod;

impl AssessingMethod for ContextualMethod {
    fn method(&self) -> TemporalMethod {
        TemporalMethod::Contextual
    }

    fn assess(&self, candidate: &InconsistencyCandidate, ctx: &DetectionContext<'_>) -> Option<f64> {
        let mut score = 0.5;
        let mut cues = 0usize;

        for marker in ctx.markers_near(candidate.position, ctx.config.marker_conflict_window) {
            let shifts = ctx
                .lexicon
                .scan(&marker.text)
                .iter()
                .filter(|m| m.kind != LexiconKind::Idiom)
                .count();
            score -= 0.2 * shifts as f64;
            cues += shifts;
        }

        for id in &candidate.events {
            let declared = ctx
                .timeline
                .event(*id)
                .map_or(false, |e| e.narrative_order != NarrativeOrder::Chronological);
            if declared {
                score -= 0.3;
                cues += 1;
            }
        }

        if cues == 0 {
            score += 0.1;
        }
        Some(score.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::detect::{InconsistencyKind, Severity};
    use crate::timeline::{
        Direction, EventKind, MarkerKind, SourceSpan, TemporalLexicon, TemporalMarker, TimeUnit, Timeline,
        TimelineEvent,
    };

    fn candidate(position: usize, events: Vec<crate::timeline::EventId>) -> InconsistencyCandidate {
        InconsistencyCandidate::new(
            InconsistencyKind::ImpossibleSequence,
            Severity::High,
            2,
            position,
            "test".into(),
            0.85,
        )
        .with_events(events)
    }

    fn score(timeline: &Timeline, markers: &[TemporalMarker], candidate: &InconsistencyCandidate) -> f64 {
        let config = CheckConfig::default();
        let lexicon = TemporalLexicon::new().unwrap();
        let ctx = DetectionContext {
            timeline,
            markers,
            text: None,
            config: &config,
            lexicon: &lexicon,
        };
        ContextualMethod.assess(candidate, &ctx).unwrap()
    }

    #[test]
    fn test_no_cues_leans_inconsistent() {
        let s = score(&Timeline::new(), &[], &candidate(100, vec![]));
        assert!((s - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_transition_cue_nearby() {
        let marker = TemporalMarker::new(
            "years earlier",
            SourceSpan::new(120, 133, 2, 0),
            MarkerKind::RelativeTime {
                direction: Direction::Past,
                unit: Some(TimeUnit::Year),
                quantity: None,
                weekday: None,
            },
            0.8,
        );
        // Listed as both retrospective and transition
        let s = score(&Timeline::new(), &[marker], &candidate(100, vec![]));
        assert!(s < 0.5);
    }

    #[test]
    fn test_declared_flashback_event() {
        let mut timeline = Timeline::new();
        let id = timeline.push(TimelineEvent::new(EventKind::Chapter, "Chapter 2", 2, 100));
        timeline.set_order(id, NarrativeOrder::Analepsis);

        let s = score(&timeline, &[], &candidate(100, vec![id]));
        assert!((s - 0.2).abs() < 1e-9);
    }
}
