//! NarrativeOrderClassifier - discourse order vs story order
//!
//! High-water-mark scan: events are visited in reading order and compared
//! with the latest story position narrated so far. Backward steps need
//! retrospective evidence or a large gap to count as analepsis; forward
//! leaps need prospective evidence or a very large gap to count as prolepsis.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::lexicon::TemporalLexicon;
use super::marker::Direction;
use super::model::{EventId, NarrativeOrder, TimeFrame, Timeline, TimelineEvent};
use crate::config::OrderConfig;
use crate::error::EngineResult;

/// Outcome of one classification pass
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OrderReport {
    /// False when fewer than two events could be placed in story order
    pub classified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<TimeFrame>,
    pub resolved_events: usize,
    pub chronological: usize,
    pub analepsis: usize,
    pub prolepsis: usize,
}

pub struct NarrativeOrderClassifier {
    config: OrderConfig,
    lexicon: TemporalLexicon,
}

impl NarrativeOrderClassifier {
    pub fn new(config: OrderConfig) -> EngineResult<Self> {
        Ok(Self {
            config,
            lexicon: TemporalLexicon::new()?,
        })
    }

    /// Tag every resolved event. Events outside the dominant frame, and
    /// unresolved ones, stay `Chronological`.
    pub fn classify(&self, timeline: &mut Timeline) -> OrderReport {
        let chronological = timeline.chronological();
        let frame = timeline.dominant_frame();

        if chronological.len() < 2 {
            info!(
                resolved = chronological.len(),
                "too few resolved events, narrative order left chronological"
            );
            return OrderReport {
                classified: false,
                frame,
                resolved_events: chronological.len(),
                chronological: timeline.len(),
                ..OrderReport::default()
            };
        }

        // rank → ordinal, id → rank
        let ordinals: Vec<i64> = chronological.iter().map(|(_, ordinal)| *ordinal).collect();
        let ranks: HashMap<EventId, usize> = chronological
            .iter()
            .enumerate()
            .map(|(rank, (event, _))| (event.id, rank))
            .collect();

        let mut in_discourse: Vec<&TimelineEvent> = chronological.iter().map(|(e, _)| *e).collect();
        in_discourse.sort_by_key(|e| (e.discourse_position, e.id));

        let mut decisions: Vec<(EventId, NarrativeOrder)> = Vec::with_capacity(in_discourse.len());
        let mut high_water: Option<usize> = None;

        for event in in_discourse {
            let Some(&rank) = ranks.get(&event.id) else {
                continue;
            };
            let order = match high_water {
                None => NarrativeOrder::Chronological,
                Some(hw) => self.decide(event, rank, hw, &ordinals),
            };
            if order != NarrativeOrder::Chronological {
                debug!(
                    event = event.id.0,
                    chapter = event.chapter,
                    order = ?order,
                    "out-of-order event"
                );
            }
            decisions.push((event.id, order));
            high_water = Some(high_water.map_or(rank, |hw| hw.max(rank)));
        }

        let resolved_events = decisions.len();
        for (id, order) in decisions {
            timeline.set_order(id, order);
        }

        let analepsis = timeline.analepses().len();
        let prolepsis = timeline.prolepses().len();
        OrderReport {
            classified: true,
            frame,
            resolved_events,
            chronological: timeline.len() - analepsis - prolepsis,
            analepsis,
            prolepsis,
        }
    }

    fn decide(&self, event: &TimelineEvent, rank: usize, high_water: usize, ordinals: &[i64]) -> NarrativeOrder {
        if rank < high_water {
            let gap = ordinals[high_water].saturating_sub(ordinals[rank]);
            if self.has_retrospective_evidence(event) || gap > self.config.analepsis_gap_days {
                return NarrativeOrder::Analepsis;
            }
            return NarrativeOrder::Chronological;
        }

        if rank > high_water + self.config.rank_skip {
            let gap = ordinals[rank].saturating_sub(ordinals[high_water]);
            if gap > self.config.prolepsis_gap_days
                && (self.has_prospective_evidence(event) || gap > self.config.prolepsis_unconditional_days)
            {
                return NarrativeOrder::Prolepsis;
            }
        }

        NarrativeOrder::Chronological
    }

    fn has_retrospective_evidence(&self, event: &TimelineEvent) -> bool {
        event.marker_direction == Some(Direction::Past)
            || self.lexicon.is_retrospective(&event.description)
            || event
                .marker_text
                .as_deref()
                .map_or(false, |text| self.lexicon.is_retrospective(text))
    }

    fn has_prospective_evidence(&self, event: &TimelineEvent) -> bool {
        (event.marker_direction == Some(Direction::Future) && self.is_explicit_prospect(event))
            || self.lexicon.is_prospective(&event.description)
            || event
                .marker_text
                .as_deref()
                .map_or(false, |text| self.lexicon.is_prospective(text))
    }

    /// A future-direction marker reaching at least a year ahead
    fn is_explicit_prospect(&self, event: &TimelineEvent) -> bool {
        event
            .reference
            .map_or(false, |r| r.delta_days >= self.config.prolepsis_gap_days)
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::model::{EventKind, StoryTime};

    fn event(discourse: usize, day: i64, description: &str) -> TimelineEvent {
        let mut e = TimelineEvent::new(EventKind::Chapter, description, 1, discourse);
        e.story_time = StoryTime::offset(day);
        e
    }

    fn classifier() -> NarrativeOrderClassifier {
        NarrativeOrderClassifier::new(OrderConfig::default()).unwrap()
    }

    #[test]
    fn test_single_event_is_noop() {
        let mut timeline = Timeline::new();
        timeline.push(event(0, 0, "a"));
        let report = classifier().classify(&mut timeline);
        assert!(!report.classified);
        assert_eq!(report.chronological, 1);
    }

    #[test]
    fn test_small_backward_gap_without_evidence() {
        let mut timeline = Timeline::new();
        timeline.push(event(0, 100, "the harbour"));
        timeline.push(event(10, 90, "the market"));
        let report = classifier().classify(&mut timeline);
        assert!(report.classified);
        assert_eq!(report.analepsis, 0);
    }

    #[test]
    fn test_unresolved_events_skipped() {
        let mut timeline = Timeline::new();
        timeline.push(event(0, 100, "a"));
        timeline.push(TimelineEvent::new(EventKind::Chapter, "b", 2, 5));
        timeline.push(event(10, 0, "c"));
        let report = classifier().classify(&mut timeline);
        assert_eq!(report.resolved_events, 2);
        assert_eq!(timeline.events()[1].narrative_order, NarrativeOrder::Chronological);
        assert_eq!(timeline.events()[2].narrative_order, NarrativeOrder::Analepsis);
    }

    #[test]
    fn test_extreme_offsets_saturate() {
        let mut timeline = Timeline::new();
        timeline.push(event(0, i64::MAX, "the far future"));
        timeline.push(event(10, i64::MIN, "the far past"));
        let report = classifier().classify(&mut timeline);
        assert_eq!(report.analepsis, 1);
        assert_eq!(timeline.events()[1].narrative_order, NarrativeOrder::Analepsis);
    }
}
