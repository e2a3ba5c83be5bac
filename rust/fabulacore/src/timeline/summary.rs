//! Serializable timeline overview for reporting collaborators

use serde::{Deserialize, Serialize};

use super::model::{EventKind, TimeSpan, Timeline};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimelineSummary {
    pub total_events: usize,
    pub chapter_events: usize,
    pub resolved_events: usize,
    pub unresolved_events: usize,
    pub anchors: usize,
    pub analepsis: usize,
    pub prolepsis: usize,
    pub characters_with_ages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_span: Option<TimeSpan>,
}

impl TimelineSummary {
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let events = timeline.events();
        let resolved = events.iter().filter(|e| e.is_resolved()).count();

        let mut characters: Vec<String> = events
            .iter()
            .filter_map(|e| e.character.clone())
            .collect();
        characters.sort();
        characters.dedup();

        Self {
            total_events: events.len(),
            chapter_events: events.iter().filter(|e| e.kind == EventKind::Chapter).count(),
            resolved_events: resolved,
            unresolved_events: events.len() - resolved,
            anchors: timeline.anchors().len(),
            analepsis: timeline.analepses().len(),
            prolepsis: timeline.prolepses().len(),
            characters_with_ages: characters,
            time_span: timeline.time_span(),
        }
    }
}

impl Timeline {
    pub fn summary(&self) -> TimelineSummary {
        TimelineSummary::from_timeline(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::model::{StoryTime, TimelineEvent};

    #[test]
    fn test_summary_counts() {
        let mut timeline = Timeline::new();
        let mut a = TimelineEvent::new(EventKind::Chapter, "Chapter 1", 1, 0);
        a.story_time = StoryTime::offset(0);
        let anchor = timeline.push(a);
        timeline.add_anchor(anchor);
        timeline.push(TimelineEvent::new(EventKind::Chapter, "Chapter 2", 2, 50));
        let mut age = TimelineEvent::new(EventKind::CharacterAge, "twelve", 2, 60);
        age.character = Some("ada".into());
        timeline.push(age);

        let summary = timeline.summary();
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.chapter_events, 2);
        assert_eq!(summary.resolved_events, 1);
        assert_eq!(summary.unresolved_events, 2);
        assert_eq!(summary.anchors, 1);
        assert_eq!(summary.characters_with_ages, vec!["ada".to_string()]);
        assert_eq!(summary.time_span.map(|s| s.days), Some(0));
    }
}
