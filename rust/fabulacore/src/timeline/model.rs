//! Timeline data model
//!
//! The `Timeline` owns every event by value in an append-only `Vec`; events
//! refer to each other only through `EventId` (the index), so the structure
//! stays acyclic and serializes as-is.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::marker::{AgeValue, Direction};

// ==================== STORY TIME ====================

/// Partial calendar date. Any component may be missing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StoryDate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl StoryDate {
    pub fn new(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self::new(Some(year), Some(month), Some(day))
    }

    /// Calendar date with missing month/day pinned to the first. Days past
    /// the end of the month are clamped. `None` without a year.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        let year = self.year?;
        let month = self.month.unwrap_or(1).clamp(1, 12);
        let mut day = self.day.unwrap_or(1).clamp(1, 31);
        loop {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
            if day <= 28 {
                return None;
            }
            day -= 1;
        }
    }

    /// Days since 0001-01-01 (proleptic Gregorian)
    pub fn day_number(&self) -> Option<i64> {
        self.to_naive().map(|d| i64::from(d.num_days_from_ce()))
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self::ymd(date.year(), date.month(), date.day())
    }

    /// Shift by whole days. `None` without a year or on calendar overflow.
    pub fn add_days(&self, days: i64) -> Option<Self> {
        let base = self.day_number()?;
        let target = i32::try_from(base.checked_add(days)?).ok()?;
        NaiveDate::from_num_days_from_ce_opt(target).map(Self::from_naive)
    }
}

/// Precision of an absolute story time, most precise first
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DateResolution {
    Day,
    Month,
    Year,
    Season,
    Partial,
}

impl DateResolution {
    /// Day, Month and Year dates are trustworthy enough to anchor on
    pub fn is_anchor_grade(self) -> bool {
        self <= DateResolution::Year
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoryTime {
    Absolute {
        date: StoryDate,
        resolution: DateResolution,
    },
    RelativeOffset {
        days: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        weekday: Option<Weekday>,
    },
    #[default]
    Unknown,
}

/// Position on one of the two time axes: the calendar, or day offsets from
/// the synthetic zero point. The axes are never compared with each other.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeFrame {
    Calendar,
    Relative,
}

impl StoryTime {
    pub fn absolute(date: StoryDate, resolution: DateResolution) -> Self {
        StoryTime::Absolute { date, resolution }
    }

    pub fn offset(days: i64) -> Self {
        StoryTime::RelativeOffset { days, weekday: None }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, StoryTime::Absolute { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, StoryTime::Unknown)
    }

    pub fn resolution(&self) -> Option<DateResolution> {
        match self {
            StoryTime::Absolute { resolution, .. } => Some(*resolution),
            _ => None,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            StoryTime::Absolute { date, .. } => date.year,
            _ => None,
        }
    }

    /// Frame and day ordinal. Yearless dates have no place on either axis.
    pub fn ordinal(&self) -> Option<(TimeFrame, i64)> {
        match self {
            StoryTime::Absolute { date, .. } => date.day_number().map(|d| (TimeFrame::Calendar, d)),
            StoryTime::RelativeOffset { days, .. } => Some((TimeFrame::Relative, *days)),
            StoryTime::Unknown => None,
        }
    }

    /// Shift by a signed day delta, keeping the resolution of the source.
    /// `None` when the offset would overflow.
    pub fn shifted(&self, delta: i64, weekday: Option<Weekday>) -> Option<StoryTime> {
        match self {
            StoryTime::Absolute { date, resolution } => date
                .add_days(delta)
                .map(|date| StoryTime::Absolute { date, resolution: *resolution }),
            StoryTime::RelativeOffset { days, .. } => days
                .checked_add(delta)
                .map(|days| StoryTime::RelativeOffset { days, weekday }),
            StoryTime::Unknown => None,
        }
    }
}

impl fmt::Display for StoryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{:04}", year)?,
            None => write!(f, "????")?,
        }
        if let Some(month) = self.month {
            write!(f, "-{:02}", month)?;
            if let Some(day) = self.day {
                write!(f, "-{:02}", day)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for StoryTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryTime::Absolute { date, resolution: DateResolution::Season } => write!(f, "season of {}", date),
            StoryTime::Absolute { date, .. } => write!(f, "{}", date),
            StoryTime::RelativeOffset { days, .. } => write!(f, "day {:+}", days),
            StoryTime::Unknown => write!(f, "unknown"),
        }
    }
}

// ==================== EVENTS ====================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub usize);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeOrder {
    #[default]
    Chronological,
    Analepsis,
    Prolepsis,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Seed event for a chapter
    Chapter,
    /// Absolute date with no matching chapter
    Dated,
    /// Chained from a relative marker
    Relative,
    /// Character age mention
    CharacterAge,
    /// Synthetic day zero beside a first chapter that only has a partial date
    Anchor,
}

/// What an event was chained from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventReference {
    pub event: EventId,
    pub delta_days: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimelineEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub description: String,
    pub chapter: u32,
    pub paragraph: u32,
    /// Offset in reading order, fixed at creation
    pub discourse_position: usize,
    pub story_time: StoryTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<EventReference>,
    pub narrative_order: NarrativeOrder,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<AgeValue>,
}

impl TimelineEvent {
    pub fn new(kind: EventKind, description: &str, chapter: u32, discourse_position: usize) -> Self {
        Self {
            id: EventId(0),
            kind,
            description: description.to_string(),
            chapter,
            paragraph: 0,
            discourse_position,
            story_time: StoryTime::Unknown,
            reference: None,
            narrative_order: NarrativeOrder::Chronological,
            confidence: 1.0,
            marker_text: None,
            marker_direction: None,
            character: None,
            age: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.story_time.ordinal().is_some()
    }
}

/// Chapter descriptor from the extraction stage
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChapterInfo {
    pub number: u32,
    #[serde(default)]
    pub title: String,
    pub start_offset: usize,
}

impl ChapterInfo {
    pub fn new(number: u32, title: &str, start_offset: usize) -> Self {
        Self {
            number,
            title: title.to_string(),
            start_offset,
        }
    }

    pub fn label(&self) -> String {
        if self.title.is_empty() {
            format!("Chapter {}", self.number)
        } else {
            format!("Chapter {}: {}", self.number, self.title)
        }
    }
}

// ==================== TIMELINE ====================

/// Calendar or offset extent of the resolved events
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TimeSpan {
    pub earliest: StoryTime,
    pub latest: StoryTime,
    pub days: i64,
    /// True when the span is measured in day offsets from the synthetic anchor
    pub is_synthetic: bool,
}

/// Event collection plus anchor ids.
///
/// Anchors are events with an `Absolute` time at `Year` resolution or finer,
/// or the single synthetic zero point (`RelativeOffset(0)`) laid down when
/// the document has no trustworthy date at all.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    anchors: Vec<EventId>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, mut event: TimelineEvent) -> EventId {
        let id = EventId(self.events.len());
        event.id = id;
        self.events.push(event);
        id
    }

    pub(crate) fn event_mut(&mut self, id: EventId) -> Option<&mut TimelineEvent> {
        self.events.get_mut(id.0)
    }

    pub(crate) fn add_anchor(&mut self, id: EventId) {
        if !self.anchors.contains(&id) {
            self.anchors.push(id);
        }
    }

    pub(crate) fn set_order(&mut self, id: EventId, order: NarrativeOrder) {
        if let Some(event) = self.events.get_mut(id.0) {
            event.narrative_order = order;
        }
    }

    pub fn event(&self, id: EventId) -> Option<&TimelineEvent> {
        self.events.get(id.0)
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn anchors(&self) -> &[EventId] {
        &self.anchors
    }

    pub fn is_anchor(&self, id: EventId) -> bool {
        self.anchors.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True when the only anchor is the synthetic zero point
    pub fn has_synthetic_anchor(&self) -> bool {
        self.anchors.iter().any(|id| {
            self.event(*id)
                .map_or(false, |e| matches!(e.story_time, StoryTime::RelativeOffset { .. }))
        })
    }

    /// Frame holding more resolved events (ties go to the calendar)
    pub fn dominant_frame(&self) -> Option<TimeFrame> {
        let mut calendar = 0usize;
        let mut relative = 0usize;
        for event in &self.events {
            match event.story_time.ordinal() {
                Some((TimeFrame::Calendar, _)) => calendar += 1,
                Some((TimeFrame::Relative, _)) => relative += 1,
                None => {}
            }
        }
        match (calendar, relative) {
            (0, 0) => None,
            (c, r) if c >= r => Some(TimeFrame::Calendar),
            _ => Some(TimeFrame::Relative),
        }
    }

    /// Resolved events of the dominant frame with their day ordinal, in
    /// story order (ties by discourse position, then id).
    pub fn chronological(&self) -> Vec<(&TimelineEvent, i64)> {
        let Some(frame) = self.dominant_frame() else {
            return Vec::new();
        };
        let mut resolved: Vec<(&TimelineEvent, i64)> = self
            .events
            .iter()
            .filter_map(|e| match e.story_time.ordinal() {
                Some((f, ordinal)) if f == frame => Some((e, ordinal)),
                _ => None,
            })
            .collect();
        resolved.sort_by_key(|(e, ordinal)| (*ordinal, e.discourse_position, e.id));
        resolved
    }

    /// Every event in reading order
    pub fn discourse_order(&self) -> Vec<&TimelineEvent> {
        let mut events: Vec<&TimelineEvent> = self.events.iter().collect();
        events.sort_by_key(|e| (e.discourse_position, e.id));
        events
    }

    pub fn events_in_chapter(&self, chapter: u32) -> Vec<&TimelineEvent> {
        self.events.iter().filter(|e| e.chapter == chapter).collect()
    }

    pub fn analepses(&self) -> Vec<&TimelineEvent> {
        self.with_order(NarrativeOrder::Analepsis)
    }

    pub fn prolepses(&self) -> Vec<&TimelineEvent> {
        self.with_order(NarrativeOrder::Prolepsis)
    }

    fn with_order(&self, order: NarrativeOrder) -> Vec<&TimelineEvent> {
        self.events.iter().filter(|e| e.narrative_order == order).collect()
    }

    /// Earliest to latest resolved event in the dominant frame
    pub fn time_span(&self) -> Option<TimeSpan> {
        let chronological = self.chronological();
        let (first, first_ordinal) = chronological.first()?;
        let (last, last_ordinal) = chronological.last()?;
        Some(TimeSpan {
            earliest: first.story_time,
            latest: last.story_time,
            days: last_ordinal.saturating_sub(*first_ordinal),
            is_synthetic: matches!(first.story_time, StoryTime::RelativeOffset { .. }),
        })
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_overflow_is_unresolved() {
        assert_eq!(StoryTime::offset(i64::MAX).shifted(1, None), None);
        assert_eq!(StoryTime::offset(i64::MIN).shifted(-1, None), None);
        assert_eq!(StoryTime::offset(3).shifted(2, None), Some(StoryTime::offset(5)));
        assert_eq!(StoryDate::ymd(1850, 1, 1).add_days(i64::MAX), None);
    }

    #[test]
    fn test_partial_date_ordinal() {
        let yearless = StoryDate::new(None, Some(6), Some(3));
        assert!(yearless.day_number().is_none());

        let year_only = StoryDate::new(Some(1850), None, None);
        let jan_first = StoryDate::ymd(1850, 1, 1);
        assert_eq!(year_only.day_number(), jan_first.day_number());
    }

    #[test]
    fn test_day_clamping() {
        let feb = StoryDate::ymd(1851, 2, 31);
        assert_eq!(feb.to_naive(), NaiveDate::from_ymd_opt(1851, 2, 28));
    }

    #[test]
    fn test_add_days_crosses_month() {
        let date = StoryDate::ymd(1850, 1, 30);
        assert_eq!(date.add_days(3), Some(StoryDate::ymd(1850, 2, 2)));
        assert_eq!(date.add_days(-30), Some(StoryDate::ymd(1849, 12, 31)));
    }

    #[test]
    fn test_resolution_order() {
        assert!(DateResolution::Day < DateResolution::Year);
        assert!(DateResolution::Year.is_anchor_grade());
        assert!(!DateResolution::Season.is_anchor_grade());
        assert!(!DateResolution::Partial.is_anchor_grade());
    }

    #[test]
    fn test_shift_keeps_resolution() {
        let time = StoryTime::absolute(StoryDate::new(Some(1850), None, None), DateResolution::Year);
        let shifted = time.shifted(400, None).unwrap();
        assert_eq!(shifted.resolution(), Some(DateResolution::Year));
        assert_eq!(shifted.year(), Some(1851));

        assert_eq!(StoryTime::offset(3).shifted(2, None), Some(StoryTime::offset(5)));
        assert_eq!(StoryTime::Unknown.shifted(1, None), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(StoryTime::absolute(StoryDate::ymd(1850, 1, 3), DateResolution::Day).to_string(), "1850-01-03");
        assert_eq!(StoryTime::absolute(StoryDate::new(Some(1850), None, None), DateResolution::Year).to_string(), "1850");
        assert_eq!(StoryTime::offset(-2).to_string(), "day -2");
        assert_eq!(StoryTime::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_push_assigns_ids() {
        let mut timeline = Timeline::new();
        let a = timeline.push(TimelineEvent::new(EventKind::Chapter, "Chapter 1", 1, 0));
        let b = timeline.push(TimelineEvent::new(EventKind::Chapter, "Chapter 2", 2, 100));
        assert_eq!(a, EventId(0));
        assert_eq!(b, EventId(1));
        assert_eq!(timeline.event(b).map(|e| e.id), Some(b));
    }

    #[test]
    fn test_dominant_frame_prefers_majority() {
        let mut timeline = Timeline::new();
        let mut e = TimelineEvent::new(EventKind::Chapter, "a", 1, 0);
        e.story_time = StoryTime::offset(0);
        timeline.push(e.clone());
        e.story_time = StoryTime::offset(4);
        timeline.push(e.clone());
        e.story_time = StoryTime::absolute(StoryDate::new(Some(1900), None, None), DateResolution::Season);
        timeline.push(e);

        assert_eq!(timeline.dominant_frame(), Some(TimeFrame::Relative));
        let span = timeline.time_span().unwrap();
        assert_eq!(span.days, 4);
        assert!(span.is_synthetic);
    }
}
