//! Tests for the Timeline Builder
//!
//! Contract tests for seeding, anchoring and relative chaining.

use chrono::Weekday;

use crate::config::BuilderConfig;
use crate::timeline::{
    AgeValue, ChapterInfo, DateResolution, Direction, EventId, EventKind, MarkerKind, Season,
    SourceSpan, StoryDate, StoryTime, TemporalMarker, TimeUnit, TimelineBuilder,
};

fn builder() -> TimelineBuilder {
    TimelineBuilder::new(BuilderConfig::default()).unwrap()
}

fn chapters() -> Vec<ChapterInfo> {
    vec![
        ChapterInfo::new(1, "Arrival", 0),
        ChapterInfo::new(2, "The Mill", 1000),
        ChapterInfo::new(3, "Winter", 2000),
    ]
}

fn date(chapter: u32, start: usize, year: Option<i32>, month: Option<u32>, day: Option<u32>, conf: f64) -> TemporalMarker {
    TemporalMarker::new(
        "date",
        SourceSpan::new(start, start + 4, chapter, 0),
        MarkerKind::AbsoluteDate { year, month, day, weekday: None },
        conf,
    )
}

fn relative(text: &str, chapter: u32, start: usize, direction: Direction, quantity: Option<f64>, unit: Option<TimeUnit>) -> TemporalMarker {
    TemporalMarker::new(
        text,
        SourceSpan::new(start, start + text.len(), chapter, 0),
        MarkerKind::RelativeTime { direction, unit, quantity, weekday: None },
        0.8,
    )
}

// ============================================================================
// Seeding
// ============================================================================

#[test]
fn test_empty_input_gives_chapter_seeds() {
    let timeline = builder().build(&[], &chapters()).unwrap();
    assert_eq!(timeline.len(), 3);
    assert!(timeline.anchors().is_empty());
    assert!(timeline.events().iter().all(|e| e.story_time.is_unknown()));
    assert_eq!(timeline.events()[1].discourse_position, 1000);
    assert_eq!(timeline.events()[1].description, "Chapter 2: The Mill");
}

#[test]
fn test_no_input_at_all() {
    let timeline = builder().build(&[], &[]).unwrap();
    assert!(timeline.is_empty());
    assert!(timeline.time_span().is_none());
}

// ============================================================================
// Absolute Dates
// ============================================================================

#[test]
fn test_absolute_date_becomes_anchor() {
    let markers = vec![date(2, 1010, Some(1850), Some(6), Some(3), 0.9)];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    assert_eq!(timeline.anchors(), &[EventId(1)]);
    assert_eq!(
        timeline.events()[1].story_time,
        StoryTime::absolute(StoryDate::ymd(1850, 6, 3), DateResolution::Day)
    );
    assert_eq!(timeline.events()[1].confidence, 0.9);
}

#[test]
fn test_higher_confidence_wins_even_if_less_precise() {
    let markers = vec![
        date(1, 20, Some(1851), Some(2), Some(9), 0.6),
        date(1, 10, Some(1850), None, None, 0.9),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    let seed = &timeline.events()[0];
    assert_eq!(seed.story_time.year(), Some(1850));
    assert_eq!(seed.story_time.resolution(), Some(DateResolution::Year));
    assert_eq!(seed.confidence, 0.9);
}

#[test]
fn test_equal_confidence_prefers_precision() {
    let markers = vec![
        date(1, 10, Some(1850), None, None, 0.8),
        date(1, 20, Some(1850), Some(4), None, 0.8),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();
    assert_eq!(timeline.events()[0].story_time.resolution(), Some(DateResolution::Month));
    assert_eq!(timeline.anchors(), &[EventId(0)]);
}

#[test]
fn test_unknown_chapter_creates_standalone_event() {
    let markers = vec![date(9, 5000, Some(1900), Some(1), Some(1), 0.9)];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    assert_eq!(timeline.len(), 4);
    let event = &timeline.events()[3];
    assert_eq!(event.kind, EventKind::Dated);
    assert_eq!(event.discourse_position, 5000);
    assert!(timeline.is_anchor(event.id));
}

#[test]
fn test_season_and_partial_dates_are_not_anchors() {
    let markers = vec![
        TemporalMarker::new(
            "the summer of 1850",
            SourceSpan::new(10, 28, 1, 0),
            MarkerKind::SeasonOrEpoch { season: Some(Season::Summer), year: Some(1850), epoch: None },
            0.8,
        ),
        date(2, 1010, None, Some(6), Some(3), 0.9),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    assert_eq!(timeline.events()[0].story_time.resolution(), Some(DateResolution::Season));
    assert_eq!(timeline.events()[1].story_time.resolution(), Some(DateResolution::Partial));
    assert!(timeline.anchors().is_empty());
}

#[test]
fn test_anchor_invariant() {
    let markers = vec![
        date(1, 10, Some(1850), Some(6), None, 0.9),
        date(3, 2010, Some(1852), None, None, 0.7),
        relative("the next day", 1, 50, Direction::Future, None, None),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();
    for id in timeline.anchors() {
        let event = timeline.event(*id).unwrap();
        assert!(event.story_time.resolution().map_or(false, |r| r.is_anchor_grade()));
    }
}

// ============================================================================
// Synthetic Anchor + Chaining
// ============================================================================

#[test]
fn test_synthetic_anchor_carries_weekday() {
    let markers = vec![
        TemporalMarker::new(
            "on a Tuesday",
            SourceSpan::new(5, 17, 1, 0),
            MarkerKind::AbsoluteDate { year: None, month: None, day: None, weekday: Some(Weekday::Tue) },
            0.7,
        ),
        relative("the next day", 1, 40, Direction::Unspecified, None, None),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    assert_eq!(
        timeline.events()[0].story_time,
        StoryTime::RelativeOffset { days: 0, weekday: Some(Weekday::Tue) }
    );
    assert_eq!(timeline.events()[3].story_time, StoryTime::offset(1));
    assert!(timeline.has_synthetic_anchor());
}

#[test]
fn test_no_fabricated_calendar_dates() {
    let markers = vec![
        relative("three days later", 1, 100, Direction::Future, Some(3.0), Some(TimeUnit::Day)),
        relative("the night before", 2, 1100, Direction::Unspecified, None, None),
        relative("two weeks later", 3, 2100, Direction::Future, Some(2.0), Some(TimeUnit::Week)),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();
    assert!(timeline.events().iter().all(|e| !e.story_time.is_absolute()));

    let offsets: Vec<i64> = timeline
        .events()
        .iter()
        .filter(|e| e.kind == EventKind::Relative)
        .filter_map(|e| match e.story_time {
            StoryTime::RelativeOffset { days, .. } => Some(days),
            _ => None,
        })
        .collect();
    assert_eq!(offsets, vec![3, 2, 16]);
}

#[test]
fn test_synthetic_anchor_beside_seasonal_chapter() {
    let markers = vec![
        TemporalMarker::new(
            "that summer",
            SourceSpan::new(10, 21, 1, 0),
            MarkerKind::SeasonOrEpoch { season: Some(Season::Summer), year: None, epoch: None },
            0.8,
        ),
        relative("3 days later", 1, 100, Direction::Future, Some(3.0), Some(TimeUnit::Day)),
        relative("2 days later", 1, 200, Direction::Future, Some(2.0), Some(TimeUnit::Day)),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    // The partial date stays on the chapter seed, day zero gets its own event
    assert_eq!(timeline.events()[0].story_time.resolution(), Some(DateResolution::Partial));
    let anchor = timeline.event(timeline.anchors()[0]).unwrap();
    assert_eq!(timeline.anchors().len(), 1);
    assert_eq!(anchor.kind, EventKind::Anchor);
    assert_eq!(anchor.chapter, 1);
    assert_eq!(anchor.story_time, StoryTime::offset(0));
    assert!(timeline.has_synthetic_anchor());

    let chained: Vec<&StoryTime> = timeline
        .events()
        .iter()
        .filter(|e| e.kind == EventKind::Relative)
        .map(|e| &e.story_time)
        .collect();
    assert_eq!(chained, vec![&StoryTime::offset(3), &StoryTime::offset(5)]);
    assert!(timeline.events().iter().all(|e| e.story_time.year().is_none()));
}

#[test]
fn test_oversized_shift_dropped() {
    let markers = vec![
        relative("ages later", 1, 100, Direction::Future, Some(1e300), Some(TimeUnit::Year)),
        relative("a day later", 1, 200, Direction::Future, Some(1.0), Some(TimeUnit::Day)),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    let chained: Vec<&StoryTime> = timeline
        .events()
        .iter()
        .filter(|e| e.kind == EventKind::Relative)
        .map(|e| &e.story_time)
        .collect();
    assert_eq!(chained, vec![&StoryTime::offset(1)]);
}

#[test]
fn test_chaining_off_absolute_anchor() {
    let markers = vec![
        date(1, 10, Some(1850), Some(1), Some(30), 0.9),
        relative("three days later", 1, 100, Direction::Future, Some(3.0), Some(TimeUnit::Day)),
        relative("a month earlier", 1, 200, Direction::Past, Some(1.0), Some(TimeUnit::Month)),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    let first = &timeline.events()[3];
    assert_eq!(
        first.story_time,
        StoryTime::absolute(StoryDate::ymd(1850, 2, 2), DateResolution::Day)
    );
    assert_eq!(first.confidence, 0.8 * 0.8);

    let second = &timeline.events()[4];
    assert_eq!(second.reference.map(|r| (r.event, r.delta_days)), Some((EventId(3), -30)));
    assert_eq!(
        second.story_time,
        StoryTime::absolute(StoryDate::ymd(1850, 1, 3), DateResolution::Day)
    );
}

#[test]
fn test_reanchoring_on_newer_anchor() {
    let markers = vec![
        date(1, 10, Some(1850), Some(1), Some(1), 0.9),
        relative("two days later", 1, 100, Direction::Future, Some(2.0), Some(TimeUnit::Day)),
        date(2, 1010, Some(1860), Some(5), Some(1), 0.9),
        relative("the next day", 2, 1100, Direction::Future, None, None),
    ];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    let last = timeline.events().last().unwrap();
    assert_eq!(last.reference.map(|r| r.event), Some(EventId(1)));
    assert_eq!(last.story_time.year(), Some(1860));
}

#[test]
fn test_relative_without_chapters_dropped() {
    let markers = vec![relative("the next day", 1, 40, Direction::Future, None, None)];
    let timeline = builder().build(&markers, &[]).unwrap();
    assert!(timeline.is_empty());
}

// ============================================================================
// Ages + Determinism
// ============================================================================

#[test]
fn test_age_markers_are_standalone() {
    let markers = vec![TemporalMarker::new(
        "twelve years old",
        SourceSpan::new(300, 316, 1, 2),
        MarkerKind::CharacterAge { character: "Ada".into(), age: AgeValue::Years(12.0) },
        0.9,
    )];
    let timeline = builder().build(&markers, &chapters()).unwrap();

    let event = timeline.events().last().unwrap();
    assert_eq!(event.kind, EventKind::CharacterAge);
    assert_eq!(event.character.as_deref(), Some("Ada"));
    assert!(event.reference.is_none());
    assert!(event.story_time.is_unknown());
    assert!((event.confidence - 0.45).abs() < 1e-9);
    assert!(timeline.anchors().is_empty());
}

#[test]
fn test_build_is_deterministic() {
    let markers = vec![
        relative("the next day", 2, 1100, Direction::Future, None, None),
        date(1, 10, Some(1850), Some(6), None, 0.7),
        date(1, 20, Some(1849), Some(6), Some(2), 0.7),
        relative("a while later", 1, 500, Direction::Unspecified, None, None),
    ];
    let b = builder();
    let first = serde_json::to_string(&b.build(&markers, &chapters()).unwrap()).unwrap();
    let second = serde_json::to_string(&b.build(&markers, &chapters()).unwrap()).unwrap();
    assert_eq!(first, second);
}
