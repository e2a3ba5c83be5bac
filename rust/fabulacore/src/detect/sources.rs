//! Candidate sources, one per inconsistency category
//!
//! Each source is a cheap, direct comparison over the timeline or the raw
//! markers. Its confidence becomes the direct method's vote.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use unicode_segmentation::UnicodeSegmentation;

use super::{CandidateSource, DetectionContext, InconsistencyCandidate, InconsistencyKind, Severity};
use crate::consensus::normalize;
use crate::timeline::{
    AgeValue, EventId, EventKind, MarkerKind, NarrativeOrder, TemporalMarker, TimeFrame, Timeline,
    TimelineEvent,
};

const DAYS_PER_YEAR: f64 = 365.25;

/// Words that name a calendar slot, not an occurrence
const CALENDAR_WORDS: &[&str] = &[
    "january", "february", "march", "april", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday", "spring", "summer", "autumn", "winter", "year",
    "month", "week", "morning", "evening", "night",
];

/// Every built-in category
pub fn default_sources() -> Vec<Box<dyn CandidateSource>> {
    vec![
        Box::new(ImpossibleSequenceSource),
        Box::new(SuspiciousJumpSource),
        Box::new(MarkerConflictSource),
        Box::new(CharacterAgeSource),
        Box::new(AnachronismSource),
    ]
}

// ==================== SEQUENCES ====================

pub struct ImpossibleSequenceSource;

impl CandidateSource for ImpossibleSequenceSource {
    fn name(&self) -> &'static str {
        "impossible_sequence"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate> {
        let dated = dated_in_reading_order(ctx.timeline);
        let threshold = ctx.config.impossible_sequence_days;

        dated
            .windows(2)
            .filter_map(|pair| {
                let (prev, prev_ordinal) = pair[0];
                let (current, ordinal) = pair[1];
                // A declared flashback or flash-forward explains the step
                if prev.narrative_order != NarrativeOrder::Chronological
                    || current.narrative_order != NarrativeOrder::Chronological
                {
                    return None;
                }
                if prev_ordinal.saturating_sub(ordinal) <= threshold {
                    return None;
                }

                Some(
                    InconsistencyCandidate::new(
                        InconsistencyKind::ImpossibleSequence,
                        Severity::High,
                        current.chapter,
                        current.discourse_position,
                        format!(
                            "'{}' happens before '{}' but is narrated after it without a flashback cue",
                            clip(&current.description),
                            clip(&prev.description)
                        ),
                        0.85,
                    )
                    .with_events(vec![prev.id, current.id])
                    .with_expectation(format!("after {}", prev.story_time), current.story_time.to_string())
                    .with_suggestion("Add a flashback marker or revise the dates."),
                )
            })
            .collect()
    }
}

pub struct SuspiciousJumpSource;

impl CandidateSource for SuspiciousJumpSource {
    fn name(&self) -> &'static str {
        "suspicious_jump"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate> {
        let dated: Vec<(&TimelineEvent, i64)> = dated_in_reading_order(ctx.timeline)
            .into_iter()
            .filter(|(e, _)| e.narrative_order == NarrativeOrder::Chronological)
            .collect();
        let threshold = ctx.config.suspicious_jump_years * 365;

        dated
            .windows(2)
            .filter_map(|pair| {
                let (prev, prev_ordinal) = pair[0];
                let (current, ordinal) = pair[1];
                let delta = ordinal.saturating_sub(prev_ordinal);
                if delta <= threshold {
                    return None;
                }

                Some(
                    InconsistencyCandidate::new(
                        InconsistencyKind::SuspiciousJump,
                        Severity::Low,
                        current.chapter,
                        current.discourse_position,
                        format!(
                            "{}-year jump between chapter {} and chapter {} without an explicit transition",
                            delta / 365,
                            prev.chapter,
                            current.chapter
                        ),
                        0.6,
                    )
                    .with_events(vec![prev.id, current.id])
                    .with_suggestion("Consider an explicit time marker for the jump."),
                )
            })
            .collect()
    }
}

// ==================== MARKERS ====================

pub struct MarkerConflictSource;

impl CandidateSource for MarkerConflictSource {
    fn name(&self) -> &'static str {
        "marker_conflict"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate> {
        let mut candidates = direction_conflicts(ctx);
        candidates.extend(cross_chapter_dates(ctx));
        candidates
    }
}

/// Relative markers close together that point in opposite directions
fn direction_conflicts(ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate> {
    let mut by_chapter: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (index, marker) in ctx.markers.iter().enumerate() {
        if marker.is_relative() {
            by_chapter.entry(marker.span.chapter).or_default().push(index);
        }
    }

    let mut candidates = Vec::new();
    for (chapter, mut indices) in by_chapter {
        indices.sort_by_key(|i| (ctx.markers[*i].span.start, *i));

        for (n, &i) in indices.iter().enumerate() {
            for &j in &indices[n + 1..] {
                let (a, b) = (&ctx.markers[i], &ctx.markers[j]);
                if b.span.start - a.span.start >= ctx.config.marker_conflict_window {
                    break;
                }
                if !a.direction().is_opposite(b.direction()) {
                    continue;
                }

                candidates.push(
                    InconsistencyCandidate::new(
                        InconsistencyKind::MarkerConflict,
                        Severity::Medium,
                        chapter,
                        a.span.start,
                        format!(
                            "Contradictory time markers: '{}' ({:?}) and '{}' ({:?})",
                            a.text,
                            a.direction(),
                            b.text,
                            b.direction()
                        ),
                        0.7,
                    )
                    .with_events(relative_events_at(ctx.timeline, &[a, b]))
                    .with_markers(vec![i, j])
                    .with_suggestion("Check the time references in this passage."),
                );
            }
        }
    }
    candidates
}

/// Absolute dates in different chapters that describe the same occurrence
/// (shared context words) but disagree on the year
fn cross_chapter_dates(ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate> {
    let dated: Vec<(usize, i32, BTreeSet<String>)> = ctx
        .markers
        .iter()
        .enumerate()
        .filter_map(|(i, m)| match m.kind {
            MarkerKind::AbsoluteDate { year: Some(year), .. } => Some((i, year, context_words(&m.text))),
            _ => None,
        })
        .collect();

    let mut candidates = Vec::new();
    for (n, (i, year_i, words_i)) in dated.iter().enumerate() {
        for (j, year_j, words_j) in &dated[n + 1..] {
            let (a, b) = (&ctx.markers[*i], &ctx.markers[*j]);
            if a.span.chapter == b.span.chapter || year_i == year_j {
                continue;
            }
            if words_i.is_disjoint(words_j) {
                continue;
            }

            // Report at the later chapter
            let ((first, first_year), (second, second_year)) = if a.span.chapter < b.span.chapter {
                ((a, *year_i), (b, *year_j))
            } else {
                ((b, *year_j), (a, *year_i))
            };
            let confidence = if (first_year - second_year).abs() <= 10 { 0.85 } else { 0.75 };

            candidates.push(
                InconsistencyCandidate::new(
                    InconsistencyKind::MarkerConflict,
                    Severity::High,
                    second.span.chapter,
                    second.span.start,
                    format!(
                        "Possible date conflict: '{}' (chapter {}) vs '{}' (chapter {})",
                        first.text, first.span.chapter, second.text, second.span.chapter
                    ),
                    confidence,
                )
                .with_markers(if first.span.chapter == a.span.chapter { vec![*i, *j] } else { vec![*j, *i] })
                .with_expectation(
                    format!("year {} (chapter {})", first_year, first.span.chapter),
                    format!("year {} (chapter {})", second_year, second.span.chapter),
                )
                .with_suggestion("Check whether both dates refer to the same event."),
            );
        }
    }
    candidates
}

fn context_words(text: &str) -> BTreeSet<String> {
    text.unicode_words()
        .filter(|w| w.chars().count() >= 4 && w.chars().all(char::is_alphabetic))
        .map(str::to_lowercase)
        .filter(|w| !CALENDAR_WORDS.contains(&w.as_str()))
        .collect()
}

fn relative_events_at(timeline: &Timeline, markers: &[&TemporalMarker]) -> Vec<EventId> {
    timeline
        .events()
        .iter()
        .filter(|e| e.kind == EventKind::Relative)
        .filter(|e| markers.iter().any(|m| m.span.start == e.discourse_position))
        .map(|e| e.id)
        .collect()
}

// ==================== AGES ====================

pub struct CharacterAgeSource;

impl CandidateSource for CharacterAgeSource {
    fn name(&self) -> &'static str {
        "character_age"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate> {
        let chapter_dates = chapter_dates(ctx.timeline);

        let mut by_character: BTreeMap<String, Vec<(&TimelineEvent, AgeValue)>> = BTreeMap::new();
        for event in ctx.timeline.events() {
            if let (Some(character), Some(age)) = (&event.character, event.age) {
                by_character.entry(normalize(character)).or_default().push((event, age));
            }
        }

        let mut candidates = Vec::new();
        for (character, mut mentions) in by_character {
            mentions.sort_by_key(|(e, _)| (e.chapter, e.discourse_position, e.id));

            for pair in mentions.windows(2) {
                let (prev, prev_age) = pair[0];
                let (current, age) = pair[1];
                let mut events = vec![prev.id, current.id];
                if let Some(seed) = chapter_seed(ctx.timeline, current.chapter) {
                    events.push(seed);
                }

                let dates = (chapter_dates.get(&prev.chapter), chapter_dates.get(&current.chapter));
                let candidate = match (prev_age.years(), age.years(), dates) {
                    (Some(before), Some(after), (Some(from), Some(to))) => {
                        let elapsed = (to - from) as f64 / DAYS_PER_YEAR;
                        if ((after - before) - elapsed).abs() <= ctx.config.age_tolerance_years {
                            continue;
                        }
                        let expected = (before + elapsed).round();
                        InconsistencyCandidate::new(
                            InconsistencyKind::AgeDateMismatch,
                            Severity::High,
                            current.chapter,
                            current.discourse_position,
                            format!(
                                "{} goes from {} (chapter {}) to {} (chapter {}) but only {:.1} years pass",
                                character, before, prev.chapter, after, current.chapter, elapsed
                            ),
                            0.9,
                        )
                        .with_expectation(format!("about {} years old", expected), format!("{} years old", after))
                        .with_suggestion("Revise the stated age or the dates between the mentions.")
                    }
                    (Some(before), Some(after), _) => {
                        if after >= before || current.chapter <= prev.chapter {
                            continue;
                        }
                        InconsistencyCandidate::new(
                            InconsistencyKind::AgeContradiction,
                            Severity::Critical,
                            current.chapter,
                            current.discourse_position,
                            format!(
                                "{} is {} in chapter {} but {} in the later chapter {}",
                                character, before, prev.chapter, after, current.chapter
                            ),
                            0.95,
                        )
                        .with_expectation(format!(">= {} years old", before), format!("{} years old", after))
                        .with_suggestion("A character cannot get younger outside a flashback.")
                    }
                    _ => {
                        if age.phase() >= prev_age.phase() || current.chapter <= prev.chapter {
                            continue;
                        }
                        InconsistencyCandidate::new(
                            InconsistencyKind::LifePhaseRegression,
                            Severity::Medium,
                            current.chapter,
                            current.discourse_position,
                            format!(
                                "{} is described as {:?} in chapter {} after being {:?} in chapter {}",
                                character,
                                age.phase(),
                                current.chapter,
                                prev_age.phase(),
                                prev.chapter
                            ),
                            0.7,
                        )
                        .with_expectation(format!("{:?} or older", prev_age.phase()), format!("{:?}", age.phase()))
                        .with_suggestion("Check the age description or mark the passage as a flashback.")
                    }
                };
                candidates.push(candidate.with_events(events));
            }
        }
        candidates
    }
}

/// First calendar day narrated in each chapter
fn chapter_dates(timeline: &Timeline) -> HashMap<u32, i64> {
    let mut dates = HashMap::new();
    for event in timeline.discourse_order() {
        if let Some((TimeFrame::Calendar, ordinal)) = event.story_time.ordinal() {
            dates.entry(event.chapter).or_insert(ordinal);
        }
    }
    dates
}

fn chapter_seed(timeline: &Timeline, chapter: u32) -> Option<EventId> {
    timeline
        .events()
        .iter()
        .find(|e| e.kind == EventKind::Chapter && e.chapter == chapter)
        .map(|e| e.id)
}

// ==================== ANACHRONISMS ====================

pub struct AnachronismSource;

impl CandidateSource for AnachronismSource {
    fn name(&self) -> &'static str {
        "anachronism"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate> {
        let Some(span) = ctx.timeline.time_span() else {
            return Vec::new();
        };
        let (Some(story_start), Some(story_end)) = (span.earliest.year(), span.latest.year()) else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for (index, marker) in ctx.markers.iter().enumerate() {
            let MarkerKind::SeasonOrEpoch { epoch, .. } = &marker.kind else {
                continue;
            };
            let haystack = format!("{} {}", epoch.as_deref().unwrap_or(""), marker.text).to_lowercase();

            for period in &ctx.config.epochs {
                if !period.is_named_in(&haystack) {
                    continue;
                }
                if story_end >= period.start_year && story_start <= period.end_year {
                    continue;
                }
                candidates.push(
                    InconsistencyCandidate::new(
                        InconsistencyKind::Anachronism,
                        Severity::Medium,
                        marker.span.chapter,
                        marker.span.start,
                        format!(
                            "Reference to '{}' ({}-{}) in a story set between {} and {}",
                            period.name, period.start_year, period.end_year, story_start, story_end
                        ),
                        0.75,
                    )
                    .with_markers(vec![index])
                    .with_suggestion("Check the reference against the period of the story."),
                );
            }
        }
        candidates
    }
}

// ==================== HELPERS ====================

/// Resolved events of the dominant frame in reading order
fn dated_in_reading_order(timeline: &Timeline) -> Vec<(&TimelineEvent, i64)> {
    let Some(frame) = timeline.dominant_frame() else {
        return Vec::new();
    };
    timeline
        .discourse_order()
        .into_iter()
        .filter_map(|e| match e.story_time.ordinal() {
            Some((f, ordinal)) if f == frame => Some((e, ordinal)),
            _ => None,
        })
        .collect()
}

fn clip(text: &str) -> String {
    text.chars().take(50).collect()
}
