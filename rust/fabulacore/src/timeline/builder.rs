//! TimelineBuilder - markers + chapters → Timeline
//!
//! Strictly sequential per document: relative markers chain off the last
//! resolved event, so each step depends on the one before it.
//!
//! # Passes
//! 1. One seed event per chapter, story time `Unknown`
//! 2. Absolute markers, highest confidence first, date the chapter seeds
//! 3. Synthetic zero-point anchor when no trustworthy date exists
//! 4. Relative markers in reading order, chained off the last resolved event
//! 5. Character ages as standalone low-weight events

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Weekday;
use tracing::{debug, info};

use super::lexicon::{IdiomShift, TemporalLexicon};
use super::marker::{Direction, MarkerKind, TemporalMarker, TimeUnit};
use super::model::{
    ChapterInfo, DateResolution, EventId, EventKind, EventReference, StoryDate, StoryTime,
    Timeline, TimelineEvent,
};
use crate::config::BuilderConfig;
use crate::error::EngineResult;

/// Largest day shift a single relative marker may express (100,000 years)
const MAX_SHIFT_DAYS: f64 = 36_525_000.0;

pub struct TimelineBuilder {
    config: BuilderConfig,
    lexicon: TemporalLexicon,
}

impl TimelineBuilder {
    pub fn new(config: BuilderConfig) -> EngineResult<Self> {
        Ok(Self {
            config,
            lexicon: TemporalLexicon::new()?,
        })
    }

    /// Build a timeline. Same input, same output: markers are sorted by a
    /// fixed key before each pass. Only malformed markers are errors;
    /// unresolvable ones are dropped.
    pub fn build(&self, markers: &[TemporalMarker], chapters: &[ChapterInfo]) -> EngineResult<Timeline> {
        for marker in markers {
            marker.validate()?;
        }

        let mut timeline = Timeline::new();
        let seeds = self.seed_chapters(&mut timeline, chapters);
        self.apply_absolute(&mut timeline, &seeds, markers);

        let has_relative = markers.iter().any(TemporalMarker::is_relative);
        if timeline.anchors().is_empty() && has_relative {
            self.synthesize_anchor(&mut timeline, chapters, markers);
        }

        self.chain_relative(&mut timeline, markers);
        self.add_ages(&mut timeline, markers);

        info!(
            events = timeline.len(),
            anchors = timeline.anchors().len(),
            synthetic = timeline.has_synthetic_anchor(),
            "timeline built"
        );
        Ok(timeline)
    }

    // ==================== PASS 1: CHAPTER SEEDS ====================

    fn seed_chapters(&self, timeline: &mut Timeline, chapters: &[ChapterInfo]) -> BTreeMap<u32, EventId> {
        let mut ordered: Vec<&ChapterInfo> = chapters.iter().collect();
        ordered.sort_by_key(|c| (c.start_offset, c.number));

        let mut seeds = BTreeMap::new();
        for chapter in ordered {
            if seeds.contains_key(&chapter.number) {
                debug!(chapter = chapter.number, "duplicate chapter descriptor ignored");
                continue;
            }
            let event = TimelineEvent::new(
                EventKind::Chapter,
                &chapter.label(),
                chapter.number,
                chapter.start_offset,
            );
            seeds.insert(chapter.number, timeline.push(event));
        }
        seeds
    }

    // ==================== PASS 2: ABSOLUTE DATES ====================

    fn apply_absolute(
        &self,
        timeline: &mut Timeline,
        seeds: &BTreeMap<u32, EventId>,
        markers: &[TemporalMarker],
    ) {
        let mut dated: Vec<(usize, StoryDate, DateResolution)> = markers
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| absolute_date(m).map(|(date, res)| (idx, date, res)))
            .collect();

        dated.sort_by(|a, b| {
            let (ma, mb) = (&markers[a.0], &markers[b.0]);
            mb.confidence
                .partial_cmp(&ma.confidence)
                .unwrap_or(Ordering::Equal)
                .then(ma.span.chapter.cmp(&mb.span.chapter))
                .then(ma.span.start.cmp(&mb.span.start))
                .then(a.0.cmp(&b.0))
        });

        for (idx, date, resolution) in dated {
            let marker = &markers[idx];
            let story_time = StoryTime::absolute(date, resolution);

            match seeds.get(&marker.span.chapter).copied() {
                Some(seed) => {
                    let Some(event) = timeline.event_mut(seed) else {
                        continue;
                    };
                    // Markers arrive in descending confidence, so an already
                    // dated seed was written by an equal or stronger marker.
                    let overwrite = match event.story_time.resolution() {
                        None => true,
                        Some(existing) => {
                            event.confidence == marker.confidence && resolution < existing
                        }
                    };
                    if !overwrite {
                        debug!(
                            chapter = marker.span.chapter,
                            text = %marker.text,
                            "absolute marker lost to a stronger date"
                        );
                        continue;
                    }
                    event.story_time = story_time;
                    event.confidence = marker.confidence;
                    event.paragraph = marker.span.paragraph;
                    event.marker_text = Some(marker.text.clone());
                    if resolution.is_anchor_grade() {
                        timeline.add_anchor(seed);
                    }
                }
                None => {
                    let mut event = TimelineEvent::new(
                        EventKind::Dated,
                        &marker.text,
                        marker.span.chapter,
                        marker.span.start,
                    );
                    event.paragraph = marker.span.paragraph;
                    event.story_time = story_time;
                    event.confidence = marker.confidence;
                    event.marker_text = Some(marker.text.clone());
                    let id = timeline.push(event);
                    if resolution.is_anchor_grade() {
                        timeline.add_anchor(id);
                    }
                }
            }
        }
    }

    // ==================== PASS 3: SYNTHETIC ANCHOR ====================

    /// Day zero on the first chapter. Never a calendar date.
    fn synthesize_anchor(&self, timeline: &mut Timeline, chapters: &[ChapterInfo], markers: &[TemporalMarker]) {
        let Some(first) = chapters.iter().min_by_key(|c| (c.start_offset, c.number)) else {
            debug!("no chapters, relative markers stay unanchored");
            return;
        };

        let weekday = first_weekday(markers, first.number);
        let Some(seed) = timeline
            .events()
            .iter()
            .find(|e| e.kind == EventKind::Chapter && e.chapter == first.number)
            .map(|e| e.id)
        else {
            return;
        };

        let Some(event) = timeline.event_mut(seed) else {
            return;
        };
        if event.story_time.is_unknown() {
            event.story_time = StoryTime::RelativeOffset { days: 0, weekday };
            timeline.add_anchor(seed);
            return;
        }

        // Season or partial date on the first chapter: keep it, and lay the
        // zero point down as its own event at the chapter start
        debug!(chapter = first.number, "first chapter partially dated, separate synthetic anchor");
        let mut anchor = TimelineEvent::new(EventKind::Anchor, "Day 0", first.number, first.start_offset);
        anchor.story_time = StoryTime::RelativeOffset { days: 0, weekday };
        let id = timeline.push(anchor);
        timeline.add_anchor(id);
    }

    // ==================== PASS 4: RELATIVE CHAINING ====================

    fn chain_relative(&self, timeline: &mut Timeline, markers: &[TemporalMarker]) {
        let mut relative: Vec<usize> = markers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_relative())
            .map(|(idx, _)| idx)
            .collect();
        relative.sort_by_key(|&idx| (markers[idx].span.chapter, markers[idx].span.start, idx));

        // Anchors in reading order
        let mut anchors: Vec<(usize, EventId)> = timeline
            .anchors()
            .iter()
            .filter_map(|id| timeline.event(*id).map(|e| (e.discourse_position, *id)))
            .collect();
        anchors.sort();

        let Some(&(_, first_anchor)) = anchors.first() else {
            if !relative.is_empty() {
                debug!(dropped = relative.len(), "relative markers without any anchor");
            }
            return;
        };

        let mut last: Option<EventId> = None;

        for idx in relative {
            let marker = &markers[idx];
            let MarkerKind::RelativeTime { direction, unit, quantity, weekday } = marker.kind else {
                continue;
            };

            // Nearest anchor at or before the marker, or the first anchor
            let nearest = anchors
                .iter()
                .rev()
                .find(|(pos, _)| *pos <= marker.span.start)
                .map(|(_, id)| *id)
                .unwrap_or(first_anchor);

            let base = match last {
                None => nearest,
                Some(prev) => {
                    let prev_pos = timeline.event(prev).map_or(0, |e| e.discourse_position);
                    let nearest_pos = timeline.event(nearest).map_or(0, |e| e.discourse_position);
                    if nearest_pos > prev_pos {
                        nearest
                    } else {
                        prev
                    }
                }
            };

            let Some(delta) = self.signed_offset(&marker.text, direction, unit.map(|u| (u, quantity))) else {
                debug!(text = %marker.text, "relative marker unresolved, dropped");
                continue;
            };

            let Some(story_time) = timeline
                .event(base)
                .and_then(|e| e.story_time.shifted(delta, weekday))
            else {
                debug!(text = %marker.text, "reference has no usable story time, dropped");
                continue;
            };

            let mut event = TimelineEvent::new(
                EventKind::Relative,
                &marker.text,
                marker.span.chapter,
                marker.span.start,
            );
            event.paragraph = marker.span.paragraph;
            event.story_time = story_time;
            event.reference = Some(EventReference { event: base, delta_days: delta });
            event.confidence = marker.confidence * self.config.relative_confidence_factor;
            event.marker_text = Some(marker.text.clone());
            event.marker_direction = Some(direction);

            last = Some(timeline.push(event));
        }
    }

    /// Signed day delta: explicit quantity × unit, else the idiom table.
    /// A unit without a quantity counts once ("a week later"). Shifts beyond
    /// `MAX_SHIFT_DAYS` are unresolvable.
    fn signed_offset(
        &self,
        text: &str,
        direction: Direction,
        unit: Option<(TimeUnit, Option<f64>)>,
    ) -> Option<i64> {
        let (days, default_direction) = match unit {
            Some((unit, quantity)) => {
                let days = (quantity.unwrap_or(1.0) * unit.days()).floor();
                if !days.is_finite() || days.abs() > MAX_SHIFT_DAYS {
                    debug!(text, days, "relative shift out of range");
                    return None;
                }
                (days as i64, Direction::Future)
            }
            None => match self.lexicon.idiom_shift(text)? {
                IdiomShift::Fixed { days, direction } => (days, direction),
                IdiomShift::Vague => (self.config.vague_progression_days, Direction::Future),
            },
        };

        let effective = match direction {
            Direction::Unspecified => default_direction,
            explicit => explicit,
        };
        Some(match effective {
            Direction::Past => -days,
            _ => days,
        })
    }

    // ==================== PASS 5: CHARACTER AGES ====================

    fn add_ages(&self, timeline: &mut Timeline, markers: &[TemporalMarker]) {
        let mut ages: Vec<&TemporalMarker> = markers.iter().filter(|m| m.is_age()).collect();
        ages.sort_by_key(|m| (m.span.chapter, m.span.start));

        for marker in ages {
            let MarkerKind::CharacterAge { character, age } = &marker.kind else {
                continue;
            };
            let mut event = TimelineEvent::new(
                EventKind::CharacterAge,
                &marker.text,
                marker.span.chapter,
                marker.span.start,
            );
            event.paragraph = marker.span.paragraph;
            event.confidence = marker.confidence * self.config.age_event_weight;
            event.marker_text = Some(marker.text.clone());
            event.character = Some(character.clone());
            event.age = Some(*age);
            timeline.push(event);
        }
    }
}

/// Date and resolution an absolute-style marker contributes, if any
fn absolute_date(marker: &TemporalMarker) -> Option<(StoryDate, DateResolution)> {
    match &marker.kind {
        MarkerKind::AbsoluteDate { year, month, day, .. } => {
            if year.is_none() && month.is_none() && day.is_none() {
                return None;
            }
            let resolution = match (year, month, day) {
                (None, _, _) => DateResolution::Partial,
                (Some(_), Some(_), Some(_)) => DateResolution::Day,
                (Some(_), Some(_), None) => DateResolution::Month,
                (Some(_), None, _) => DateResolution::Year,
            };
            // A day without a month says nothing on a calendar
            let day = if month.is_some() { *day } else { None };
            Some((StoryDate::new(*year, *month, day), resolution))
        }
        MarkerKind::SeasonOrEpoch { season, year, .. } => match (season, year) {
            (season, Some(year)) => Some((
                StoryDate::new(Some(*year), season.map(|s| s.start_month()), None),
                DateResolution::Season,
            )),
            (Some(season), None) => Some((
                StoryDate::new(None, Some(season.start_month()), None),
                DateResolution::Partial,
            )),
            (None, None) => None,
        },
        _ => None,
    }
}

/// Earliest weekday mentioned by an absolute marker in the chapter
fn first_weekday(markers: &[TemporalMarker], chapter: u32) -> Option<Weekday> {
    markers
        .iter()
        .filter(|m| m.span.chapter == chapter)
        .filter_map(|m| match m.kind {
            MarkerKind::AbsoluteDate { weekday: Some(weekday), .. } => Some((m.span.start, weekday)),
            _ => None,
        })
        .min_by_key(|(start, _)| *start)
        .map(|(_, weekday)| weekday)
}

// ==================== TESTS ====================
