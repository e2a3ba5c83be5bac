//! TemporalMarker - the input contract from the extraction stage
//!
//! A marker is one detected temporal expression. The engine never scans text
//! for markers itself: any extractor producing these records can feed it.
//!
//! # JSON shape
//! ```json
//! {
//!   "text": "three days later",
//!   "span": { "start": 1204, "end": 1220, "chapter": 2, "paragraph": 4 },
//!   "kind": { "type": "relative_time", "direction": "future", "unit": "day", "quantity": 3 },
//!   "confidence": 0.8
//! }
//! ```

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ==================== TYPE DEFINITIONS ====================

/// Where a marker sits in the document
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSpan {
    /// Byte offset into the whole document
    pub start: usize,
    pub end: usize,
    pub chapter: u32,
    #[serde(default)]
    pub paragraph: u32,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize, chapter: u32, paragraph: u32) -> Self {
        Self { start, end, chapter, paragraph }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Past,
    Future,
    #[default]
    Unspecified,
}

impl Direction {
    pub fn is_opposite(self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Past, Direction::Future) | (Direction::Future, Direction::Past)
        )
    }
}

/// Calendar unit at day granularity
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    /// Fixed day lengths: months are 30 days, years 365.
    pub fn days(self) -> f64 {
        match self {
            TimeUnit::Hour => 1.0 / 24.0,
            TimeUnit::Day => 1.0,
            TimeUnit::Week => 7.0,
            TimeUnit::Month => 30.0,
            TimeUnit::Year => 365.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Month (1-12) the season is pinned to
    pub fn start_month(self) -> u32 {
        match self {
            Season::Spring => 3,
            Season::Summer => 6,
            Season::Autumn => 9,
            Season::Winter => 12,
        }
    }
}

/// Symbolic life phases, ordered from youngest to oldest
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifePhase {
    Infant,
    Child,
    Teen,
    YoungAdult,
    Adult,
    MiddleAged,
    Elderly,
}

impl LifePhase {
    pub fn from_years(years: f64) -> Self {
        match years {
            y if y < 3.0 => LifePhase::Infant,
            y if y < 13.0 => LifePhase::Child,
            y if y < 20.0 => LifePhase::Teen,
            y if y < 30.0 => LifePhase::YoungAdult,
            y if y < 45.0 => LifePhase::Adult,
            y if y < 65.0 => LifePhase::MiddleAged,
            _ => LifePhase::Elderly,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AgeValue {
    Years(f64),
    Phase(LifePhase),
}

impl AgeValue {
    pub fn phase(&self) -> LifePhase {
        match *self {
            AgeValue::Years(years) => LifePhase::from_years(years),
            AgeValue::Phase(phase) => phase,
        }
    }

    pub fn years(&self) -> Option<f64> {
        match *self {
            AgeValue::Years(years) => Some(years),
            AgeValue::Phase(_) => None,
        }
    }
}

/// What the expression says about time
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkerKind {
    /// Calendar date; every component is optional on its own
    AbsoluteDate {
        #[serde(default)]
        year: Option<i32>,
        #[serde(default)]
        month: Option<u32>,
        #[serde(default)]
        day: Option<u32>,
        #[serde(default)]
        weekday: Option<Weekday>,
    },
    /// "three days later", "the night before", "a while later"
    RelativeTime {
        #[serde(default)]
        direction: Direction,
        #[serde(default)]
        unit: Option<TimeUnit>,
        #[serde(default)]
        quantity: Option<f64>,
        #[serde(default)]
        weekday: Option<Weekday>,
    },
    /// "the summer of 1850", "during the great war"
    SeasonOrEpoch {
        #[serde(default)]
        season: Option<Season>,
        #[serde(default)]
        year: Option<i32>,
        #[serde(default)]
        epoch: Option<String>,
    },
    CharacterAge {
        character: String,
        age: AgeValue,
    },
    /// "for three weeks"
    Duration {
        unit: TimeUnit,
        quantity: f64,
    },
    /// "every winter", "twice a year"
    Frequency {
        unit: TimeUnit,
        #[serde(default)]
        count: Option<f64>,
    },
}

/// One detected temporal expression. Immutable once produced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TemporalMarker {
    pub text: String,
    pub span: SourceSpan,
    pub kind: MarkerKind,
    pub confidence: f64,
}

// ==================== IMPLEMENTATION ====================

impl TemporalMarker {
    pub fn new(text: &str, span: SourceSpan, kind: MarkerKind, confidence: f64) -> Self {
        Self {
            text: text.to_string(),
            span,
            kind,
            confidence,
        }
    }

    /// Check the data contract: confidence in (0, 1] and the components the
    /// kind needs are present and sane.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.confidence > 0.0 && self.confidence <= 1.0) {
            return Err(self.invalid(format!("confidence {} outside (0, 1]", self.confidence)));
        }
        if self.span.end < self.span.start {
            return Err(self.invalid("span ends before it starts".into()));
        }

        match &self.kind {
            MarkerKind::AbsoluteDate { year, month, day, weekday } => {
                if year.is_none() && month.is_none() && day.is_none() && weekday.is_none() {
                    return Err(self.invalid("absolute date without components".into()));
                }
                if let Some(m) = month {
                    if !(1..=12).contains(m) {
                        return Err(self.invalid(format!("month {} out of range", m)));
                    }
                }
                if let Some(d) = day {
                    if !(1..=31).contains(d) {
                        return Err(self.invalid(format!("day {} out of range", d)));
                    }
                }
            }
            MarkerKind::RelativeTime { unit, quantity, .. } => {
                if let Some(q) = quantity {
                    if unit.is_none() {
                        return Err(self.invalid("relative quantity without unit".into()));
                    }
                    if !q.is_finite() || *q < 0.0 {
                        return Err(self.invalid(format!("relative quantity {} invalid", q)));
                    }
                } else if unit.is_none() && self.text.trim().is_empty() {
                    return Err(self.invalid("relative marker without offset or text".into()));
                }
            }
            MarkerKind::SeasonOrEpoch { season, year, epoch } => {
                if season.is_none() && year.is_none() && epoch.as_deref().map_or(true, str::is_empty) {
                    return Err(self.invalid("season/epoch without components".into()));
                }
            }
            MarkerKind::CharacterAge { character, age } => {
                if character.trim().is_empty() {
                    return Err(self.invalid("age marker without character".into()));
                }
                if let AgeValue::Years(years) = age {
                    if !years.is_finite() || *years < 0.0 {
                        return Err(self.invalid(format!("age {} invalid", years)));
                    }
                }
            }
            MarkerKind::Duration { quantity, .. } => {
                if !quantity.is_finite() || *quantity < 0.0 {
                    return Err(self.invalid(format!("duration {} invalid", quantity)));
                }
            }
            MarkerKind::Frequency { count, .. } => {
                if let Some(c) = count {
                    if !c.is_finite() || *c <= 0.0 {
                        return Err(self.invalid(format!("frequency count {} invalid", c)));
                    }
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> EngineError {
        EngineError::InvalidMarker {
            offset: self.span.start,
            reason,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self.kind, MarkerKind::RelativeTime { .. })
    }

    pub fn is_age(&self) -> bool {
        matches!(self.kind, MarkerKind::CharacterAge { .. })
    }

    /// Direction of a relative marker, `Unspecified` for every other kind
    pub fn direction(&self) -> Direction {
        match self.kind {
            MarkerKind::RelativeTime { direction, .. } => direction,
            _ => Direction::Unspecified,
        }
    }

    /// Year carried by the marker, if any
    pub fn year(&self) -> Option<i32> {
        match self.kind {
            MarkerKind::AbsoluteDate { year, .. } => year,
            MarkerKind::SeasonOrEpoch { year, .. } => year,
            _ => None,
        }
    }
}

// ==================== TESTS ====================
