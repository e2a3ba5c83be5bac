//! Temporal inconsistency detection
//!
//! Candidate sources read the timeline and the raw markers and propose
//! possible inconsistencies. Assessing methods then look at every candidate
//! and vote `inconsistent` or `consistent`; the consensus aggregator decides.
//!
//! # Usage
//! ```rust,ignore
//! let checker = TemporalChecker::new(&EngineConfig::default())?;
//! let report = checker.check(&timeline, &markers, Some(text))?;
//! for finding in &report.findings {
//!     println!("{:?} in chapter {}: {}", finding.candidate.kind, finding.candidate.chapter, finding.candidate.description);
//! }
//! ```

pub mod checker;
pub mod contextual;
pub mod heuristic;
pub mod semantic;
pub mod sources;

use serde::{Deserialize, Serialize};

use crate::config::CheckConfig;
use crate::consensus::{TemporalMethod, Vote};
use crate::timeline::{EventId, TemporalLexicon, TemporalMarker, Timeline};

pub use checker::{CheckReport, TemporalChecker, TemporalFinding};
pub use contextual::ContextualMethod;
pub use heuristic::HeuristicMethod;
pub use semantic::{SemanticMethod, SemanticValidator};
pub use sources::default_sources;

/// Verdict value for a confirmed problem
pub const INCONSISTENT: &str = "inconsistent";
/// Verdict value for an intentional or harmless oddity
pub const CONSISTENT: &str = "consistent";

// ==================== CANDIDATES ====================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// Undeclared backward step between consecutive narrated dates
    ImpossibleSequence,
    /// Undeclared forward leap of several years
    SuspiciousJump,
    /// Nearby relative markers pointing in opposite directions, or the same
    /// dated occurrence given different years in different chapters
    MarkerConflict,
    /// A character gets younger in a later chapter
    AgeContradiction,
    /// Stated ages disagree with the elapsed story time
    AgeDateMismatch,
    /// A character falls back to an earlier life phase
    LifePhaseRegression,
    /// A historical period mentioned outside the story's years
    Anachronism,
}

impl InconsistencyKind {
    pub fn name(self) -> &'static str {
        match self {
            InconsistencyKind::ImpossibleSequence => "impossible_sequence",
            InconsistencyKind::SuspiciousJump => "suspicious_jump",
            InconsistencyKind::MarkerConflict => "marker_conflict",
            InconsistencyKind::AgeContradiction => "age_contradiction",
            InconsistencyKind::AgeDateMismatch => "age_date_mismatch",
            InconsistencyKind::LifePhaseRegression => "life_phase_regression",
            InconsistencyKind::Anachronism => "anachronism",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A possible inconsistency, before any method has judged it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InconsistencyCandidate {
    pub kind: InconsistencyKind,
    pub severity: Severity,
    pub chapter: u32,
    pub position: usize,
    pub events: Vec<EventId>,
    /// Indices into the marker slice the candidate was found in
    pub markers: Vec<usize>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
    pub suggestion: String,
    /// Confidence of the detecting source
    pub confidence: f64,
}

impl InconsistencyCandidate {
    pub fn new(
        kind: InconsistencyKind,
        severity: Severity,
        chapter: u32,
        position: usize,
        description: String,
        confidence: f64,
    ) -> Self {
        Self {
            kind,
            severity,
            chapter,
            position,
            events: Vec::new(),
            markers: Vec::new(),
            description,
            expected: None,
            found: None,
            suggestion: String::new(),
            confidence,
        }
    }

    pub fn with_events(mut self, events: Vec<EventId>) -> Self {
        self.events = events;
        self
    }

    pub fn with_markers(mut self, markers: Vec<usize>) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_expectation(mut self, expected: String, found: String) -> Self {
        self.expected = Some(expected);
        self.found = Some(found);
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = suggestion.to_string();
        self
    }

    /// Aggregator subject: one per kind and location
    pub fn subject(&self) -> String {
        format!("{}@{}:{}", self.kind.name(), self.chapter, self.position)
    }
}

// ==================== DETECTION CONTEXT ====================

/// Everything a source or method may read. Borrowed for one check.
pub struct DetectionContext<'a> {
    pub timeline: &'a Timeline,
    pub markers: &'a [TemporalMarker],
    pub text: Option<&'a str>,
    pub config: &'a CheckConfig,
    pub lexicon: &'a TemporalLexicon,
}

impl<'a> DetectionContext<'a> {
    /// Markers whose start lies within `radius` characters of `position`
    pub fn markers_near(&self, position: usize, radius: usize) -> impl Iterator<Item = &'a TemporalMarker> + 'a {
        let markers = self.markers;
        markers
            .iter()
            .filter(move |m| m.span.start.abs_diff(position) < radius)
    }
}

// ==================== PLUGGABLE SEAMS ====================

/// Proposes candidates of one category
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<InconsistencyCandidate>;
}

/// Scores a candidate: 1.0 is certainly inconsistent, 0.0 certainly fine.
/// `None` abstains.
pub trait AssessingMethod: Send + Sync {
    fn method(&self) -> TemporalMethod;

    fn assess(&self, candidate: &InconsistencyCandidate, ctx: &DetectionContext<'_>) -> Option<f64>;
}

/// Turn a score into a vote. Exactly 0.5 carries no information.
pub fn verdict_vote(subject: &str, score: f64) -> Option<Vote> {
    let score = score.clamp(0.0, 1.0);
    if score > 0.5 {
        Some(Vote::new(subject, INCONSISTENT, score))
    } else if score < 0.5 {
        Some(Vote::new(subject, CONSISTENT, 1.0 - score))
    } else {
        None
    }
}

#[cfg(test)]
mod tests;
