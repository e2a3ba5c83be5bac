//! TemporalLexicon - narrative-time vocabulary via Aho-Corasick
//!
//! One automaton over lowercased text covers the vocabulary the engine
//! needs to read event descriptions and marker text:
//!
//! # Categories
//! - RETROSPECTIVE: "remembered", "years ago", "back then", ...
//! - PROSPECTIVE: "years later", "would one day", "little did", ...
//! - TRANSITION: "meanwhile", "flashback", "in the present", ...
//! - IDIOM: quantity-less relative phrases with a fixed day offset
//!   ("the next day" → +1, "that same night" → 0, ...)

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};

use super::marker::Direction;
use crate::error::EngineResult;

// ==================== TYPE DEFINITIONS ====================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexiconKind {
    Retrospective,
    Prospective,
    Transition,
    Idiom,
}

/// Day shift an idiom stands for
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdiomShift {
    /// Fixed number of days in the given direction
    Fixed { days: i64, direction: Direction },
    /// "a while later": the configured small progression
    Vague,
}

/// A single lexicon hit
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LexiconMatch {
    pub kind: LexiconKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LexiconStats {
    pub total_patterns: usize,
    pub retrospective: usize,
    pub prospective: usize,
    pub transitions: usize,
    pub idioms: usize,
}

#[derive(Clone)]
struct PatternMeta {
    kind: LexiconKind,
    shift: Option<IdiomShift>,
}

// ==================== DICTIONARIES ====================

const RETROSPECTIVE: &[&str] = &[
    "remembered", "remembering", "recalled", "recalling", "recollection",
    "memory of", "memories of", "reminisced", "thought back", "looked back",
    "years ago", "long ago", "years before", "years earlier", "back then",
    "in those days", "as a child", "as a boy", "as a girl", "when she was",
    "when he was", "when they were", "used to", "had once", "once upon a time",
    "in her youth", "in his youth", "flashback",
];

const PROSPECTIVE: &[&str] = &[
    "years later", "decades later", "would one day", "would later",
    "would eventually", "someday", "some day", "in the future", "in years to come",
    "little did", "would never again", "one day she would", "one day he would",
    "was yet to", "in time to come",
];

const TRANSITIONS: &[&str] = &[
    "meanwhile", "in the meantime", "flashback", "flash forward",
    "years earlier", "years later", "back in", "in the present", "present day",
    "now,", "then again", "at the same time", "elsewhere", "previously",
    "long before", "long after", "earlier that",
];

const IDIOMS: &[(&str, IdiomShift)] = &[
    ("the next day", IdiomShift::Fixed { days: 1, direction: Direction::Future }),
    ("the following day", IdiomShift::Fixed { days: 1, direction: Direction::Future }),
    ("next morning", IdiomShift::Fixed { days: 1, direction: Direction::Future }),
    ("the next morning", IdiomShift::Fixed { days: 1, direction: Direction::Future }),
    ("the following morning", IdiomShift::Fixed { days: 1, direction: Direction::Future }),
    ("the day before", IdiomShift::Fixed { days: 1, direction: Direction::Past }),
    ("the previous day", IdiomShift::Fixed { days: 1, direction: Direction::Past }),
    ("the night before", IdiomShift::Fixed { days: 1, direction: Direction::Past }),
    ("that same night", IdiomShift::Fixed { days: 0, direction: Direction::Future }),
    ("that night", IdiomShift::Fixed { days: 0, direction: Direction::Future }),
    ("that morning", IdiomShift::Fixed { days: 0, direction: Direction::Future }),
    ("later that day", IdiomShift::Fixed { days: 0, direction: Direction::Future }),
    ("shortly after", IdiomShift::Fixed { days: 0, direction: Direction::Future }),
    ("moments later", IdiomShift::Fixed { days: 0, direction: Direction::Future }),
    ("a while later", IdiomShift::Vague),
    ("some time later", IdiomShift::Vague),
    ("sometime later", IdiomShift::Vague),
    ("eventually", IdiomShift::Vague),
];

// ==================== MAIN IMPLEMENTATION ====================

/// Narrative-time vocabulary matcher
///
/// Matching is ASCII case-insensitive, leftmost-longest, and only accepts
/// hits that start and end on word boundaries.
pub struct TemporalLexicon {
    automaton: AhoCorasick,
    pattern_meta: Vec<PatternMeta>,
    stats: LexiconStats,
}

impl TemporalLexicon {
    /// Build the English default lexicon
    pub fn new() -> EngineResult<Self> {
        let mut patterns: Vec<String> = Vec::new();
        let mut meta: Vec<PatternMeta> = Vec::new();
        let mut stats = LexiconStats::default();

        // A phrase listed under several categories keeps every category:
        // the automaton sees it once per category.
        for pattern in RETROSPECTIVE {
            add_pattern(&mut patterns, &mut meta, pattern, LexiconKind::Retrospective, None);
        }
        stats.retrospective = RETROSPECTIVE.len();

        for pattern in PROSPECTIVE {
            add_pattern(&mut patterns, &mut meta, pattern, LexiconKind::Prospective, None);
        }
        stats.prospective = PROSPECTIVE.len();

        for pattern in TRANSITIONS {
            add_pattern(&mut patterns, &mut meta, pattern, LexiconKind::Transition, None);
        }
        stats.transitions = TRANSITIONS.len();

        for (pattern, shift) in IDIOMS {
            add_pattern(&mut patterns, &mut meta, pattern, LexiconKind::Idiom, Some(*shift));
        }
        stats.idioms = IDIOMS.len();
        stats.total_patterns = patterns.len();

        // Overlapping search is needed so duplicated phrases report every
        // category; leftmost-longest is applied per category in `scan`.
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&patterns)?;

        Ok(Self {
            automaton,
            pattern_meta: meta,
            stats,
        })
    }

    /// All word-bounded hits, longest first at each start, overlaps removed
    /// within a category.
    pub fn scan(&self, text: &str) -> Vec<LexiconMatch> {
        let bytes = text.as_bytes();
        let mut matches: Vec<LexiconMatch> = self
            .automaton
            .find_overlapping_iter(text)
            .filter(|m| is_word_bounded(bytes, m.start(), m.end()))
            .map(|m| LexiconMatch {
                kind: self.pattern_meta[m.pattern().as_usize()].kind,
                text: text[m.start()..m.end()].to_string(),
                start: m.start(),
                end: m.end(),
            })
            .collect();

        dedupe_overlapping(&mut matches);
        matches
    }

    pub fn count(&self, text: &str, kind: LexiconKind) -> usize {
        self.scan(text).iter().filter(|m| m.kind == kind).count()
    }

    pub fn is_retrospective(&self, text: &str) -> bool {
        self.count(text, LexiconKind::Retrospective) > 0
    }

    pub fn is_prospective(&self, text: &str) -> bool {
        self.count(text, LexiconKind::Prospective) > 0
    }

    pub fn transition_count(&self, text: &str) -> usize {
        self.count(text, LexiconKind::Transition)
    }

    /// Day shift for a quantity-less relative phrase. The longest idiom in
    /// the text wins; `None` for phrases the lexicon does not know.
    pub fn idiom_shift(&self, text: &str) -> Option<IdiomShift> {
        let bytes = text.as_bytes();
        self.automaton
            .find_overlapping_iter(text)
            .filter(|m| is_word_bounded(bytes, m.start(), m.end()))
            .filter_map(|m| {
                let meta = &self.pattern_meta[m.pattern().as_usize()];
                meta.shift.map(|shift| (m.end() - m.start(), m.start(), shift))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, _, shift)| shift)
    }

    pub fn stats(&self) -> &LexiconStats {
        &self.stats
    }
}

fn add_pattern(
    patterns: &mut Vec<String>,
    meta: &mut Vec<PatternMeta>,
    pattern: &str,
    kind: LexiconKind,
    shift: Option<IdiomShift>,
) {
    patterns.push(pattern.to_lowercase());
    meta.push(PatternMeta { kind, shift });
}

fn is_word_bounded(bytes: &[u8], start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
    let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
    before_ok && after_ok
}

/// Keep the longest match per start, then drop matches overlapping an
/// earlier one of the same kind.
fn dedupe_overlapping(matches: &mut Vec<LexiconMatch>) {
    matches.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then((b.end - b.start).cmp(&(a.end - a.start)))
    });

    let mut kept: Vec<LexiconMatch> = Vec::with_capacity(matches.len());
    for m in matches.drain(..) {
        let overlaps = kept
            .iter()
            .any(|k| k.kind == m.kind && m.start < k.end && k.start < m.end);
        if !overlaps {
            kept.push(m);
        }
    }
    *matches = kept;
}

// ==================== TESTS ====================
