//! ComplexityRouter - decides which detection methods are worth running
//!
//! Scores a text segment in [0, 1] from cheap surface signals and maps the
//! score to a set of recommended methods, so the expensive semantic tier
//! only runs where the cheap ones are likely to miss.
//!
//! # Penalties
//! - Long sentences: +0.05 / +0.15 / +0.25 for averages above 20 / 30 / 40 words
//! - Comparisons and metaphors: +0.1 each, at most 0.3
//! - Subordinate structures: +0.08 each, at most 0.25
//! - Invented-world vocabulary (fantasy, sci-fi): +0.15
//! - Attribute enumerations: +0.05 each, at most 0.15
//! - More than two pronoun-attribute references: +0.1
//!
//! # Usage
//! ```rust,ignore
//! let router = ComplexityRouter::new(RouterConfig::default())?;
//! let score = router.analyze("Her eyes shone like a winter sea.");
//! if score.needs_llm() { /* queue the semantic tier */ }
//! ```

use std::collections::BTreeMap;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::RouterConfig;
use crate::consensus::ExtractionMethod;
use crate::error::EngineResult;

// ==================== TYPE DEFINITIONS ====================

/// Vocabulary family detected in the segment
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyCluster {
    #[default]
    Realistic,
    Fantasy,
    SciFi,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ComplexityScore {
    pub score: f64,
    pub reasons: Vec<String>,
    /// Cheapest first
    pub recommended: Vec<ExtractionMethod>,
    pub cluster: VocabularyCluster,
}

impl ComplexityScore {
    pub fn is_simple(&self) -> bool {
        self.score < 0.3
    }

    pub fn is_complex(&self) -> bool {
        self.score >= 0.6
    }

    pub fn needs_llm(&self) -> bool {
        self.recommended.contains(&ExtractionMethod::Llm)
    }
}

// ==================== DICTIONARIES ====================

const METAPHOR_PATTERNS: &[&str] = &[
    r"(?i)\blike\s+(?:a|an|the)\b",
    r"(?i)\bseemed\s+(?:like|to\s+be)\b",
    r"(?i)\bas\s+\w+\s+as\b",
    r"(?i)\bas\s+(?:if|though)\b",
    r"(?i)\bresembl(?:ed|es|ing)\b",
    r"(?i)\bsimilar\s+to\b",
];

const COMPLEX_PATTERNS: &[&str] = &[
    r"(?i),\s*(?:which|who|whom|whose|where)\b",
    r";\s*\w",
    r"(?i)\b(?:although|though|while|because|whereas)\b[^.!?]*,",
    r"(?i),\s*and\s+(?:that|with)\b",
    r"—[^—]+—",
    r"\([^)]{10,}\)",
];

const ENUMERATION_PATTERNS: &[&str] = &[
    r"(?i)(?:\w+,\s*){2,}\w+\s+and\s+\w+",
    r"(?i)\bwith\s+\w+\s+\w+\s+and\s+\w+\s+\w+",
];

const PRONOUN_PATTERNS: &[&str] = &[
    r"(?i)\b(?:he|she|they)\s+(?:had|was|were|wore)\b",
    r"(?i)\b(?:his|her|their)\s+(?:eyes|hair|face|skin)\b",
];

const FANTASY_TERMS: &[&str] = &[
    "elf", "elves", "dwarf", "dwarves", "dragon", "dragons", "magic", "spell",
    "spells", "rune", "runes", "orc", "orcs", "troll", "trolls", "vampire",
    "vampires", "fairy", "fairies", "wizard", "wizards", "witch", "sorcerer",
    "enchantment", "kingdom of", "enchanted sword",
];

const SCIFI_TERMS: &[&str] = &[
    "alien", "aliens", "android", "androids", "cyborg", "cyborgs", "spaceship",
    "starship", "galactic", "galaxy", "planet", "laser", "teleport",
    "teleported", "artificial intelligence", "robot", "robots", "mutant",
    "mutants", "hyperspace",
];

// ==================== MAIN IMPLEMENTATION ====================

pub struct ComplexityRouter {
    config: RouterConfig,
    metaphor_re: Vec<Regex>,
    complex_re: Vec<Regex>,
    enumeration_re: Vec<Regex>,
    pronoun_re: Vec<Regex>,
    fantasy: AhoCorasick,
    scifi: AhoCorasick,
}

impl ComplexityRouter {
    pub fn new(config: RouterConfig) -> EngineResult<Self> {
        Ok(Self {
            config,
            metaphor_re: compile(METAPHOR_PATTERNS)?,
            complex_re: compile(COMPLEX_PATTERNS)?,
            enumeration_re: compile(ENUMERATION_PATTERNS)?,
            pronoun_re: compile(PRONOUN_PATTERNS)?,
            fantasy: build_terms(FANTASY_TERMS)?,
            scifi: build_terms(SCIFI_TERMS)?,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Score one segment. Pure function of text and thresholds.
    pub fn analyze(&self, text: &str) -> ComplexityScore {
        let mut score = 0.0;
        let mut reasons = Vec::new();

        // 1. Sentence length
        let sentence_words: Vec<usize> = text
            .unicode_sentences()
            .map(|s| s.unicode_words().count())
            .filter(|&n| n > 0)
            .collect();
        if !sentence_words.is_empty() {
            let avg = sentence_words.iter().sum::<usize>() as f64 / sentence_words.len() as f64;
            let penalty = if avg > 40.0 {
                0.25
            } else if avg > 30.0 {
                0.15
            } else if avg > 20.0 {
                0.05
            } else {
                0.0
            };
            if penalty > 0.0 {
                score += penalty;
                reasons.push(format!("long sentences (avg {:.0} words)", avg));
            }
        }

        // 2. Comparisons and metaphors
        let metaphors = count_all(&self.metaphor_re, text);
        if metaphors > 0 {
            score += (0.1 * metaphors as f64).min(0.3);
            reasons.push(format!("comparisons/metaphors: {}", metaphors));
        }

        // 3. Subordinate structures
        let structures = count_all(&self.complex_re, text);
        if structures > 0 {
            score += (0.08 * structures as f64).min(0.25);
            reasons.push(format!("complex structures: {}", structures));
        }

        // 4. Vocabulary cluster
        let cluster = self.detect_cluster(text);
        if cluster != VocabularyCluster::Realistic {
            score += 0.15;
            reasons.push(format!("vocabulary cluster: {:?}", cluster));
        }

        // 5. Attribute enumerations
        let enumerations = count_all(&self.enumeration_re, text);
        if enumerations > 0 {
            score += (0.05 * enumerations as f64).min(0.15);
            reasons.push(format!("attribute enumerations: {}", enumerations));
        }

        // 6. Pronoun references
        let pronouns = count_all(&self.pronoun_re, text);
        if pronouns > 2 {
            score += 0.1;
            reasons.push(format!("pronoun references: {}", pronouns));
        }

        let score = score.clamp(0.0, 1.0);
        let recommended = self.recommend(score, cluster);

        debug!(score, cluster = ?cluster, reasons = reasons.len(), "complexity analysed");

        ComplexityScore {
            score,
            reasons,
            recommended,
            cluster,
        }
    }

    pub fn should_use_llm(&self, text: &str) -> bool {
        self.analyze(text).needs_llm()
    }

    /// Segment indices grouped by recommended method
    pub fn batch(&self, texts: &[&str]) -> BTreeMap<ExtractionMethod, Vec<usize>> {
        let mut grouped: BTreeMap<ExtractionMethod, Vec<usize>> =
            ExtractionMethod::ALL.iter().map(|m| (*m, Vec::new())).collect();

        for (idx, text) in texts.iter().enumerate() {
            for method in self.analyze(text).recommended {
                grouped.entry(method).or_default().push(idx);
            }
        }
        grouped
    }

    fn recommend(&self, score: f64, cluster: VocabularyCluster) -> Vec<ExtractionMethod> {
        let mut methods = Vec::with_capacity(4);
        if score < self.config.pattern_ceiling {
            methods.push(ExtractionMethod::Pattern);
        }
        methods.push(ExtractionMethod::Structural);
        if score >= self.config.embedding_threshold || cluster != VocabularyCluster::Realistic {
            methods.push(ExtractionMethod::Embedding);
        }
        if score >= self.config.llm_threshold {
            methods.push(ExtractionMethod::Llm);
        }
        methods
    }

    /// First cluster with at least two distinct indicator terms
    fn detect_cluster(&self, text: &str) -> VocabularyCluster {
        if distinct_terms(&self.fantasy, text) >= 2 {
            VocabularyCluster::Fantasy
        } else if distinct_terms(&self.scifi, text) >= 2 {
            VocabularyCluster::SciFi
        } else {
            VocabularyCluster::Realistic
        }
    }
}

fn compile(patterns: &[&str]) -> EngineResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(Into::into))
        .collect()
}

fn build_terms(terms: &[&str]) -> EngineResult<AhoCorasick> {
    Ok(AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(terms)?)
}

fn count_all(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().map(|re| re.find_iter(text).count()).sum()
}

fn distinct_terms(automaton: &AhoCorasick, text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut seen: Vec<usize> = automaton
        .find_iter(text)
        .filter(|m| {
            let before = m.start() == 0 || !bytes[m.start() - 1].is_ascii_alphanumeric();
            let after = m.end() >= bytes.len() || !bytes[m.end()].is_ascii_alphanumeric();
            before && after
        })
        .map(|m| m.pattern().as_usize())
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

// ==================== TESTS ====================
