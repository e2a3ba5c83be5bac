//! ConsensusAggregator - weighted multi-method voting
//!
//! Reduces the votes of N independent detection methods into one ranked
//! list of findings. Generic over the method type so the same reducer serves
//! attribute extraction and temporal inconsistency detection.
//!
//! # Algorithm
//! 1. Group votes by normalized subject
//! 2. Bucket each group by normalized value
//! 3. Bucket score = Σ(raw confidence × method weight); highest score wins
//! 4. Level: Single / Unanimous / Majority / Contested
//! 5. Confidence = winning bucket's mean weighted confidence × level modifier
//! 6. Drop below `min_confidence`, sort by confidence
//!
//! The aggregator holds only its immutable weight table and config, so one
//! instance can be shared across threads.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::method::DetectionMethod;
use crate::config::ConsensusConfig;
use crate::error::{check_unit_interval, EngineError, EngineResult};

// ==================== INPUT ====================

/// One method's claim about one subject
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vote {
    pub subject: String,
    pub value: String,
    pub confidence: f64,
}

impl Vote {
    pub fn new(subject: &str, value: &str, confidence: f64) -> Self {
        Self {
            subject: subject.to_string(),
            value: value.to_string(),
            confidence,
        }
    }
}

/// Everything one method produced for one document
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MethodResult<M> {
    pub method: M,
    pub votes: Vec<Vote>,
}

impl<M> MethodResult<M> {
    pub fn new(method: M, votes: Vec<Vote>) -> Self {
        Self { method, votes }
    }
}

/// Fixed per-method precision weights
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeightTable<M: Ord> {
    weights: BTreeMap<M, f64>,
}

impl<M: DetectionMethod> WeightTable<M> {
    /// Weights used exactly as given
    pub fn new<I: IntoIterator<Item = (M, f64)>>(weights: I) -> Self {
        Self {
            weights: weights.into_iter().collect(),
        }
    }

    /// Relative shares rescaled so the largest share becomes 1.0
    pub fn from_shares<I: IntoIterator<Item = (M, f64)>>(shares: I) -> Self {
        let shares: Vec<(M, f64)> = shares.into_iter().collect();
        let max = shares.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
        if max <= 0.0 {
            return Self::new(shares);
        }
        Self::new(shares.into_iter().map(|(m, s)| (m, s / max)))
    }

    pub fn weight(&self, method: M) -> Option<f64> {
        self.weights.get(&method).copied()
    }

    pub fn methods(&self) -> impl Iterator<Item = M> + '_ {
        self.weights.keys().copied()
    }
}

// ==================== OUTPUT ====================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusLevel {
    Unanimous,
    Majority,
    Contested,
    Single,
}

/// A method's contribution to a candidate value
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MethodVote<M> {
    pub method: M,
    pub raw_confidence: f64,
    pub weight: f64,
    pub weighted_confidence: f64,
}

/// One competing value for a subject
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Candidate<M> {
    pub value: String,
    /// Σ(raw confidence × weight)
    pub score: f64,
    pub votes: Vec<MethodVote<M>>,
}

/// Resolved subject. Created per aggregation call and never mutated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConsensusFinding<M> {
    pub subject: String,
    pub value: String,
    pub level: ConsensusLevel,
    pub confidence: f64,
    /// Winner first, then the losing values by score
    pub candidates: Vec<Candidate<M>>,
}

impl<M> ConsensusFinding<M> {
    pub fn winner(&self) -> Option<&Candidate<M>> {
        self.candidates.first()
    }

    pub fn is_contested(&self) -> bool {
        self.level == ConsensusLevel::Contested
    }
}

/// Subject on which the methods proposed more than one value
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Conflict<M: Ord> {
    pub subject: String,
    pub values: BTreeMap<String, Vec<M>>,
}

// ==================== AGGREGATOR ====================

pub struct ConsensusAggregator<M: DetectionMethod> {
    weights: WeightTable<M>,
    config: ConsensusConfig,
}

/// Votes of one subject: value → method → best raw confidence
type SubjectVotes<M> = BTreeMap<String, BTreeMap<M, f64>>;

impl<M: DetectionMethod> ConsensusAggregator<M> {
    pub fn new(weights: WeightTable<M>, config: ConsensusConfig) -> Self {
        Self { weights, config }
    }

    pub fn weights(&self) -> &WeightTable<M> {
        &self.weights
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Merge per-method results into ranked findings.
    ///
    /// Fails on an empty result list, a confidence outside [0, 1], or a
    /// method the weight table does not know.
    pub fn aggregate(&self, results: &[MethodResult<M>]) -> EngineResult<Vec<ConsensusFinding<M>>> {
        let grouped = self.group(results)?;

        let mut findings: Vec<ConsensusFinding<M>> = grouped
            .into_iter()
            .filter_map(|(subject, votes)| self.resolve(subject, votes))
            .filter(|f| f.confidence >= self.config.min_confidence)
            .collect();

        findings.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.subject.cmp(&b.subject))
        });

        debug!(
            methods = results.len(),
            findings = findings.len(),
            "consensus aggregated"
        );
        Ok(findings)
    }

    /// Feed previously merged findings back in as a single method's votes.
    pub fn reaggregate(&self, findings: &[ConsensusFinding<M>], method: M) -> EngineResult<Vec<ConsensusFinding<M>>> {
        let votes = findings
            .iter()
            .map(|f| Vote::new(&f.subject, &f.value, f.confidence.clamp(0.0, 1.0)))
            .collect();
        self.aggregate(&[MethodResult::new(method, votes)])
    }

    /// Incremental analysis: new findings replace previous ones with the
    /// same subject, untouched previous subjects are kept.
    pub fn merge_with_previous(
        &self,
        new_findings: Vec<ConsensusFinding<M>>,
        previous: Vec<ConsensusFinding<M>>,
    ) -> Vec<ConsensusFinding<M>> {
        let mut by_subject: BTreeMap<String, ConsensusFinding<M>> = previous
            .into_iter()
            .map(|f| (normalize(&f.subject), f))
            .collect();
        for finding in new_findings {
            by_subject.insert(normalize(&finding.subject), finding);
        }

        let mut merged: Vec<ConsensusFinding<M>> = by_subject.into_values().collect();
        merged.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.subject.cmp(&b.subject))
        });
        merged
    }

    /// Subjects where methods disagree on the value, before any weighting
    pub fn conflicts(&self, results: &[MethodResult<M>]) -> EngineResult<Vec<Conflict<M>>> {
        let grouped = self.group(results)?;
        Ok(grouped
            .into_iter()
            .filter(|(_, votes)| votes.len() > 1)
            .map(|(subject, votes)| Conflict {
                subject,
                values: votes
                    .into_iter()
                    .map(|(value, methods)| (value, methods.into_keys().collect()))
                    .collect(),
            })
            .collect())
    }

    // ==================== INTERNALS ====================

    fn group(&self, results: &[MethodResult<M>]) -> EngineResult<BTreeMap<String, SubjectVotes<M>>> {
        if results.is_empty() {
            return Err(EngineError::EmptyMethodResults);
        }

        let mut grouped: BTreeMap<String, SubjectVotes<M>> = BTreeMap::new();
        for result in results {
            if self.weights.weight(result.method).is_none() {
                return Err(EngineError::UnknownMethod {
                    method: result.method.name().to_string(),
                });
            }
            for vote in &result.votes {
                check_unit_interval(&format!("{} vote on '{}'", result.method.name(), vote.subject), vote.confidence)?;

                // A method repeating itself counts once, at its best confidence
                let best = grouped
                    .entry(normalize(&vote.subject))
                    .or_default()
                    .entry(normalize(&vote.value))
                    .or_default()
                    .entry(result.method)
                    .or_insert(0.0);
                *best = best.max(vote.confidence);
            }
        }
        Ok(grouped)
    }

    fn resolve(&self, subject: String, votes: SubjectVotes<M>) -> Option<ConsensusFinding<M>> {
        let contributing: BTreeSet<M> = votes.values().flat_map(|m| m.keys().copied()).collect();

        let mut candidates: Vec<Candidate<M>> = votes
            .into_iter()
            .map(|(value, methods)| {
                let votes: Vec<MethodVote<M>> = methods
                    .into_iter()
                    .map(|(method, raw)| {
                        let weight = self.weights.weight(method).unwrap_or(0.0);
                        MethodVote {
                            method,
                            raw_confidence: raw,
                            weight,
                            weighted_confidence: raw * weight,
                        }
                    })
                    .collect();
                let score = votes.iter().map(|v| v.weighted_confidence).sum();
                Candidate { value, score, votes }
            })
            .collect();

        // Highest score, then broader support, then value order
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.votes.len().cmp(&a.votes.len()))
                .then_with(|| a.value.cmp(&b.value))
        });

        let winner = candidates.first()?;
        if winner.votes.is_empty() {
            return None;
        }

        let level = if contributing.len() == 1 {
            ConsensusLevel::Single
        } else if candidates.len() == 1 {
            ConsensusLevel::Unanimous
        } else if winner.votes.len() * 2 > contributing.len() {
            ConsensusLevel::Majority
        } else {
            ConsensusLevel::Contested
        };

        let modifier = match level {
            ConsensusLevel::Unanimous => self.config.unanimous_boost,
            ConsensusLevel::Contested => self.config.contested_penalty,
            ConsensusLevel::Majority | ConsensusLevel::Single => 1.0,
        };
        let mean = winner.score / winner.votes.len() as f64;
        let confidence = (mean * modifier).min(1.0);

        Some(ConsensusFinding {
            subject,
            value: winner.value.clone(),
            level,
            confidence,
            candidates,
        })
    }
}

/// Lowercase, trim, collapse inner whitespace
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// ==================== TESTS ====================
