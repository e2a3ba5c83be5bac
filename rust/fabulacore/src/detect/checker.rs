//! TemporalChecker - fan-out detection, fan-in consensus
//!
//! # Pipeline
//! 1. Every `CandidateSource` proposes candidates (in parallel on native)
//! 2. The direct method votes `inconsistent` at each source's confidence
//! 3. Every assessing method scores every candidate (in parallel on native)
//! 4. The temporal aggregator merges the votes per candidate
//! 5. Winners voted `inconsistent` are reported, worst severity first

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::contextual::ContextualMethod;
use super::heuristic::HeuristicMethod;
use super::semantic::{SemanticMethod, SemanticValidator};
use super::sources::default_sources;
use super::{
    verdict_vote, AssessingMethod, CandidateSource, DetectionContext, InconsistencyCandidate, INCONSISTENT,
};
use crate::config::{CheckConfig, EngineConfig};
use crate::consensus::{
    ConsensusAggregator, ConsensusLevel, DetectionMethod, MethodResult, TemporalMethod, Vote,
};
use crate::error::EngineResult;
use crate::parallel::map_ordered;
use crate::router::ComplexityRouter;
use crate::timeline::{TemporalLexicon, TemporalMarker, Timeline};

// ==================== OUTPUT ====================

/// A candidate the methods agreed is a real inconsistency
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TemporalFinding {
    pub candidate: InconsistencyCandidate,
    /// Consensus confidence (the candidate keeps its source confidence)
    pub confidence: f64,
    pub level: ConsensusLevel,
    /// Methods that voted `inconsistent`
    pub methods_agreed: Vec<TemporalMethod>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CheckReport {
    pub findings: Vec<TemporalFinding>,
    pub candidates: usize,
    /// Votes cast per method name
    pub method_votes: BTreeMap<String, usize>,
    pub semantic_used: bool,
    pub elapsed_us: u64,
}

// ==================== CHECKER ====================

pub struct TemporalChecker {
    config: CheckConfig,
    semantic_enabled: bool,
    sources: Vec<Box<dyn CandidateSource>>,
    methods: Vec<Box<dyn AssessingMethod>>,
    semantic: Option<Box<dyn AssessingMethod>>,
    aggregator: ConsensusAggregator<TemporalMethod>,
    router: ComplexityRouter,
    lexicon: TemporalLexicon,
}

impl TemporalChecker {
    /// Built-in sources, contextual and heuristic methods. The semantic tier
    /// stays off until a validator is attached.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            config: config.checks.clone(),
            semantic_enabled: config.semantic_enabled,
            sources: default_sources(),
            methods: vec![Box::new(ContextualMethod), Box::new(HeuristicMethod)],
            semantic: None,
            aggregator: ConsensusAggregator::new(config.temporal_weights.table(), config.consensus.clone()),
            router: ComplexityRouter::new(config.router.clone())?,
            lexicon: TemporalLexicon::new()?,
        })
    }

    pub fn with_semantic(mut self, validator: Arc<dyn SemanticValidator>) -> Self {
        self.semantic = Some(Box::new(SemanticMethod::new(validator)));
        self
    }

    pub fn with_source(mut self, source: Box<dyn CandidateSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn check(
        &self,
        timeline: &Timeline,
        markers: &[TemporalMarker],
        text: Option<&str>,
    ) -> EngineResult<CheckReport> {
        let start = instant::Instant::now();
        let ctx = DetectionContext {
            timeline,
            markers,
            text,
            config: &self.config,
            lexicon: &self.lexicon,
        };

        // Phase 1: candidates
        let candidates = dedupe(
            map_ordered(&self.sources, |source| source.detect(&ctx))
                .into_iter()
                .flatten()
                .collect(),
        );
        if candidates.is_empty() {
            debug!("no temporal candidates");
            return Ok(CheckReport {
                elapsed_us: start.elapsed().as_micros() as u64,
                ..CheckReport::default()
            });
        }

        // Phase 2: votes
        let semantic_used = self.semantic_active(text);
        let mut methods: Vec<&dyn AssessingMethod> = self.methods.iter().map(|m| m.as_ref()).collect();
        if semantic_used {
            if let Some(semantic) = &self.semantic {
                methods.push(semantic.as_ref());
            }
        }

        let direct = MethodResult::new(
            TemporalMethod::Direct,
            candidates
                .iter()
                .map(|c| Vote::new(&c.subject(), INCONSISTENT, c.confidence.clamp(0.0, 1.0)))
                .collect(),
        );
        let mut results = vec![direct];
        results.extend(map_ordered(&methods, |method| {
            let votes: Vec<Vote> = candidates
                .iter()
                .filter_map(|c| method.assess(c, &ctx).and_then(|score| verdict_vote(&c.subject(), score)))
                .collect();
            MethodResult::new(method.method(), votes)
        }));

        let mut method_votes = BTreeMap::new();
        for result in &results {
            debug!(method = result.method.name(), votes = result.votes.len(), "temporal method voted");
            method_votes.insert(result.method.name().to_string(), result.votes.len());
        }

        // Phase 3: consensus
        let by_subject: HashMap<String, &InconsistencyCandidate> =
            candidates.iter().map(|c| (c.subject(), c)).collect();

        let mut findings: Vec<TemporalFinding> = self
            .aggregator
            .aggregate(&results)?
            .into_iter()
            .filter(|f| f.value == INCONSISTENT)
            .filter_map(|f| {
                let candidate = by_subject.get(&f.subject)?;
                let methods_agreed = f
                    .winner()
                    .map(|w| w.votes.iter().map(|v| v.method).collect())
                    .unwrap_or_default();
                Some(TemporalFinding {
                    candidate: (*candidate).clone(),
                    confidence: f.confidence,
                    level: f.level,
                    methods_agreed,
                })
            })
            .collect();

        findings.sort_by(|a, b| {
            b.candidate
                .severity
                .cmp(&a.candidate.severity)
                .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
                .then_with(|| (a.candidate.chapter, a.candidate.position).cmp(&(b.candidate.chapter, b.candidate.position)))
        });

        info!(
            candidates = candidates.len(),
            findings = findings.len(),
            semantic = semantic_used,
            "temporal check complete"
        );

        Ok(CheckReport {
            findings,
            candidates: candidates.len(),
            method_votes,
            semantic_used,
            elapsed_us: start.elapsed().as_micros() as u64,
        })
    }

    /// Semantic tier runs only when switched on, attached, and the text is
    /// complex enough for the router to recommend the expensive tier
    fn semantic_active(&self, text: Option<&str>) -> bool {
        self.semantic_enabled
            && self.semantic.is_some()
            && text.map_or(false, |t| self.router.analyze(t).needs_llm())
    }
}

/// One candidate per subject, the most confident source wins
fn dedupe(candidates: Vec<InconsistencyCandidate>) -> Vec<InconsistencyCandidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<InconsistencyCandidate> = Vec::new();
    for candidate in candidates {
        match index.get(&candidate.subject()) {
            Some(&i) => {
                if candidate.confidence > unique[i].confidence {
                    unique[i] = candidate;
                }
            }
            None => {
                index.insert(candidate.subject(), unique.len());
                unique.push(candidate);
            }
        }
    }
    unique
}
