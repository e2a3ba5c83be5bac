//! NarrativeEngine - per-document pipeline
//!
//! markers + chapters → TimelineBuilder → NarrativeOrderClassifier →
//! TemporalChecker → ranked findings. One engine instance is immutable
//! after construction and may analyze many documents, in parallel on native
//! targets.
//!
//! # Usage
//! ```rust,ignore
//! let engine = NarrativeEngine::new(EngineConfig::default())?;
//! let analysis = engine.analyze(&DocumentInput::new(markers, chapters).with_text(text))?;
//! println!("{} findings", analysis.temporal.findings.len());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::consensus::{AttributeBatch, AttributeConsensus, AttributeFinding};
use crate::detect::{CheckReport, SemanticValidator, TemporalChecker};
use crate::error::EngineResult;
use crate::parallel::map_ordered;
use crate::router::{ComplexityRouter, ComplexityScore};
use crate::timeline::{
    ChapterInfo, NarrativeOrderClassifier, OrderReport, TemporalMarker, Timeline, TimelineBuilder,
    TimelineSummary,
};

// ==================== INPUT / OUTPUT ====================

/// One document as delivered by the extraction stage
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DocumentInput {
    pub markers: Vec<TemporalMarker>,
    pub chapters: Vec<ChapterInfo>,
    /// Full text, used for complexity routing and semantic context only
    #[serde(default)]
    pub text: Option<String>,
}

impl DocumentInput {
    pub fn new(markers: Vec<TemporalMarker>, chapters: Vec<ChapterInfo>) -> Self {
        Self {
            markers,
            chapters,
            text: None,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }
}

/// Phase timings in microseconds
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AnalysisTimings {
    pub build_us: u64,
    pub classify_us: u64,
    pub check_us: u64,
    pub total_us: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DocumentAnalysis {
    pub timeline: Timeline,
    pub order: OrderReport,
    pub summary: TimelineSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityScore>,
    pub temporal: CheckReport,
    pub timings: AnalysisTimings,
}

/// Result slot of one document in a batch
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Analyzed { analysis: Box<DocumentAnalysis> },
    Failed { error: String },
    /// Not started because the batch was cancelled
    Cancelled,
}

impl DocumentOutcome {
    pub fn analysis(&self) -> Option<&DocumentAnalysis> {
        match self {
            DocumentOutcome::Analyzed { analysis } => Some(&**analysis),
            _ => None,
        }
    }
}

/// Caller-owned abort switch for batch analysis. Checked before each
/// document starts; a document already in progress runs to completion.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ==================== ENGINE ====================

pub struct NarrativeEngine {
    config: EngineConfig,
    builder: TimelineBuilder,
    classifier: NarrativeOrderClassifier,
    checker: TemporalChecker,
    router: ComplexityRouter,
    attributes: AttributeConsensus,
}

impl NarrativeEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            builder: TimelineBuilder::new(config.builder.clone())?,
            classifier: NarrativeOrderClassifier::new(config.order.clone())?,
            checker: TemporalChecker::new(&config)?,
            router: ComplexityRouter::new(config.router.clone())?,
            attributes: AttributeConsensus::new(&config),
            config,
        })
    }

    /// Attach the external semantic judge
    pub fn with_semantic(mut self, validator: Arc<dyn SemanticValidator>) -> Self {
        self.checker = self.checker.with_semantic(validator);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build and classify, without inconsistency checks
    pub fn build_timeline(&self, markers: &[TemporalMarker], chapters: &[ChapterInfo]) -> EngineResult<(Timeline, OrderReport)> {
        let mut timeline = self.builder.build(markers, chapters)?;
        let report = self.classifier.classify(&mut timeline);
        Ok((timeline, report))
    }

    pub fn analyze(&self, input: &DocumentInput) -> EngineResult<DocumentAnalysis> {
        let overall_start = instant::Instant::now();
        let mut timings = AnalysisTimings::default();

        // Phase 1: timeline
        let build_start = instant::Instant::now();
        let mut timeline = self.builder.build(&input.markers, &input.chapters)?;
        timings.build_us = build_start.elapsed().as_micros() as u64;

        // Phase 2: narrative order
        let classify_start = instant::Instant::now();
        let order = self.classifier.classify(&mut timeline);
        timings.classify_us = classify_start.elapsed().as_micros() as u64;

        // Phase 3: inconsistencies
        let check_start = instant::Instant::now();
        let text = input.text.as_deref();
        let temporal = self.checker.check(&timeline, &input.markers, text)?;
        timings.check_us = check_start.elapsed().as_micros() as u64;

        let complexity = text.map(|t| self.router.analyze(t));
        let summary = timeline.summary();
        timings.total_us = overall_start.elapsed().as_micros() as u64;

        info!(
            events = summary.total_events,
            analepsis = order.analepsis,
            prolepsis = order.prolepsis,
            findings = temporal.findings.len(),
            total_us = timings.total_us,
            "document analysed"
        );

        Ok(DocumentAnalysis {
            timeline,
            order,
            summary,
            complexity,
            temporal,
            timings,
        })
    }

    /// Analyze independent documents. Output slots follow input order.
    pub fn analyze_batch(&self, inputs: &[DocumentInput], cancel: &CancellationFlag) -> Vec<DocumentOutcome> {
        let outcomes = map_ordered(inputs, |input| {
            if cancel.is_cancelled() {
                return DocumentOutcome::Cancelled;
            }
            match self.analyze(input) {
                Ok(analysis) => DocumentOutcome::Analyzed {
                    analysis: Box::new(analysis),
                },
                Err(e) => {
                    // Non-fatal: one bad document does not sink the batch
                    warn!(error = %e, "document analysis failed");
                    DocumentOutcome::Failed { error: e.to_string() }
                }
            }
        });

        let cancelled = outcomes
            .iter()
            .filter(|o| matches!(o, DocumentOutcome::Cancelled))
            .count();
        info!(documents = inputs.len(), cancelled, "batch analysed");
        outcomes
    }

    pub fn complexity(&self, text: &str) -> ComplexityScore {
        self.router.analyze(text)
    }

    /// Resolve attribute conflicts reported by several extraction methods
    pub fn resolve_attributes(&self, batches: &[AttributeBatch]) -> EngineResult<Vec<AttributeFinding>> {
        self.attributes.resolve(batches)
    }
}
