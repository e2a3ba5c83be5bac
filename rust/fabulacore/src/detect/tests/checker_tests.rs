//! Tests for the TemporalChecker
//!
//! End-to-end: markers → timeline → narrative order → candidates → consensus.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::consensus::{ConsensusLevel, TemporalMethod};
use crate::detect::{
    CheckReport, InconsistencyCandidate, InconsistencyKind, SemanticValidator, Severity, TemporalChecker,
};
use crate::error::EngineResult;
use crate::timeline::{
    ChapterInfo, MarkerKind, NarrativeOrderClassifier, SourceSpan, TemporalMarker, TimelineBuilder,
};

fn chapters() -> Vec<ChapterInfo> {
    vec![
        ChapterInfo::new(1, "Arrival", 0),
        ChapterInfo::new(2, "The Mill", 1000),
        ChapterInfo::new(3, "Winter", 2000),
    ]
}

fn day(text: &str, chapter: u32, start: usize, year: i32, month: u32, day: u32) -> TemporalMarker {
    TemporalMarker::new(
        text,
        SourceSpan::new(start, start + text.len(), chapter, 0),
        MarkerKind::AbsoluteDate {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            weekday: None,
        },
        0.9,
    )
}

fn epoch(text: &str, chapter: u32, start: usize) -> TemporalMarker {
    TemporalMarker::new(
        text,
        SourceSpan::new(start, start + text.len(), chapter, 0),
        MarkerKind::SeasonOrEpoch {
            season: None,
            year: None,
            epoch: Some(text.to_string()),
        },
        0.8,
    )
}

fn run(config: &EngineConfig, checker: &TemporalChecker, markers: &[TemporalMarker], text: Option<&str>) -> CheckReport {
    let builder = TimelineBuilder::new(config.builder.clone()).unwrap();
    let classifier = NarrativeOrderClassifier::new(config.order.clone()).unwrap();
    let mut timeline = builder.build(markers, &chapters()).unwrap();
    classifier.classify(&mut timeline);
    checker.check(&timeline, markers, text).unwrap()
}

/// Chapter 3 steps back 18 days with no flashback cue
fn undeclared_regression() -> Vec<TemporalMarker> {
    vec![
        day("March 1, 1850", 1, 10, 1850, 3, 1),
        day("March 20, 1850", 2, 1010, 1850, 3, 20),
        day("March 2, 1850", 3, 2010, 1850, 3, 2),
    ]
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_undeclared_regression_reported() {
    let config = EngineConfig::default();
    let checker = TemporalChecker::new(&config).unwrap();
    let report = run(&config, &checker, &undeclared_regression(), None);

    assert_eq!(report.candidates, 1);
    assert_eq!(report.findings.len(), 1);

    let finding = &report.findings[0];
    assert_eq!(finding.candidate.kind, InconsistencyKind::ImpossibleSequence);
    assert_eq!(finding.candidate.chapter, 3);
    assert_eq!(finding.level, ConsensusLevel::Unanimous);
    assert_eq!(
        finding.methods_agreed,
        vec![TemporalMethod::Direct, TemporalMethod::Contextual, TemporalMethod::Heuristic]
    );
    assert!(finding.confidence >= 0.5);
    assert!(!report.semantic_used);
}

#[test]
fn test_declared_flashback_not_reported() {
    let config = EngineConfig::default();
    let checker = TemporalChecker::new(&config).unwrap();
    let markers = vec![
        day("March 1, 1850", 1, 10, 1850, 3, 1),
        day("March 20, 1850", 2, 1010, 1850, 3, 20),
        // 160 days back: classified as analepsis
        day("October 11, 1849", 3, 2010, 1849, 10, 11),
    ];
    let report = run(&config, &checker, &markers, None);
    assert!(report.findings.is_empty());
}

#[test]
fn test_findings_sorted_by_severity() {
    let config = EngineConfig::default();
    let checker = TemporalChecker::new(&config).unwrap();
    let mut markers = undeclared_regression();
    markers.push(epoch("the cold war", 2, 1050));

    let report = run(&config, &checker, &markers, None);
    let kinds: Vec<InconsistencyKind> = report.findings.iter().map(|f| f.candidate.kind).collect();
    assert_eq!(kinds, vec![InconsistencyKind::ImpossibleSequence, InconsistencyKind::Anachronism]);
    assert_eq!(report.findings[1].candidate.severity, Severity::Medium);
    // The heuristic method reads anachronisms as deliberate
    assert_eq!(report.findings[1].level, ConsensusLevel::Majority);
}

#[test]
fn test_method_vote_counts() {
    let config = EngineConfig::default();
    let checker = TemporalChecker::new(&config).unwrap();
    let report = run(&config, &checker, &undeclared_regression(), None);

    assert_eq!(report.method_votes.get("direct"), Some(&1));
    assert_eq!(report.method_votes.get("contextual"), Some(&1));
    assert_eq!(report.method_votes.get("heuristic"), Some(&1));
    assert!(report.method_votes.get("semantic").is_none());
}

// ============================================================================
// Semantic tier
// ============================================================================

struct Skeptic;

impl SemanticValidator for Skeptic {
    fn validate(&self, _: &InconsistencyCandidate, _: &str, _: &str) -> EngineResult<f64> {
        Ok(0.0)
    }
}

fn llm_friendly() -> EngineConfig {
    let mut config = EngineConfig::with_semantic();
    config.router.llm_threshold = 0.0;
    config
}

#[test]
fn test_semantic_off_by_default() {
    let config = EngineConfig::default();
    let checker = TemporalChecker::new(&config).unwrap().with_semantic(Arc::new(Skeptic));
    let report = run(&config, &checker, &undeclared_regression(), Some("It was cold."));
    assert!(!report.semantic_used);
}

#[test]
fn test_semantic_needs_text() {
    let config = llm_friendly();
    let checker = TemporalChecker::new(&config).unwrap().with_semantic(Arc::new(Skeptic));
    let report = run(&config, &checker, &undeclared_regression(), None);
    assert!(!report.semantic_used);
}

#[test]
fn test_semantic_dissent_is_outvoted() {
    let config = llm_friendly();
    let checker = TemporalChecker::new(&config).unwrap().with_semantic(Arc::new(Skeptic));
    let report = run(&config, &checker, &undeclared_regression(), Some("It was cold."));

    assert!(report.semantic_used);
    assert_eq!(report.method_votes.get("semantic"), Some(&1));
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].level, ConsensusLevel::Majority);
    assert!(!report.findings[0].methods_agreed.contains(&TemporalMethod::Semantic));
}
