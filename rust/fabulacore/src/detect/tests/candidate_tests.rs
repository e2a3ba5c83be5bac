//! Tests for candidates and verdict votes

use crate::detect::{verdict_vote, InconsistencyCandidate, InconsistencyKind, Severity, CONSISTENT, INCONSISTENT};

#[test]
fn test_subject_format() {
    let candidate = InconsistencyCandidate::new(
        InconsistencyKind::SuspiciousJump,
        Severity::Low,
        4,
        1200,
        "jump".into(),
        0.6,
    );
    assert_eq!(candidate.subject(), "suspicious_jump@4:1200");
}

#[test]
fn test_severity_order() {
    assert!(Severity::Critical > Severity::High);
    assert!(Severity::Medium > Severity::Low);
}

#[test]
fn test_verdict_vote() {
    let vote = verdict_vote("s", 0.8).unwrap();
    assert_eq!(vote.value, INCONSISTENT);
    assert!((vote.confidence - 0.8).abs() < 1e-9);

    let vote = verdict_vote("s", 0.3).unwrap();
    assert_eq!(vote.value, CONSISTENT);
    assert!((vote.confidence - 0.7).abs() < 1e-9);

    assert!(verdict_vote("s", 0.5).is_none());
}

#[test]
fn test_candidate_serializes_kind_snake_case() {
    let candidate = InconsistencyCandidate::new(
        InconsistencyKind::AgeDateMismatch,
        Severity::High,
        2,
        40,
        "ages".into(),
        0.9,
    )
    .with_expectation("about 32 years old".into(), "40 years old".into());

    let json = serde_json::to_value(&candidate).unwrap();
    assert_eq!(json["kind"], "age_date_mismatch");
    assert_eq!(json["severity"], "high");
    assert_eq!(json["expected"], "about 32 years old");
}
