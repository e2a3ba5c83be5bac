//! Property tests for timeline construction and consensus aggregation.

use proptest::prelude::*;

use fabulacore::config::{BuilderConfig, ConsensusConfig, OrderConfig, TemporalWeights};
use fabulacore::consensus::{ConsensusAggregator, ConsensusLevel, MethodResult, TemporalMethod, Vote};
use fabulacore::timeline::{
    ChapterInfo, Direction, MarkerKind, NarrativeOrderClassifier, SourceSpan, TemporalMarker, TimeUnit,
    TimelineBuilder,
};

fn chapters() -> Vec<ChapterInfo> {
    vec![
        ChapterInfo::new(1, "", 0),
        ChapterInfo::new(2, "", 1000),
        ChapterInfo::new(3, "", 2000),
    ]
}

/// (chapter, offset within chapter, past?, days, confidence)
fn relative_markers() -> impl Strategy<Value = Vec<TemporalMarker>> {
    prop::collection::vec(
        (1u32..=3, 0usize..900, any::<bool>(), 0u32..60, 0.1f64..=1.0),
        0..12,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .map(|(chapter, offset, past, days, confidence)| {
                let start = (chapter as usize - 1) * 1000 + offset;
                TemporalMarker::new(
                    "some days later",
                    SourceSpan::new(start, start + 15, chapter, 0),
                    MarkerKind::RelativeTime {
                        direction: if past { Direction::Past } else { Direction::Future },
                        unit: Some(TimeUnit::Day),
                        quantity: Some(days as f64),
                        weekday: None,
                    },
                    confidence,
                )
            })
            .collect()
    })
}

fn dated_markers() -> impl Strategy<Value = Vec<TemporalMarker>> {
    prop::collection::vec(
        (1u32..=3, 0usize..900, 1840i32..1860, 1u32..=12, 1u32..=28),
        0..8,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .map(|(chapter, offset, year, month, day)| {
                let start = (chapter as usize - 1) * 1000 + offset;
                TemporalMarker::new(
                    "a date",
                    SourceSpan::new(start, start + 6, chapter, 0),
                    MarkerKind::AbsoluteDate {
                        year: Some(year),
                        month: Some(month),
                        day: Some(day),
                        weekday: None,
                    },
                    0.9,
                )
            })
            .collect()
    })
}

fn temporal_aggregator(min_confidence: f64) -> ConsensusAggregator<TemporalMethod> {
    ConsensusAggregator::new(
        TemporalWeights::default().table(),
        ConsensusConfig {
            min_confidence,
            ..ConsensusConfig::default()
        },
    )
}

fn method() -> impl Strategy<Value = TemporalMethod> {
    prop_oneof![
        Just(TemporalMethod::Direct),
        Just(TemporalMethod::Contextual),
        Just(TemporalMethod::Semantic),
        Just(TemporalMethod::Heuristic),
    ]
}

// ============================================================================
// Timeline
// ============================================================================

proptest! {
    #[test]
    fn prop_build_is_deterministic(mut markers in relative_markers(), dated in dated_markers()) {
        markers.extend(dated);
        let builder = TimelineBuilder::new(BuilderConfig::default()).unwrap();
        let classifier = NarrativeOrderClassifier::new(OrderConfig::default()).unwrap();

        let mut first = builder.build(&markers, &chapters()).unwrap();
        let mut second = builder.build(&markers, &chapters()).unwrap();
        let first_report = classifier.classify(&mut first);
        let second_report = classifier.classify(&mut second);

        prop_assert_eq!(serde_json::to_value(&first).unwrap(), serde_json::to_value(&second).unwrap());
        prop_assert_eq!(first_report, second_report);
    }

    #[test]
    fn prop_relative_only_never_absolute(markers in relative_markers()) {
        let builder = TimelineBuilder::new(BuilderConfig::default()).unwrap();
        let timeline = builder.build(&markers, &chapters()).unwrap();
        prop_assert!(timeline.events().iter().all(|e| !e.story_time.is_absolute()));
    }

    #[test]
    fn prop_narrative_counts_cover_resolved(mut markers in relative_markers(), dated in dated_markers()) {
        markers.extend(dated);
        let builder = TimelineBuilder::new(BuilderConfig::default()).unwrap();
        let classifier = NarrativeOrderClassifier::new(OrderConfig::default()).unwrap();

        let mut timeline = builder.build(&markers, &chapters()).unwrap();
        let report = classifier.classify(&mut timeline);
        prop_assert!(report.chronological + report.analepsis + report.prolepsis <= timeline.len());
    }
}

// ============================================================================
// Consensus
// ============================================================================

proptest! {
    #[test]
    fn prop_identical_votes_are_unanimous(
        methods in prop::collection::btree_set(method(), 2..=4),
        confidence in 0.0f64..=1.0,
    ) {
        let aggregator = temporal_aggregator(0.0);
        let results: Vec<MethodResult<TemporalMethod>> = methods
            .iter()
            .map(|m| MethodResult::new(*m, vec![Vote::new("jump@2:40", "inconsistent", confidence)]))
            .collect();

        let findings = aggregator.aggregate(&results).unwrap();
        prop_assert_eq!(findings.len(), 1);
        prop_assert_eq!(findings[0].level, ConsensusLevel::Unanimous);
        prop_assert!(findings[0].confidence <= 1.0);
    }

    #[test]
    fn prop_single_full_weight_vote_keeps_confidence(confidence in 0.5f64..=1.0) {
        let aggregator = temporal_aggregator(0.5);
        let results = vec![MethodResult::new(
            TemporalMethod::Direct,
            vec![Vote::new("age@3:10", "inconsistent", confidence)],
        )];

        let findings = aggregator.aggregate(&results).unwrap();
        prop_assert_eq!(findings.len(), 1);
        prop_assert_eq!(findings[0].level, ConsensusLevel::Single);
        prop_assert!((findings[0].confidence - confidence).abs() < 1e-9);
    }

    #[test]
    fn prop_findings_bounded_and_ranked(
        votes in prop::collection::vec(
            (method(), 0usize..4, prop_oneof![Just("inconsistent"), Just("consistent")], 0.0f64..=1.0),
            1..24,
        ),
    ) {
        let aggregator = temporal_aggregator(0.0);
        let results: Vec<MethodResult<TemporalMethod>> = votes
            .into_iter()
            .map(|(m, subject, value, confidence)| {
                MethodResult::new(m, vec![Vote::new(&format!("s{}", subject), value, confidence)])
            })
            .collect();

        let findings = aggregator.aggregate(&results).unwrap();
        prop_assert!(findings.iter().all(|f| (0.0..=1.0).contains(&f.confidence)));
        prop_assert!(findings.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        prop_assert!(findings.iter().all(|f| f.winner().map(|c| c.value.as_str()) == Some(f.value.as_str())));
    }
}
