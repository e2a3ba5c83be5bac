//! Configuration types and defaults for the temporal engine
//!
//! Every struct is `#[serde(default)]`, so a config file only needs the keys
//! it wants to override. Nothing here is global: callers build an
//! `EngineConfig` and hand it to the engine.

use serde::{Deserialize, Serialize};

use crate::consensus::{ExtractionMethod, TemporalMethod, WeightTable};
use crate::error::{check_unit_interval, EngineError, EngineResult};

// =============================================================================
// Complexity Router
// =============================================================================

/// Thresholds for the detection tiers picked by the complexity router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Score at which the expensive LLM tier is recommended. Default: 0.7
    pub llm_threshold: f64,
    /// Score at which the embedding tier is recommended. Default: 0.3
    pub embedding_threshold: f64,
    /// The cheap pattern tier is recommended only below this score. Default: 0.6
    pub pattern_ceiling: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            llm_threshold: 0.7,
            embedding_threshold: 0.3,
            pattern_ceiling: 0.6,
        }
    }
}

// =============================================================================
// Consensus Aggregator
// =============================================================================

/// Consensus modifiers and the reporting cutoff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Findings below this confidence are dropped. Default: 0.5
    pub min_confidence: f64,
    /// Multiplier for unanimous groups (> 1.0). Default: 1.10
    pub unanimous_boost: f64,
    /// Multiplier for contested groups (< 1.0). Default: 0.80
    pub contested_penalty: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            unanimous_boost: 1.10,
            contested_penalty: 0.80,
        }
    }
}

/// Precision weights for attribute extraction methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeWeights {
    pub pattern: f64,
    pub structural: f64,
    pub embedding: f64,
    pub llm: f64,
}

impl Default for AttributeWeights {
    fn default() -> Self {
        Self {
            pattern: 0.90,
            structural: 0.80,
            embedding: 0.65,
            llm: 0.85,
        }
    }
}

impl AttributeWeights {
    /// Weights are used as-is.
    pub fn table(&self) -> WeightTable<ExtractionMethod> {
        WeightTable::new([
            (ExtractionMethod::Pattern, self.pattern),
            (ExtractionMethod::Structural, self.structural),
            (ExtractionMethod::Embedding, self.embedding),
            (ExtractionMethod::Llm, self.llm),
        ])
    }
}

/// Relative shares of the temporal detection methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalWeights {
    pub direct: f64,
    pub contextual: f64,
    pub semantic: f64,
    pub heuristic: f64,
}

impl Default for TemporalWeights {
    fn default() -> Self {
        Self {
            direct: 0.35,
            contextual: 0.25,
            semantic: 0.25,
            heuristic: 0.15,
        }
    }
}

impl TemporalWeights {
    /// Shares are rescaled so the largest one becomes 1.0.
    pub fn table(&self) -> WeightTable<TemporalMethod> {
        WeightTable::from_shares([
            (TemporalMethod::Direct, self.direct),
            (TemporalMethod::Contextual, self.contextual),
            (TemporalMethod::Semantic, self.semantic),
            (TemporalMethod::Heuristic, self.heuristic),
        ])
    }
}

// =============================================================================
// Timeline Builder / Narrative Order
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Relative events inherit marker confidence scaled by this. Default: 0.8
    pub relative_confidence_factor: f64,
    /// Character-age events are low weight. Default: 0.5
    pub age_event_weight: f64,
    /// Offset for vague progressions ("a while later"). Default: 1 day
    pub vague_progression_days: i64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            relative_confidence_factor: 0.8,
            age_event_weight: 0.5,
            vague_progression_days: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Backward gaps above this are analepsis without lexical evidence. Default: 90
    pub analepsis_gap_days: i64,
    /// Forward gaps must exceed this to be considered prolepsis. Default: 365
    pub prolepsis_gap_days: i64,
    /// Forward gaps above this are prolepsis without lexical evidence. Default: 730
    pub prolepsis_unconditional_days: i64,
    /// Chronological ranks a forward jump must skip. Default: 3
    pub rank_skip: usize,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            analepsis_gap_days: 90,
            prolepsis_gap_days: 365,
            prolepsis_unconditional_days: 730,
            rank_skip: 3,
        }
    }
}

// =============================================================================
// Inconsistency Checks
// =============================================================================

/// A historical period used for anachronism checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochPeriod {
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
}

impl EpochPeriod {
    pub fn new(name: &str, start_year: i32, end_year: i32) -> Self {
        Self {
            name: name.to_lowercase(),
            start_year,
            end_year,
        }
    }

    /// Whether lowercased `text` names this period. Names loaded from a
    /// config file keep their casing, so compare case-insensitively.
    pub fn is_named_in(&self, text: &str) -> bool {
        text.contains(self.name.to_lowercase().as_str())
    }
}

fn default_epochs() -> Vec<EpochPeriod> {
    vec![
        EpochPeriod::new("the great war", 1914, 1918),
        EpochPeriod::new("the first world war", 1914, 1918),
        EpochPeriod::new("the great depression", 1929, 1939),
        EpochPeriod::new("the second world war", 1939, 1945),
        EpochPeriod::new("world war ii", 1939, 1945),
        EpochPeriod::new("the blitz", 1940, 1941),
        EpochPeriod::new("the cold war", 1947, 1991),
        EpochPeriod::new("the space race", 1955, 1975),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Undeclared backward steps longer than this are impossible. Default: 7
    pub impossible_sequence_days: i64,
    /// Undeclared forward jumps longer than this are suspicious. Default: 5
    pub suspicious_jump_years: i64,
    /// Allowed drift between stated ages and elapsed years. Default: 1.5
    pub age_tolerance_years: f64,
    /// Relative markers closer than this (chars) are compared. Default: 500
    pub marker_conflict_window: usize,
    /// Text radius (chars) handed to the semantic validator. Default: 300
    pub context_radius: usize,
    /// Periods checked against the story's calendar span
    pub epochs: Vec<EpochPeriod>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            impossible_sequence_days: 7,
            suspicious_jump_years: 5,
            age_tolerance_years: 1.5,
            marker_conflict_window: 500,
            context_radius: 300,
            epochs: default_epochs(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Top-level configuration aggregating all component configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub router: RouterConfig,
    pub consensus: ConsensusConfig,
    pub attribute_weights: AttributeWeights,
    pub temporal_weights: TemporalWeights,
    /// On/off switch for the semantic (LLM) tier. Default: false
    pub semantic_enabled: bool,
    pub builder: BuilderConfig,
    pub order: OrderConfig,
    pub checks: CheckConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            consensus: ConsensusConfig::default(),
            attribute_weights: AttributeWeights::default(),
            temporal_weights: TemporalWeights::default(),
            semantic_enabled: false,
            builder: BuilderConfig::default(),
            order: OrderConfig::default(),
            checks: CheckConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Cheap tiers only
    pub fn production() -> Self {
        Self::default()
    }

    /// Semantic tier switched on
    pub fn with_semantic() -> Self {
        Self {
            semantic_enabled: true,
            ..Self::default()
        }
    }

    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a JSON string, falling back to defaults for missing fields.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        check_unit_interval("router.llm_threshold", self.router.llm_threshold)?;
        check_unit_interval("router.embedding_threshold", self.router.embedding_threshold)?;
        check_unit_interval("router.pattern_ceiling", self.router.pattern_ceiling)?;
        check_unit_interval("consensus.min_confidence", self.consensus.min_confidence)?;
        check_unit_interval(
            "builder.relative_confidence_factor",
            self.builder.relative_confidence_factor,
        )?;
        check_unit_interval("builder.age_event_weight", self.builder.age_event_weight)?;

        if !(self.consensus.unanimous_boost >= 1.0) {
            return Err(EngineError::Config(format!(
                "consensus.unanimous_boost must be >= 1.0, got {}",
                self.consensus.unanimous_boost
            )));
        }
        if !(self.consensus.contested_penalty > 0.0 && self.consensus.contested_penalty <= 1.0) {
            return Err(EngineError::Config(format!(
                "consensus.contested_penalty must be in (0, 1], got {}",
                self.consensus.contested_penalty
            )));
        }

        let attribute = &self.attribute_weights;
        for (name, weight) in [
            ("pattern", attribute.pattern),
            ("structural", attribute.structural),
            ("embedding", attribute.embedding),
            ("llm", attribute.llm),
        ] {
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(EngineError::Config(format!(
                    "attribute_weights.{} must be in (0, 1], got {}",
                    name, weight
                )));
            }
        }

        let temporal = &self.temporal_weights;
        for (name, share) in [
            ("direct", temporal.direct),
            ("contextual", temporal.contextual),
            ("semantic", temporal.semantic),
            ("heuristic", temporal.heuristic),
        ] {
            if !(share > 0.0) {
                return Err(EngineError::Config(format!(
                    "temporal_weights.{} must be positive, got {}",
                    name, share
                )));
            }
        }

        if self.order.prolepsis_unconditional_days < self.order.prolepsis_gap_days {
            return Err(EngineError::Config(
                "order.prolepsis_unconditional_days must be >= order.prolepsis_gap_days".into(),
            ));
        }

        for epoch in &self.checks.epochs {
            if epoch.name.trim().is_empty() {
                return Err(EngineError::Config("epoch names must not be empty".into()));
            }
            if epoch.start_year > epoch.end_year {
                return Err(EngineError::Config(format!(
                    "epoch '{}' ends before it starts",
                    epoch.name
                )));
            }
        }

        Ok(())
    }
}
