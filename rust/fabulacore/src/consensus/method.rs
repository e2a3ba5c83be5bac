//! Detection method identifiers for the two aggregator instantiations

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// A detector that can vote in the consensus aggregator.
///
/// Methods are plain identifiers: their weight lives in a `WeightTable`, never
/// on the method itself.
pub trait DetectionMethod: Copy + Ord + Hash + Debug + Serialize + Send + Sync + 'static {
    fn name(&self) -> &'static str;
}

/// Attribute extraction methods, cheapest first
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Pattern,
    Structural,
    Embedding,
    Llm,
}

impl ExtractionMethod {
    pub const ALL: [ExtractionMethod; 4] = [
        ExtractionMethod::Pattern,
        ExtractionMethod::Structural,
        ExtractionMethod::Embedding,
        ExtractionMethod::Llm,
    ];
}

impl DetectionMethod for ExtractionMethod {
    fn name(&self) -> &'static str {
        match self {
            ExtractionMethod::Pattern => "pattern",
            ExtractionMethod::Structural => "structural",
            ExtractionMethod::Embedding => "embedding",
            ExtractionMethod::Llm => "llm",
        }
    }
}

/// Temporal inconsistency detection methods
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemporalMethod {
    /// Direct comparison of resolved story times and markers
    Direct,
    /// Transition vocabulary and declared narrative order around the finding
    Contextual,
    /// External LLM judgement
    Semantic,
    /// Narrative priors per inconsistency kind
    Heuristic,
}

impl DetectionMethod for TemporalMethod {
    fn name(&self) -> &'static str {
        match self {
            TemporalMethod::Direct => "direct",
            TemporalMethod::Contextual => "contextual",
            TemporalMethod::Semantic => "semantic",
            TemporalMethod::Heuristic => "heuristic",
        }
    }
}
