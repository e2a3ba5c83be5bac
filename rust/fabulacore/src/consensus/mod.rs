//! Generic weighted-voting consensus
//!
//! # Usage
//! ```rust,ignore
//! let weights = WeightTable::new([(ExtractionMethod::Pattern, 0.9), (ExtractionMethod::Llm, 0.85)]);
//! let aggregator = ConsensusAggregator::new(weights, ConsensusConfig::default());
//!
//! let findings = aggregator.aggregate(&[
//!     MethodResult::new(ExtractionMethod::Pattern, vec![Vote::new("ada::eyes", "grey", 0.9)]),
//!     MethodResult::new(ExtractionMethod::Llm, vec![Vote::new("ada::eyes", "grey", 0.8)]),
//! ])?;
//! assert_eq!(findings[0].level, ConsensusLevel::Unanimous);
//! ```

pub mod aggregator;
pub mod attribute;
pub mod method;


pub use aggregator::{
    normalize, Candidate, Conflict, ConsensusAggregator, ConsensusFinding, ConsensusLevel,
    MethodResult, MethodVote, Vote, WeightTable,
};
pub use attribute::{AttributeBatch, AttributeClaim, AttributeConsensus, AttributeFinding};
pub use method::{DetectionMethod, ExtractionMethod, TemporalMethod};
