//! Attribute conflict resolution
//!
//! Entity attributes ("Ada's eyes are grey") reported by several extraction
//! methods are resolved through the shared aggregator. The subject key is
//! `entity::attribute`, normalized.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::aggregator::{normalize, Conflict, ConsensusAggregator, ConsensusFinding, MethodResult, Vote};
use super::method::ExtractionMethod;
use crate::config::EngineConfig;
use crate::error::EngineResult;

/// One extracted attribute value
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AttributeClaim {
    pub entity: String,
    pub attribute: String,
    pub value: String,
    pub confidence: f64,
}

impl AttributeClaim {
    pub fn new(entity: &str, attribute: &str, value: &str, confidence: f64) -> Self {
        Self {
            entity: entity.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            confidence,
        }
    }

    pub fn subject(&self) -> String {
        subject_key(&self.entity, &self.attribute)
    }
}

/// All claims from one extraction method
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AttributeBatch {
    pub method: ExtractionMethod,
    pub claims: Vec<AttributeClaim>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AttributeFinding {
    pub entity: String,
    pub attribute: String,
    #[serde(flatten)]
    pub consensus: ConsensusFinding<ExtractionMethod>,
}

pub fn subject_key(entity: &str, attribute: &str) -> String {
    format!("{}::{}", normalize(entity), normalize(attribute))
}

/// Fallback for subjects with no claim on record. The attribute is the last
/// segment, so entity names may contain the separator.
fn split_subject(subject: &str) -> (String, String) {
    match subject.rsplit_once("::") {
        Some((entity, attribute)) => (entity.to_string(), attribute.to_string()),
        None => (subject.to_string(), String::new()),
    }
}

/// Aggregator instantiated with the attribute precision weights
pub struct AttributeConsensus {
    aggregator: ConsensusAggregator<ExtractionMethod>,
}

impl AttributeConsensus {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            aggregator: ConsensusAggregator::new(config.attribute_weights.table(), config.consensus.clone()),
        }
    }

    pub fn resolve(&self, batches: &[AttributeBatch]) -> EngineResult<Vec<AttributeFinding>> {
        let findings = self.aggregator.aggregate(&to_results(batches))?;
        let names: HashMap<String, (String, String)> = batches
            .iter()
            .flat_map(|batch| &batch.claims)
            .map(|c| (c.subject(), (normalize(&c.entity), normalize(&c.attribute))))
            .collect();

        Ok(findings
            .into_iter()
            .map(|consensus| {
                let (entity, attribute) = names
                    .get(&consensus.subject)
                    .cloned()
                    .unwrap_or_else(|| split_subject(&consensus.subject));
                AttributeFinding { entity, attribute, consensus }
            })
            .collect())
    }

    pub fn conflicts(&self, batches: &[AttributeBatch]) -> EngineResult<Vec<Conflict<ExtractionMethod>>> {
        self.aggregator.conflicts(&to_results(batches))
    }

    pub fn aggregator(&self) -> &ConsensusAggregator<ExtractionMethod> {
        &self.aggregator
    }
}

fn to_results(batches: &[AttributeBatch]) -> Vec<MethodResult<ExtractionMethod>> {
    batches
        .iter()
        .map(|batch| {
            MethodResult::new(
                batch.method,
                batch
                    .claims
                    .iter()
                    .map(|c| Vote::new(&c.subject(), &c.value, c.confidence))
                    .collect(),
            )
        })
        .collect()
}
