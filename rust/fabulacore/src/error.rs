//! Engine errors
//!
//! Only caller-contract violations surface here. Data-quality problems
//! (unresolvable markers, conflicting dates, too few dated events) degrade
//! gracefully inside the engine and never become an `EngineError`.

/// Errors raised at the engine boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("aggregator received no method results")]
    EmptyMethodResults,

    #[error("invalid confidence {value} for {context}")]
    InvalidConfidence { context: String, value: f64 },

    #[error("no weight configured for method {method}")]
    UnknownMethod { method: String },

    #[error("invalid marker at offset {offset}: {reason}")]
    InvalidMarker { offset: usize, reason: String },

    #[error("lexicon build failed: {0}")]
    Lexicon(#[from] aho_corasick::BuildError),

    #[error("pattern compile failed: {0}")]
    Pattern(#[from] regex::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias.
pub type EngineResult<T> = Result<T, EngineError>;

/// Reject confidences outside [0, 1] (and NaN).
pub(crate) fn check_unit_interval(context: &str, value: f64) -> EngineResult<()> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(EngineError::InvalidConfidence {
            context: context.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_interval_bounds() {
        assert!(check_unit_interval("x", 0.0).is_ok());
        assert!(check_unit_interval("x", 1.0).is_ok());
        assert!(check_unit_interval("x", -0.01).is_err());
        assert!(check_unit_interval("x", 1.01).is_err());
        assert!(check_unit_interval("x", f64::NAN).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::UnknownMethod { method: "llm".into() };
        assert_eq!(err.to_string(), "no weight configured for method llm");

        let err = EngineError::InvalidConfidence { context: "vote".into(), value: -1.0 };
        assert!(err.to_string().contains("-1"));
    }
}
