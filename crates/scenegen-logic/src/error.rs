//! Errors that abort scene generation.

use thiserror::Error;

use crate::cast::ConfigTypeError;
use crate::config::SettingsError;
use crate::validation::Rejection;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error(transparent)]
    ConfigType(#[from] ConfigTypeError),

    /// Input that is well-typed but cannot be honored.
    #[error("{feature}: {message}")]
    Configuration { feature: String, message: String },

    #[error("{feature}: no valid placement after {attempts} attempts")]
    PlacementExhausted {
        feature: String,
        attempts: u32,
        #[source]
        last: Rejection,
    },

    #[error("invalid generation settings: {}", join_settings(.0))]
    Settings(Vec<SettingsError>),
}

fn join_settings(errors: &[SettingsError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl GenerationError {
    pub fn configuration(feature: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Configuration {
            feature: feature.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_exhaustion_carries_last_rejection() {
        let err = GenerationError::PlacementExhausted {
            feature: "objects".into(),
            attempts: 50,
            last: Rejection::Overlap {
                object: "objects-1".into(),
                other: "objects-0".into(),
            },
        };
        assert!(err.to_string().contains("50 attempts"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("objects-1 overlaps objects-0"));
    }

    #[test]
    fn test_configuration_message() {
        let err = GenerationError::configuration("agents", "label 'x' is never declared");
        assert_eq!(err.to_string(), "agents: label 'x' is never declared");
    }
}
