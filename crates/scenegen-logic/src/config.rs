//! Engine tunables, separate from the scene document.
//!
//! ```
//! use scenegen_logic::config::{validate_settings, GenerationSettings};
//!
//! let settings = GenerationSettings::from_json(r#"{"retry_budget": 20}"#).unwrap();
//! assert_eq!(settings.deferred_passes, 2);
//! assert!(validate_settings(&settings).is_empty());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the per-placement attempt budget.
pub const MAX_RETRY_BUDGET: u32 = 10_000;

/// Upper bound on extra scheduler passes.
pub const MAX_DEFERRED_PASSES: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Attempts per placement before giving up. Shared by every feature.
    pub retry_budget: u32,
    /// Extra scheduler passes over deferred groups.
    pub deferred_passes: u32,
    /// Random seed (None = caller supplies the RNG state).
    pub seed: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            retry_budget: 50,
            deferred_passes: 2,
            seed: None,
        }
    }
}

impl GenerationSettings {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Result<(), Vec<SettingsError>> {
        let errors = validate_settings(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("retry budget must be at least 1")]
    ZeroRetryBudget,
    #[error("retry budget {0} exceeds {MAX_RETRY_BUDGET}")]
    RetryBudgetTooLarge(u32),
    #[error("{0} deferred passes exceeds {MAX_DEFERRED_PASSES}")]
    TooManyPasses(u32),
}

/// Validate settings, returning all errors found.
pub fn validate_settings(settings: &GenerationSettings) -> Vec<SettingsError> {
    let mut errors = Vec::new();

    if settings.retry_budget == 0 {
        errors.push(SettingsError::ZeroRetryBudget);
    }
    if settings.retry_budget > MAX_RETRY_BUDGET {
        errors.push(SettingsError::RetryBudgetTooLarge(settings.retry_budget));
    }
    if settings.deferred_passes > MAX_DEFERRED_PASSES {
        errors.push(SettingsError::TooManyPasses(settings.deferred_passes));
    }

    errors
}
