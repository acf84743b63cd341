//! Engine configuration.

use crate::error::PipelineError;
use calc_script::AnalysisOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Validation engine settings.
///
/// Every field has a default, so a JSON file only needs the keys it overrides:
///
/// ```json
/// { "debounce_ms": 250, "compile_check": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period after the last edit before a pass starts.
    pub debounce_ms: u64,
    /// Run the external compiler check after the static analyzers.
    pub compile_check: bool,
    /// Keep at most this many diagnostics per report.
    pub max_diagnostics: Option<usize>,
    /// Run the stylistic checks.
    pub stylistic_checks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            compile_check: true,
            max_diagnostics: None,
            stylistic_checks: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The debounce delay.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Set the debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = delay.as_millis() as u64;
        self
    }

    /// Enable or disable the compiler check.
    pub fn with_compile_check(mut self, enabled: bool) -> Self {
        self.compile_check = enabled;
        self
    }

    /// Cap the number of reported diagnostics.
    pub fn with_max_diagnostics(mut self, max: Option<usize>) -> Self {
        self.max_diagnostics = max;
        self
    }

    /// Enable or disable stylistic checks.
    pub fn with_stylistic_checks(mut self, enabled: bool) -> Self {
        self.stylistic_checks = enabled;
        self
    }

    /// Options for the static analysis stage.
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            stylistic_checks: self.stylistic_checks,
            max_diagnostics: None,
        }
    }
}
