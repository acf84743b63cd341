//! One synchronous validation pass: static analysis followed by the compiler check.

use crate::compiler::{CompileError, NoopCompiler, ScriptCompiler, remap_compile_error};
use crate::config::EngineConfig;
use crate::error::PipelineError;
use crate::prelude::Prelude;
use calc_script::{Analysis, Diagnostic, DiagnosticCounts, summarize};
use calc_script_lang::{ParameterSet, ScriptLanguage};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

/// Result of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    /// Final diagnostics, in user coordinates.
    pub diagnostics: Vec<Diagnostic>,
    /// Human-readable counts, e.g. `"2 errors, 1 warning"`.
    pub status: String,
}

impl Validation {
    /// Per-severity counts.
    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts::from_diagnostics(&self.diagnostics)
    }

    /// Whether any error was reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Runs the analyzers and the compiler check for one language.
pub struct Validator {
    language: ScriptLanguage,
    analysis: Analysis,
    compiler: Box<dyn ScriptCompiler>,
    config: EngineConfig,
}

impl Validator {
    /// Create a validator using [`NoopCompiler`] as the compiler.
    pub fn new(language: ScriptLanguage, config: EngineConfig) -> Self {
        Self {
            language,
            analysis: Analysis::new(config.analysis_options()),
            compiler: Box::new(NoopCompiler),
            config,
        }
    }

    /// Replace the compiler collaborator.
    pub fn with_compiler(mut self, compiler: impl ScriptCompiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    /// The language tables in use.
    pub fn language(&self) -> &ScriptLanguage {
        &self.language
    }

    /// The configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `text` against `parameters`.
    ///
    /// Analyzer failures are contained inside the analysis stage. An `Err` means the pass as a
    /// whole could not complete (invalid parameters, compiler unavailable or panicking).
    pub fn validate(
        &self,
        text: &str,
        parameters: &ParameterSet,
    ) -> Result<Validation, PipelineError> {
        let started = Instant::now();
        parameters.validate()?;

        let mut diagnostics = self
            .analysis
            .run(text, &self.language, parameters)
            .into_diagnostics();

        if self.config.compile_check
            && let Some(diag) = self.compile_check(text, parameters)?
            && !diagnostics.contains(&diag)
        {
            diagnostics.push(diag);
        }

        diagnostics.retain(|d| d.line > 0);
        if let Some(max) = self.config.max_diagnostics {
            diagnostics.truncate(max);
        }

        let status = summarize(&diagnostics);
        debug!(
            bytes = text.len(),
            diagnostics = diagnostics.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "validation pass finished"
        );
        Ok(Validation {
            diagnostics,
            status,
        })
    }

    fn compile_check(
        &self,
        text: &str,
        parameters: &ParameterSet,
    ) -> Result<Option<Diagnostic>, PipelineError> {
        let prelude = Prelude::build(&self.language, parameters);
        let script = prelude.wrap(text);
        let compiler = self.compiler.as_ref();

        match panic::catch_unwind(AssertUnwindSafe(|| compiler.compile(&script))) {
            Ok(Ok(())) => Ok(None),
            Ok(Err(CompileError::Syntax { message })) => {
                Ok(remap_compile_error(&message, &prelude))
            }
            Ok(Err(err)) => {
                warn!(compiler = compiler.name(), error = %err, "compile check could not run");
                Err(err.into())
            }
            Err(payload) => Err(PipelineError::CompilerPanicked {
                compiler: compiler.name(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_script::{DiagnosticCategory, DiagnosticSeverity};
    use calc_script_lang::{CalculatorParameter, DataType};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// Reports a fixed message and records every script it was given.
    #[derive(Clone)]
    struct ScriptedCompiler {
        message: Option<String>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedCompiler {
        fn accepting() -> Self {
            Self {
                message: None,
                seen: Arc::default(),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                message: Some(message.to_string()),
                seen: Arc::default(),
            }
        }
    }

    impl ScriptCompiler for ScriptedCompiler {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn compile(&self, script: &str) -> Result<(), CompileError> {
            self.seen.lock().unwrap().push(script.to_string());
            match &self.message {
                Some(message) => Err(CompileError::Syntax {
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }
    }

    struct Unavailable;

    impl ScriptCompiler for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn compile(&self, _script: &str) -> Result<(), CompileError> {
            Err(CompileError::Unavailable("engine not installed".into()))
        }
    }

    struct Panicking;

    impl ScriptCompiler for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn compile(&self, _script: &str) -> Result<(), CompileError> {
            panic!("engine crashed")
        }
    }

    fn params() -> ParameterSet {
        ParameterSet::new().with(CalculatorParameter::new("weight", DataType::Number))
    }

    fn language() -> ScriptLanguage {
        ScriptLanguage::dosage_calculator()
    }

    #[test]
    fn test_clean_script() {
        let validator = Validator::new(language(), EngineConfig::default());
        let result = validator
            .validate("var dose = dosePerKg(5, weight);\n", &params())
            .unwrap();
        assert_eq!(result.diagnostics, vec![]);
        assert_eq!(result.status, "No problems found");
        assert!(!result.has_errors());
    }

    #[test]
    fn test_compiler_error_is_remapped() {
        let prelude_lines = Prelude::build(&language(), &params()).line_count();
        let message = format!("unexpected token at line {}, col 9", prelude_lines + 2);
        let validator = Validator::new(language(), EngineConfig::default())
            .with_compiler(ScriptedCompiler::failing(&message));
        let result = validator
            .validate("var a = 1;\nvar b = 2;\n", &params())
            .unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert_eq!((diag.line, diag.column), (2, 9));
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.category, DiagnosticCategory::Engine);
        assert_eq!(result.status, "1 error");
    }

    #[test]
    fn test_compiler_sees_prelude_and_text() {
        let compiler = ScriptedCompiler::accepting();
        let validator =
            Validator::new(language(), EngineConfig::default()).with_compiler(compiler.clone());
        validator.validate("var x = weight;", &params()).unwrap();

        let seen = compiler.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("function dosePerKg("));
        assert!(seen[0].contains("var weight = 0;\n"));
        assert!(seen[0].ends_with("\nvar x = weight;"));
    }

    #[test]
    fn test_prelude_location_dropped() {
        let validator = Validator::new(language(), EngineConfig::default())
            .with_compiler(ScriptedCompiler::failing("Line 1: duplicate declaration"));
        let result = validator.validate("var a = 1;\n", &params()).unwrap();
        assert_eq!(result.diagnostics, vec![]);
    }

    #[test]
    fn test_compile_check_disabled() {
        let config = EngineConfig::default().with_compile_check(false);
        let validator = Validator::new(language(), config)
            .with_compiler(ScriptedCompiler::failing("Line 99: broken"));
        let result = validator.validate("var a = 1;\n", &params()).unwrap();
        assert_eq!(result.diagnostics, vec![]);
    }

    #[test]
    fn test_unavailable_compiler_fails_pass() {
        let validator =
            Validator::new(language(), EngineConfig::default()).with_compiler(Unavailable);
        let err = validator.validate("var a = 1;", &params()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Compiler(CompileError::Unavailable(_))
        ));
    }

    #[test]
    fn test_panicking_compiler_is_contained() {
        let validator = Validator::new(language(), EngineConfig::default()).with_compiler(Panicking);
        let err = validator.validate("var a = 1;", &params()).unwrap_err();
        match err {
            PipelineError::CompilerPanicked { compiler, message } => {
                assert_eq!(compiler, "panicking");
                assert_eq!(message, "engine crashed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let params = ParameterSet::new().with(CalculatorParameter::new("not valid", DataType::Text));
        let validator = Validator::new(language(), EngineConfig::default());
        let err = validator.validate("var a = 1;", &params).unwrap_err();
        assert!(matches!(err, PipelineError::Parameters(_)));
    }

    #[test]
    fn test_max_diagnostics() {
        let config = EngineConfig::default().with_max_diagnostics(Some(2));
        let validator = Validator::new(language(), config);
        let result = validator
            .validate("a1 = 1;\na2 = 2;\na3 = 3;\na4 = 4;\n", &ParameterSet::new())
            .unwrap();
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.status, "2 warnings");
    }
}
