use crate::compiler::CompileError;
use calc_script_lang::LanguageError;
use std::io;
use thiserror::Error;

/// Errors produced by the validation engine.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    /// The configuration file is not valid JSON for [`EngineConfig`](crate::EngineConfig).
    Config(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    /// The configuration file could not be read.
    Io(#[from] io::Error),

    #[error("invalid parameters: {0}")]
    /// The calculator parameter set is malformed.
    Parameters(#[from] LanguageError),

    #[error("compile check failed: {0}")]
    /// The external compiler could not run.
    Compiler(#[from] CompileError),

    #[error("compiler '{compiler}' panicked: {message}")]
    /// The external compiler panicked; the panic was contained.
    CompilerPanicked {
        /// Compiler name.
        compiler: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },

    #[error("validation pipeline has stopped")]
    /// The background threads are gone.
    Stopped,
}
