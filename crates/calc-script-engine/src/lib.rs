#![warn(missing_docs)]
//! `calc-script-engine` - background validation for calculator scripts.
//!
//! The engine wraps the static analyzers of [`calc_script`] into a pass that also consults an
//! external script compiler, and runs that pass off the interactive path.
//!
//! - [`Validator`]: one synchronous pass (`analyzers -> compiler check -> merge -> status`)
//! - [`ValidationPipeline`]: debounce + single-flight worker threads that publish
//!   [`ValidationEvent`]s over a channel
//! - [`Prelude`]: helper stubs and parameter declarations placed before user code for the
//!   compiler; its line count drives the line remapping
//! - [`ScriptCompiler`]: the compiler collaborator ([`NoopCompiler`] by default, `BoaCompiler`
//!   with the `boa` feature)
//!
//! # Example
//!
//! ```
//! use calc_script_engine::{EngineConfig, Validator};
//! use calc_script_lang::{CalculatorParameter, DataType, ParameterSet, ScriptLanguage};
//!
//! let params = ParameterSet::new().with(CalculatorParameter::new("weight", DataType::Number));
//! let validator = Validator::new(ScriptLanguage::dosage_calculator(), EngineConfig::default());
//!
//! let result = validator.validate("var dose = dosePerKg(5);\n", &params).unwrap();
//! assert_eq!(result.status, "1 error");
//! ```

mod compiler;
mod config;
mod error;
mod pipeline;
mod prelude;
mod validator;

#[cfg(feature = "boa")]
pub use compiler::BoaCompiler;
pub use compiler::{
    CompileError, NoopCompiler, ScriptCompiler, parse_error_location, remap_compile_error,
};
pub use config::EngineConfig;
pub use error::PipelineError;
pub use pipeline::{SkipReason, ValidationEvent, ValidationPipeline, ValidationReport};
pub use prelude::Prelude;
pub use validator::{Validation, Validator};
