#![warn(missing_docs)]
//! `calc-script-lang` - data-driven language tables for `calc-script`.
//!
//! This crate intentionally stays lightweight and does **not** contain any analysis logic. It
//! provides the small, read-only registries that the analyzer consults:
//!
//! - reserved keywords and control-flow keywords
//! - built-in global names (`Math`, `parseInt`, ...)
//! - custom helper function signatures (drives arity checks)
//! - the calculator parameters declared for a document
//!
//! All of them can be loaded from JSON so hosts can ship registries next to their calculators.

mod error;
mod keywords;
mod parameters;
mod registry;

pub use error::LanguageError;
pub use keywords::{BUILTIN_GLOBALS, CONTROL_FLOW_KEYWORDS, KEYWORDS, is_identifier};
pub use parameters::{CalculatorParameter, DataType, ParameterSet};
pub use registry::{FunctionParameter, FunctionRegistry, FunctionSignature, ScriptLanguage};
