#![warn(missing_docs)]
//! Calc Script - Static Analysis Core for Calculator Scripts
//!
//! # Overview
//!
//! `calc-script` gives live feedback on small JavaScript-like calculator formulas without ever
//! executing them: bracket structure, unknown identifiers, wrong argument counts, malformed
//! control-flow headers and a handful of stylistic hints. It does not build a full syntax tree;
//! it reconstructs just enough structure (tokens, brackets, scopes) to answer scope and arity
//! questions, and is tolerant of half-typed input.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Analysis / AnalysisSnapshot                │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Analyzers (brackets, calls, identifiers,   │  ← Diagnostics
//! │  lexical, style)                            │
//! ├─────────────────────────────────────────────┤
//! │  Scope Tree (arena)                         │  ← Visibility
//! ├─────────────────────────────────────────────┤
//! │  Sanitizer + Tokenizer                      │  ← Structure
//! ├─────────────────────────────────────────────┤
//! │  Line Index (Rope-based)                    │  ← Positions
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use calc_script::analyze;
//! use calc_script_lang::{CalculatorParameter, DataType, ParameterSet, ScriptLanguage};
//!
//! let language = ScriptLanguage::dosage_calculator();
//! let params = ParameterSet::new().with(CalculatorParameter::new("weight", DataType::Number));
//!
//! let snapshot = analyze("var dose = dosePerKg(5, weight);\naddWarning('x');", &language, &params);
//!
//! assert_eq!(snapshot.diagnostics().len(), 1);
//! assert_eq!(
//!     snapshot.diagnostics()[0].message,
//!     "Function 'addWarning' requires at least 5 arguments, 1 provided"
//! );
//! assert_eq!(snapshot.summary(), "1 error");
//! ```
//!
//! # Module Description
//!
//! - [`sanitize`] - length-preserving comment/literal blanking
//! - [`lexer`] - positioned tokens with bracket partners
//! - [`line_index`] - byte offset to line/column mapping
//! - [`brackets`] - bracket matcher
//! - [`scope`] - arena scope tree and visibility queries
//! - [`calls`] - call-site and control-flow validation
//! - [`resolver`] - identifier resolution
//! - [`style`] - lexical and stylistic checks
//! - [`analysis`] - per-pass context, analyzer orchestration and snapshots

pub mod analysis;
pub mod brackets;
pub mod calls;
pub mod diagnostics;
mod error;
pub mod lexer;
pub mod line_index;
pub mod processing;
pub mod resolver;
pub mod sanitize;
pub mod scope;
pub mod style;

pub use analysis::{Analysis, AnalysisContext, AnalysisOptions, AnalysisSnapshot, analyze};
pub use brackets::{BracketMatcher, match_brackets};
pub use calls::{
    Argument, ArgumentKind, CallSiteValidator, FunctionCallSite, classify_argument,
    find_call_sites, split_arguments,
};
pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticCounts, DiagnosticSeverity, summarize,
};
pub use error::AnalysisError;
pub use lexer::{Token, TokenKind, TokenStream, tokenize};
pub use line_index::{LineIndex, Position};
pub use processing::Analyzer;
pub use resolver::IdentifierResolver;
pub use sanitize::sanitize;
pub use scope::{DeclaredFunction, Scope, ScopeId, ScopeTree};
pub use style::{LexicalChecker, StyleChecker};
