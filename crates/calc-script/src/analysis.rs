//! Analysis passes.
//!
//! A pass is a pure function of `(source, language, parameters)`. [`AnalysisContext`] holds the
//! structures every analyzer shares (sanitized text, tokens, scope tree); it is built once per
//! pass and dropped afterwards. The result is an immutable [`AnalysisSnapshot`].

use crate::brackets::BracketMatcher;
use crate::calls::CallSiteValidator;
use crate::diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticCounts, DiagnosticSeverity, summarize,
};
use crate::error::AnalysisError;
use crate::lexer::{TokenKind, TokenStream};
use crate::line_index::LineIndex;
use crate::processing::Analyzer;
use crate::resolver::IdentifierResolver;
use crate::sanitize::{blank_spans, sanitize};
use crate::scope::ScopeTree;
use crate::style::{LexicalChecker, StyleChecker};
use calc_script_lang::{ParameterSet, ScriptLanguage};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

/// Shared, read-only state for one analysis pass.
pub struct AnalysisContext<'a> {
    source: &'a str,
    sanitized: String,
    line_index: LineIndex,
    tokens: TokenStream,
    scopes: ScopeTree,
    language: &'a ScriptLanguage,
    parameters: &'a ParameterSet,
}

impl<'a> AnalysisContext<'a> {
    /// Tokenize, sanitize and build the scope tree for `source`.
    pub fn new(
        source: &'a str,
        language: &'a ScriptLanguage,
        parameters: &'a ParameterSet,
    ) -> Self {
        let tokens = TokenStream::new(source);
        let regex_bodies: Vec<_> = tokens
            .tokens()
            .iter()
            .filter(|t| t.kind == TokenKind::Regex)
            .map(|t| t.start + 1..t.end)
            .collect();
        let sanitized = if regex_bodies.is_empty() {
            sanitize(source)
        } else {
            sanitize(&blank_spans(source, &regex_bodies))
        };
        let scopes = ScopeTree::build(source, &tokens, language);

        Self {
            source,
            sanitized,
            line_index: LineIndex::from_text(source),
            tokens,
            scopes,
            language,
            parameters,
        }
    }

    /// The original source text.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Same-length text with comment and literal contents blanked.
    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }

    /// Offset-to-position mapping for the source.
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Tokens of the source.
    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    /// Scope tree of the source.
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Language registries.
    pub fn language(&self) -> &'a ScriptLanguage {
        self.language
    }

    /// Calculator parameters declared for the document.
    pub fn parameters(&self) -> &'a ParameterSet {
        self.parameters
    }

    /// Text of the token at `index` (empty if out of range).
    pub fn token_text(&self, index: usize) -> &'a str {
        self.tokens
            .get(index)
            .map(|t| t.text(self.source))
            .unwrap_or("")
    }

    /// Build a diagnostic spanning the byte range `start..end`.
    pub fn diagnostic(
        &self,
        start: usize,
        end: usize,
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Diagnostic {
        let pos = self.line_index.position(start);
        let length = self.line_index.char_len(start, end) as u32;
        Diagnostic::new(pos.line, pos.column, severity, category, message).with_length(length)
    }

    /// Returns `true` if `name` needs no declaration at `offset`: a keyword, a built-in global, a
    /// calculator parameter, a registered function, or a name declared in a visible scope.
    pub fn is_known(&self, name: &str, offset: usize) -> bool {
        self.language.is_keyword(name)
            || self.language.is_builtin(name)
            || self.language.is_known_function(name)
            || self.parameters.contains(name)
            || self.scopes.is_visible(name, offset)
    }
}

/// Knobs for an [`Analysis`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Run the stylistic checks (loose null equality, quote mixing, ...).
    pub stylistic_checks: bool,
    /// Keep at most this many diagnostics (in report order).
    pub max_diagnostics: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            stylistic_checks: true,
            max_diagnostics: None,
        }
    }
}

/// The result of one analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSnapshot {
    source: String,
    diagnostics: Vec<Diagnostic>,
    failures: Vec<AnalysisError>,
}

impl AnalysisSnapshot {
    /// The text this snapshot was computed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns `true` if this snapshot was computed from exactly `text`.
    pub fn is_for(&self, text: &str) -> bool {
        self.source == text
    }

    /// Diagnostics, in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the snapshot, returning its diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Analyzers that failed during the pass.
    pub fn failures(&self) -> &[AnalysisError] {
        &self.failures
    }

    /// Diagnostic counts by severity.
    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts::from_diagnostics(&self.diagnostics)
    }

    /// Human-readable summary, e.g. `"2 errors, 1 warning"`.
    pub fn summary(&self) -> String {
        summarize(&self.diagnostics)
    }

    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// An ordered set of analyzers plus options.
pub struct Analysis {
    analyzers: Vec<Box<dyn Analyzer>>,
    options: AnalysisOptions,
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new(AnalysisOptions::default())
    }
}

impl Analysis {
    /// The built-in analyzers, configured by `options`.
    pub fn new(options: AnalysisOptions) -> Self {
        let mut analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(LexicalChecker),
            Box::new(BracketMatcher),
            Box::new(CallSiteValidator),
            Box::new(IdentifierResolver),
        ];
        if options.stylistic_checks {
            analyzers.push(Box::new(StyleChecker));
        }
        Self { analyzers, options }
    }

    /// Append a custom analyzer; it runs after the built-in ones.
    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Names of the configured analyzers, in run order.
    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Run every analyzer over `source`.
    ///
    /// A failing or panicking analyzer is logged and skipped; the others still run. Identical
    /// diagnostics (same position and message) reported by several analyzers are kept once.
    pub fn run(
        &self,
        source: &str,
        language: &ScriptLanguage,
        parameters: &ParameterSet,
    ) -> AnalysisSnapshot {
        let started = Instant::now();
        let ctx = AnalysisContext::new(source, language, parameters);

        let mut diagnostics = Vec::new();
        let mut failures = Vec::new();
        for analyzer in &self.analyzers {
            match run_contained(analyzer.as_ref(), &ctx) {
                Ok(found) => diagnostics.extend(found),
                Err(err) => {
                    warn!(analyzer = err.analyzer(), error = %err, "analyzer failed");
                    failures.push(err);
                }
            }
        }

        let mut diagnostics = dedup(diagnostics);
        if let Some(max) = self.options.max_diagnostics {
            diagnostics.truncate(max);
        }

        debug!(
            bytes = source.len(),
            tokens = ctx.tokens().len(),
            scopes = ctx.scopes().scopes().len(),
            diagnostics = diagnostics.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "analysis pass finished"
        );

        AnalysisSnapshot {
            source: source.to_string(),
            diagnostics,
            failures,
        }
    }
}

/// Analyze `source` with the built-in analyzers and default options.
pub fn analyze(
    source: &str,
    language: &ScriptLanguage,
    parameters: &ParameterSet,
) -> AnalysisSnapshot {
    Analysis::default().run(source, language, parameters)
}

fn run_contained(
    analyzer: &dyn Analyzer,
    ctx: &AnalysisContext<'_>,
) -> Result<Vec<Diagnostic>, AnalysisError> {
    match panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(AnalysisError::Panicked {
            analyzer: analyzer.name(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn dedup(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    diagnostics
        .into_iter()
        .filter(|d| d.line > 0 && seen.insert((d.line, d.column, d.message.clone())))
        .collect()
}
