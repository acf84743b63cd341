//! Diagnostic data model.
//!
//! A full analysis pass produces a fresh, ordered `Vec<Diagnostic>`; diagnostics are never
//! patched incrementally. Hosts use them for:
//! - underlines (`line`, `column`, `length`)
//! - hover tooltips / problems panels (`message`, `severity`)
//! - status summaries (see [`summarize`])

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    /// The script will most likely fail or misbehave.
    Error,
    /// Suspicious code that may be intentional.
    Warning,
    /// Style suggestions.
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        };
        f.write_str(text)
    }
}

/// Which analysis layer produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    /// Malformed literals (e.g. unterminated strings).
    Lexical,
    /// Bracket structure.
    Structural,
    /// Names, arity and control-flow headers.
    Semantic,
    /// Style and likely-mistake hints.
    Stylistic,
    /// Reported by the external script compiler.
    Engine,
}

/// A single reported issue in user-code coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, in Unicode scalar values (`char`).
    pub column: u32,
    /// Number of characters to underline (at least 1).
    pub length: u32,
    /// Human-readable message.
    pub message: String,
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// Producing layer.
    pub category: DiagnosticCategory,
}

impl Diagnostic {
    /// Create a diagnostic with an underline length of 1.
    pub fn new(
        line: u32,
        column: u32,
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line,
            column,
            length: 1,
            message: message.into(),
            severity,
            category,
        }
    }

    /// Set the underline length (clamped to at least 1).
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length.max(1);
        self
    }

    /// Returns `true` for [`DiagnosticSeverity::Error`].
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.severity, self.message
        )
    }
}

/// Per-severity counts of a diagnostic set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    /// Number of errors.
    pub errors: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Number of infos.
    pub infos: usize,
}

impl DiagnosticCounts {
    /// Count diagnostics by severity.
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let mut counts = Self::default();
        for diagnostic in diagnostics {
            match diagnostic.severity {
                DiagnosticSeverity::Error => counts.errors += 1,
                DiagnosticSeverity::Warning => counts.warnings += 1,
                DiagnosticSeverity::Info => counts.infos += 1,
            }
        }
        counts
    }

    /// Total number of diagnostics.
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}

impl fmt::Display for DiagnosticCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            return f.write_str("No problems found");
        }

        let mut parts = Vec::new();
        for (count, singular, plural) in [
            (self.errors, "error", "errors"),
            (self.warnings, "warning", "warnings"),
            (self.infos, "info", "infos"),
        ] {
            match count {
                0 => {}
                1 => parts.push(format!("1 {singular}")),
                n => parts.push(format!("{n} {plural}")),
            }
        }
        f.write_str(&parts.join(", "))
    }
}

/// Human-readable status line, e.g. `"2 errors, 1 warning"`.
pub fn summarize(diagnostics: &[Diagnostic]) -> String {
    DiagnosticCounts::from_diagnostics(diagnostics).to_string()
}
