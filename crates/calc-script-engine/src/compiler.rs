//! External script compiler collaborator.
//!
//! The compiler is the authoritative (but slow, full-script) check run after the static
//! analyzers. It receives `prelude + user text` and either accepts it or reports a free-form
//! message. The line/column are located in that message by pattern matching and mapped back to
//! user coordinates through the [`Prelude`].

use crate::prelude::Prelude;
use calc_script::{Diagnostic, DiagnosticCategory, DiagnosticSeverity};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// `... at line 12, col 5` / `line 12, column 5`
static LINE_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bline\s+(\d+)\s*,\s*col(?:umn)?\s+(\d+)").expect("valid regex")
});

/// `Line 12: ...`
static LINE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bLine\s+(\d+)\s*:").expect("valid regex"));

/// Outcome of a failed compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{message}")]
    /// The script was rejected. `message` is the compiler's own text.
    Syntax {
        /// Compiler message, usually embedding a line (and column).
        message: String,
    },

    #[error("compiler unavailable: {0}")]
    /// The compiler could not run at all.
    Unavailable(String),
}

/// A compiler that can check a complete script.
pub trait ScriptCompiler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Compile (without running) `script`.
    fn compile(&self, script: &str) -> Result<(), CompileError>;
}

/// Accepts every script. Used when no real compiler is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCompiler;

impl ScriptCompiler for NoopCompiler {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn compile(&self, _script: &str) -> Result<(), CompileError> {
        Ok(())
    }
}

/// Parse-only compile check backed by the Boa JavaScript engine.
#[cfg(feature = "boa")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BoaCompiler;

#[cfg(feature = "boa")]
impl ScriptCompiler for BoaCompiler {
    fn name(&self) -> &'static str {
        "boa"
    }

    fn compile(&self, script: &str) -> Result<(), CompileError> {
        use boa_engine::{Context, Script, Source};

        let mut context = Context::default();
        Script::parse(Source::from_bytes(script.as_bytes()), None, &mut context)
            .map(|_| ())
            .map_err(|err| CompileError::Syntax {
                message: err.to_string(),
            })
    }
}

/// Locate a 1-based `(line, column)` inside a compiler message.
///
/// Two phrasings are accepted: `line N, col M` (case-insensitive, `column` also allowed) and
/// `Line N:`. The column is `None` for the second form.
pub fn parse_error_location(message: &str) -> Option<(u32, Option<u32>)> {
    if let Some(caps) = LINE_COLUMN.captures(message) {
        let line = caps[1].parse().ok()?;
        let column = caps[2].parse().ok();
        return Some((line, column));
    }
    let caps = LINE_PREFIX.captures(message)?;
    Some((caps[1].parse().ok()?, None))
}

/// Turn a compiler message into a diagnostic in user coordinates.
///
/// Returns `None` when no location can be found or it falls inside the prelude.
pub fn remap_compile_error(message: &str, prelude: &Prelude) -> Option<Diagnostic> {
    let Some((script_line, column)) = parse_error_location(message) else {
        debug!(%message, "compiler message has no location; dropped");
        return None;
    };
    let Some(line) = prelude.user_line(script_line) else {
        debug!(
            script_line,
            prelude_lines = prelude.line_count(),
            "compiler location inside prelude; dropped"
        );
        return None;
    };
    Some(Diagnostic::new(
        line,
        column.unwrap_or(1).max(1),
        DiagnosticSeverity::Error,
        DiagnosticCategory::Engine,
        message.trim(),
    ))
}
