//! Stack-based bracket matcher.
//!
//! Runs over sanitized text (see [`crate::sanitize`]) so brackets inside strings and comments are
//! never seen. Recovery strategy on a closer that does not match the top of the stack:
//! - if a deeper frame expects this closer, every frame above it is reported as unclosed and
//!   dropped, and the deeper frame is popped
//! - otherwise a mismatch is reported and the stack is left intact

use crate::analysis::AnalysisContext;
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity};
use crate::error::AnalysisError;
use crate::lexer::closer_for;
use crate::line_index::LineIndex;
use crate::processing::Analyzer;

#[derive(Debug, Clone, Copy)]
struct Frame {
    open: char,
    close: char,
    offset: usize,
}

/// Report unmatched, mismatched and unclosed brackets.
///
/// Balanced input produces no diagnostics.
pub fn match_brackets(sanitized: &str, line_index: &LineIndex) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let report = |offset: usize, message: String| {
        let pos = line_index.position(offset);
        Diagnostic::new(
            pos.line,
            pos.column,
            DiagnosticSeverity::Error,
            DiagnosticCategory::Structural,
            message,
        )
    };

    for (offset, ch) in sanitized.char_indices() {
        match ch {
            '(' | '[' | '{' => stack.push(Frame {
                open: ch,
                close: closer_for(ch),
                offset,
            }),
            ')' | ']' | '}' => {
                let Some(&top) = stack.last() else {
                    diagnostics.push(report(offset, format!("Unexpected closing bracket '{ch}'")));
                    continue;
                };

                if top.close == ch {
                    stack.pop();
                    continue;
                }

                match stack.iter().rposition(|frame| frame.close == ch) {
                    Some(depth) => {
                        for skipped in stack.drain(depth + 1..) {
                            diagnostics.push(report(
                                skipped.offset,
                                format!("Unclosed bracket '{}'", skipped.open),
                            ));
                        }
                        stack.pop();
                    }
                    None => diagnostics.push(report(
                        offset,
                        format!(
                            "Bracket mismatch: expected '{}' but found '{ch}'",
                            top.close
                        ),
                    )),
                }
            }
            _ => {}
        }
    }

    for frame in stack {
        diagnostics.push(report(
            frame.offset,
            format!("Unclosed bracket '{}'", frame.open),
        ));
    }

    diagnostics
}

/// [`Analyzer`] wrapper around [`match_brackets`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketMatcher;

impl Analyzer for BracketMatcher {
    fn name(&self) -> &'static str {
        "brackets"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Diagnostic>, AnalysisError> {
        Ok(match_brackets(ctx.sanitized(), ctx.line_index()))
    }
}
