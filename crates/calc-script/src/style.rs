//! Lexical and stylistic checks.

use crate::analysis::AnalysisContext;
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity};
use crate::error::AnalysisError;
use crate::lexer::{Token, TokenKind};
use crate::processing::Analyzer;

/// Reports unterminated string and template literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalChecker;

impl Analyzer for LexicalChecker {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Diagnostic>, AnalysisError> {
        let diagnostics = ctx
            .tokens()
            .tokens()
            .iter()
            .filter_map(|token| {
                let message = match token.kind {
                    TokenKind::String {
                        terminated: false, ..
                    } => "Unterminated string literal",
                    TokenKind::Template { terminated: false } => "Unterminated template literal",
                    _ => return None,
                };
                Some(ctx.diagnostic(
                    token.start,
                    token.end,
                    DiagnosticSeverity::Error,
                    DiagnosticCategory::Lexical,
                    message,
                ))
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Advisory checks: loose null equality, mixed quote styles, `while (true)` without an exit, and
/// likely missing semicolons.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleChecker;

impl Analyzer for StyleChecker {
    fn name(&self) -> &'static str {
        "style"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Diagnostic>, AnalysisError> {
        let mut diagnostics = Vec::new();
        loose_null_equality(ctx, &mut diagnostics);
        mixed_quotes(ctx, &mut diagnostics);
        infinite_while(ctx, &mut diagnostics);
        missing_semicolons(ctx, &mut diagnostics);
        Ok(diagnostics)
    }
}

fn stylistic(
    ctx: &AnalysisContext<'_>,
    token: &Token,
    severity: DiagnosticSeverity,
    message: String,
) -> Diagnostic {
    ctx.diagnostic(
        token.start,
        token.end,
        severity,
        DiagnosticCategory::Stylistic,
        message,
    )
}

fn loose_null_equality(ctx: &AnalysisContext<'_>, out: &mut Vec<Diagnostic>) {
    let source = ctx.source();
    let tokens = ctx.tokens().tokens();
    for (idx, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Operator {
            continue;
        }
        let op = token.text(source);
        let strict = match op {
            "==" => "===",
            "!=" => "!==",
            _ => continue,
        };
        let operand = [idx.checked_sub(1), Some(idx + 1)]
            .into_iter()
            .flatten()
            .filter_map(|i| tokens.get(i))
            .map(|t| t.text(source))
            .find(|text| matches!(*text, "null" | "undefined"));
        if let Some(literal) = operand {
            out.push(stylistic(
                ctx,
                token,
                DiagnosticSeverity::Info,
                format!("Use '{strict}' instead of '{op}' when comparing with '{literal}'"),
            ));
        }
    }
}

fn mixed_quotes(ctx: &AnalysisContext<'_>, out: &mut Vec<Diagnostic>) {
    let strings: Vec<(&Token, char)> = ctx
        .tokens()
        .tokens()
        .iter()
        .filter_map(|t| match t.kind {
            TokenKind::String { quote, .. } => Some((t, quote)),
            _ => None,
        })
        .collect();

    let doubles = strings.iter().filter(|(_, q)| *q == '"').count();
    let singles = strings.len() - doubles;
    if doubles == 0 || singles == 0 {
        return;
    }

    // Ties go to the style of the first literal.
    let first_quote = strings[0].1;
    let majority = if doubles > singles || (doubles == singles && first_quote == '"') {
        '"'
    } else {
        '\''
    };
    let Some((token, _)) = strings.iter().find(|(_, q)| *q != majority) else {
        return;
    };
    let style = if majority == '"' { "double" } else { "single" };
    out.push(stylistic(
        ctx,
        token,
        DiagnosticSeverity::Info,
        format!("Mixed quote styles: prefer {style} quotes consistently"),
    ));
}

fn infinite_while(ctx: &AnalysisContext<'_>, out: &mut Vec<Diagnostic>) {
    let source = ctx.source();
    let stream = ctx.tokens();
    let tokens = stream.tokens();

    for (idx, token) in tokens.iter().enumerate() {
        if !token.is_identifier() || token.text(source) != "while" {
            continue;
        }
        let is_true_condition = tokens.get(idx + 1).is_some_and(|t| t.is_punct('('))
            && tokens
                .get(idx + 2)
                .is_some_and(|t| matches!(t.text(source), "true" | "1"))
            && tokens.get(idx + 3).is_some_and(|t| t.is_punct(')'));
        if !is_true_condition {
            continue;
        }
        let body_open = idx + 4;
        if !tokens.get(body_open).is_some_and(|t| t.is_punct('{')) {
            continue;
        }
        let Some(body_close) = stream.partner(body_open) else {
            continue;
        };
        let exits = tokens[body_open..body_close]
            .iter()
            .any(|t| t.is_identifier() && matches!(t.text(source), "break" | "return" | "throw"));
        if !exits {
            out.push(stylistic(
                ctx,
                token,
                DiagnosticSeverity::Warning,
                "Possible infinite loop: 'while (true)' has no 'break' or 'return'".to_string(),
            ));
        }
    }
}

const STATEMENT_KEYWORDS: &[&str] = &[
    "var", "let", "const", "return", "if", "for", "while", "function", "throw", "switch", "try",
    "do", "break", "continue",
];

const VALUE_KEYWORDS: &[&str] = &["this", "true", "false", "null", "undefined"];

fn missing_semicolons(ctx: &AnalysisContext<'_>, out: &mut Vec<Diagnostic>) {
    let source = ctx.source();
    let stream = ctx.tokens();
    let tokens = stream.tokens();
    let language = ctx.language();
    let mut depth = 0usize;

    for idx in 1..tokens.len() {
        let prev = tokens[idx - 1];
        let cur = tokens[idx];
        match prev.kind {
            TokenKind::Punct('(' | '[') => depth += 1,
            TokenKind::Punct(')' | ']') => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth > 0 || !source[prev.end..cur.start].contains('\n') {
            continue;
        }

        let prev_text = prev.text(source);
        let ends_expression = match prev.kind {
            TokenKind::Identifier => {
                !language.is_keyword(prev_text) || VALUE_KEYWORDS.contains(&prev_text)
            }
            TokenKind::Number
            | TokenKind::String { .. }
            | TokenKind::Template { .. }
            | TokenKind::Regex => true,
            TokenKind::Punct(']') => true,
            TokenKind::Punct(')') => !closes_header(ctx, idx - 1),
            TokenKind::Operator => matches!(prev_text, "++" | "--"),
            _ => false,
        };
        if !ends_expression || !cur.is_identifier() {
            continue;
        }
        let cur_text = cur.text(source);
        let starts_statement =
            !language.is_keyword(cur_text) || STATEMENT_KEYWORDS.contains(&cur_text);
        if starts_statement {
            out.push(ctx.diagnostic(
                prev.end,
                prev.end,
                DiagnosticSeverity::Info,
                DiagnosticCategory::Stylistic,
                "Missing semicolon",
            ));
        }
    }
}

/// `)` closing an `if` / `for` / `while` / `switch` / `catch` / `with` header or a function's
/// parameter list.
fn closes_header(ctx: &AnalysisContext<'_>, close: usize) -> bool {
    let stream = ctx.tokens();
    let Some(open) = stream.partner(close) else {
        return false;
    };
    let Some(before) = open.checked_sub(1) else {
        return false;
    };
    let text = ctx.token_text(before);
    if matches!(text, "if" | "for" | "while" | "switch" | "catch" | "with" | "function") {
        return true;
    }
    open >= 2 && ctx.token_text(open - 2) == "function"
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_script_lang::{ParameterSet, ScriptLanguage};
    use pretty_assertions::assert_eq;

    fn run(analyzer: &dyn Analyzer, source: &str) -> Vec<Diagnostic> {
        let language = ScriptLanguage::dosage_calculator();
        let params = ParameterSet::new();
        let ctx = AnalysisContext::new(source, &language, &params);
        analyzer.analyze(&ctx).expect("style checks are infallible")
    }

    fn style_messages(source: &str) -> Vec<String> {
        run(&StyleChecker, source)
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_unterminated_literals() {
        let diags = run(&LexicalChecker, "var a = \"open\nvar b = `tmpl");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "Unterminated string literal");
        assert_eq!((diags[0].line, diags[0].column), (1, 9));
        assert_eq!(diags[0].category, DiagnosticCategory::Lexical);
        assert_eq!(diags[1].message, "Unterminated template literal");
        assert!(run(&LexicalChecker, "var a = 'ok';").is_empty());
    }

    #[test]
    fn test_loose_null_equality() {
        assert_eq!(
            style_messages("if (a == null) { }\nif (undefined != b) { }\nif (a === null) { }"),
            vec![
                "Use '===' instead of '==' when comparing with 'null'",
                "Use '!==' instead of '!=' when comparing with 'undefined'",
            ]
        );
    }

    #[test]
    fn test_mixed_quotes_reports_first_minority_literal() {
        let source = "var a = \"x\";\nvar b = 'y';\nvar c = \"z\";\nvar d = 'w';";
        let diags = run(&StyleChecker, source);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "Mixed quote styles: prefer double quotes consistently"
        );
        assert_eq!((diags[0].line, diags[0].column), (2, 9));
        assert!(style_messages("var a = 'x'; var b = 'y';").is_empty());
    }

    #[test]
    fn test_infinite_while() {
        assert_eq!(
            style_messages("while (true) { tick(); }"),
            vec!["Possible infinite loop: 'while (true)' has no 'break' or 'return'"]
        );
        assert!(style_messages("while (true) { if (done()) { break; } }").is_empty());
        assert!(style_messages("do { step(); } while (true);").is_empty());
    }

    #[test]
    fn test_missing_semicolon() {
        let source = "var total = dose * weight\naddResult('Total', total);\nvar x = 1;";
        let diags = run(&StyleChecker, source);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Missing semicolon");
        assert_eq!((diags[0].line, diags[0].column), (1, 26));
    }

    #[test]
    fn test_no_semicolon_warning_after_headers_or_inside_parens() {
        let source = "if (a)\n  b = 1;\nfunction f()\n{\n}\nf(a,\n  b);\nvar s = a\n  + b;";
        assert!(style_messages(source).is_empty());
    }
}
