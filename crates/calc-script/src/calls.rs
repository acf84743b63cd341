//! Call-site and control-flow validation.
//!
//! Locates `name(...)` calls and `if|switch|while|for|catch (...)` headers in the token stream,
//! extracts their balanced argument/condition text, then:
//! - arity-checks calls against script-declared functions and the function registry
//! - classifies each top-level argument and reports empty or malformed ones
//! - validates control-flow headers per keyword

use crate::analysis::AnalysisContext;
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity};
use crate::error::AnalysisError;
use crate::lexer::{Token, TokenKind, TokenStream, tokenize};
use crate::processing::Analyzer;
use crate::resolver::is_free_read;
use calc_script_lang::{ScriptLanguage, is_identifier};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static FOR_IN_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:var|let|const)\s+)?([A-Za-z_$][\w$]*|\[[^\]]*\]|\{[^}]*\})\s+(?:in|of)\s+(\S.*?)\s*$",
    )
    .expect("for-in/of regex")
});

/// A call or control-flow header found in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallSite {
    /// Callee name or control-flow keyword.
    pub name: String,
    /// Text between the parentheses, verbatim.
    pub raw_argument_text: String,
    /// Byte offset of the name.
    pub start_offset: usize,
    /// Byte offset just past the opening parenthesis.
    pub argument_start_offset: usize,
    /// `true` for `if`, `switch`, `while`, `for` and `catch`.
    pub is_control_flow: bool,
    /// `true` when the callee is a property (`obj.name(...)`).
    pub is_member: bool,
}

/// One top-level argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument text, trimmed.
    pub text: String,
    /// Byte offset of the first non-whitespace character (or of the separator slot when empty).
    pub start_offset: usize,
}

impl Argument {
    /// Byte offset just past the argument.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.text.len()
    }
}

/// Shape of an argument expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentKind {
    /// String or template literal.
    String,
    /// Numeric literal, optionally signed.
    Number,
    /// `true` / `false`.
    Boolean,
    /// `null` / `undefined`.
    Null,
    /// `[ ... ]`.
    ArrayLiteral,
    /// `{ ... }`.
    ObjectLiteral,
    /// `f(...)` or `a.b.f(...)`.
    NestedCall,
    /// Anything else that looks well-formed.
    Expression,
    /// A single identifier that resolves.
    KnownIdentifier,
    /// A single identifier that does not resolve.
    UnknownIdentifier,
    /// Malformed (dangling operator, stray separator, ...).
    Invalid,
    /// Nothing between separators.
    Empty,
}

/// Find every closed call site and control-flow header.
///
/// Function declarations, method definitions and keyword-parenthesis forms such as
/// `typeof(x)` are not call sites. Calls whose parenthesis is never closed are skipped; the
/// bracket matcher reports them.
pub fn find_call_sites(
    source: &str,
    tokens: &TokenStream,
    language: &ScriptLanguage,
) -> Vec<FunctionCallSite> {
    let all = tokens.tokens();
    let mut sites = Vec::new();

    for (idx, token) in all.iter().enumerate() {
        if !token.is_identifier() || !all.get(idx + 1).is_some_and(|t| t.is_punct('(')) {
            continue;
        }
        let Some(close) = tokens.partner(idx + 1) else {
            continue;
        };

        let name = token.text(source);
        let is_control_flow = language.is_control_flow_keyword(name);
        let prev = idx.checked_sub(1).map(|p| all[p]);
        let is_member = prev.is_some_and(|p| is_member_access(&p, source));

        if !is_control_flow && !is_member {
            if language.is_keyword(name) {
                continue;
            }
            if prev.is_some_and(|p| p.text(source) == "function") {
                continue;
            }
            // `name(params) { ... }` defines a method.
            if all.get(close + 1).is_some_and(|t| t.is_punct('{')) {
                continue;
            }
        }

        let open = all[idx + 1];
        let argument_start_offset = open.end;
        sites.push(FunctionCallSite {
            name: name.to_string(),
            raw_argument_text: source[argument_start_offset..all[close].start].to_string(),
            start_offset: token.start,
            argument_start_offset,
            is_control_flow,
            is_member,
        });
    }

    sites
}

fn is_member_access(token: &Token, source: &str) -> bool {
    token.is_punct('.') || (token.kind == TokenKind::Operator && token.text(source) == "?.")
}

/// Split argument text on top-level commas.
///
/// Commas nested in `()`, `[]`, `{}`, string/template/regex literals or comments do not split.
/// Blank text yields no arguments; otherwise there is one argument per comma plus one.
pub fn split_arguments(text: &str, base_offset: usize) -> Vec<Argument> {
    split_top_level(text, base_offset, ',')
}

/// Split `text` on a top-level separator punctuation token.
///
/// The text is tokenized on its own, so separators inside literals and comments never count.
pub fn split_top_level(text: &str, base_offset: usize, separator: char) -> Vec<Argument> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut segment_start = 0;

    for token in tokenize(text) {
        match token.kind {
            TokenKind::Punct('(' | '[' | '{') => depth += 1,
            TokenKind::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            TokenKind::Punct(c) if c == separator && depth == 0 => {
                parts.push(segment(text, segment_start, token.start, base_offset));
                segment_start = token.end;
            }
            _ => {}
        }
    }
    parts.push(segment(text, segment_start, text.len(), base_offset));
    parts
}

fn segment(text: &str, start: usize, end: usize, base_offset: usize) -> Argument {
    let raw = &text[start..end];
    let leading = raw.len() - raw.trim_start().len();
    Argument {
        text: raw.trim().to_string(),
        start_offset: base_offset + start + leading,
    }
}

/// Classify one argument using the tokens it covers.
pub fn classify_argument(ctx: &AnalysisContext<'_>, argument: &Argument) -> ArgumentKind {
    let stream = ctx.tokens();
    let first = stream.index_at(argument.start_offset);
    let last = stream.index_at(argument.end_offset());
    if first >= last {
        return ArgumentKind::Empty;
    }

    let source = ctx.source();
    let tokens = &stream.tokens()[first..last];
    let text_of = |t: &Token| t.text(source);

    if let [single] = tokens {
        return match single.kind {
            TokenKind::String { .. } | TokenKind::Template { .. } => ArgumentKind::String,
            TokenKind::Number => ArgumentKind::Number,
            TokenKind::Regex => ArgumentKind::Expression,
            TokenKind::Identifier => match text_of(single) {
                "true" | "false" => ArgumentKind::Boolean,
                "null" | "undefined" => ArgumentKind::Null,
                name if ctx.is_known(name, single.start) => ArgumentKind::KnownIdentifier,
                _ => ArgumentKind::UnknownIdentifier,
            },
            _ => ArgumentKind::Invalid,
        };
    }

    if let [sign, number] = tokens
        && matches!(text_of(sign), "-" | "+")
        && number.kind == TokenKind::Number
    {
        return ArgumentKind::Number;
    }

    if is_malformed(tokens, source) {
        return ArgumentKind::Invalid;
    }

    let closes_at_end = |open: usize| stream.partner(first + open) == Some(last - 1);
    if tokens[0].is_punct('[') && closes_at_end(0) {
        return ArgumentKind::ArrayLiteral;
    }
    if tokens[0].is_punct('{') && closes_at_end(0) {
        return ArgumentKind::ObjectLiteral;
    }
    if tokens[tokens.len() - 1].is_punct(')')
        && let Some(open) = stream.partner(last - 1)
        && open > first
        && is_member_chain(&tokens[..open - first])
    {
        return ArgumentKind::NestedCall;
    }

    ArgumentKind::Expression
}

/// `a` or `a.b.c`.
fn is_member_chain(tokens: &[Token]) -> bool {
    tokens.len() % 2 == 1
        && tokens.iter().enumerate().all(|(i, t)| {
            if i % 2 == 0 {
                t.is_identifier()
            } else {
                t.is_punct('.')
            }
        })
}

fn is_malformed(tokens: &[Token], source: &str) -> bool {
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return false;
    };

    let leading_binary = match first.kind {
        TokenKind::Operator => !matches!(
            first.text(source),
            "+" | "-" | "!" | "~" | "++" | "--" | "..."
        ),
        TokenKind::Punct(c) => matches!(c, ')' | ']' | '}' | ';' | ':' | ',' | '.' | '?'),
        TokenKind::Unknown => true,
        _ => false,
    };
    let trailing_operator = match last.kind {
        TokenKind::Operator => !matches!(last.text(source), "++" | "--"),
        TokenKind::Punct(c) => matches!(c, '.' | '?' | ':' | ';' | ','),
        TokenKind::Unknown => true,
        _ => false,
    };
    let stray_separator = tokens.iter().any(|t| t.is_punct(';'));

    leading_binary || trailing_operator || stray_separator
}

/// Validates call arity, argument shape and control-flow headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSiteValidator;

impl Analyzer for CallSiteValidator {
    fn name(&self) -> &'static str {
        "call-sites"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Diagnostic>, AnalysisError> {
        let mut diagnostics = Vec::new();
        for site in find_call_sites(ctx.source(), ctx.tokens(), ctx.language()) {
            if site.is_control_flow {
                validate_control_flow(ctx, &site, &mut diagnostics);
            } else {
                validate_call(ctx, &site, &mut diagnostics);
            }
        }
        Ok(diagnostics)
    }
}

fn semantic(
    ctx: &AnalysisContext<'_>,
    start: usize,
    end: usize,
    severity: DiagnosticSeverity,
    message: String,
) -> Diagnostic {
    ctx.diagnostic(start, end, severity, DiagnosticCategory::Semantic, message)
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Required and maximum argument counts of a callee, if it has a known signature.
fn arity_of(ctx: &AnalysisContext<'_>, name: &str, offset: usize) -> Option<(usize, Option<usize>)> {
    if let Some(declared) = ctx.scopes().function_at(name, offset) {
        return Some((declared.required_count(), declared.max_count()));
    }
    // A visible variable of the same name shadows the registry.
    if ctx.scopes().is_visible(name, offset) {
        return None;
    }
    ctx.language()
        .function(name)
        .map(|sig| (sig.required_count(), Some(sig.total_count())))
}

fn validate_call(ctx: &AnalysisContext<'_>, site: &FunctionCallSite, out: &mut Vec<Diagnostic>) {
    let name = site.name.as_str();
    let name_end = site.start_offset + name.len();
    let arguments = split_arguments(&site.raw_argument_text, site.argument_start_offset);

    if !site.is_member {
        match arity_of(ctx, name, site.start_offset) {
            Some((required, max)) => {
                let provided = arguments.len();
                if provided < required {
                    out.push(semantic(
                        ctx,
                        site.start_offset,
                        name_end,
                        DiagnosticSeverity::Error,
                        format!(
                            "Function '{name}' requires at least {}, {provided} provided",
                            plural(required, "argument")
                        ),
                    ));
                } else if let Some(max) = max
                    && provided > max
                {
                    out.push(semantic(
                        ctx,
                        site.start_offset,
                        name_end,
                        DiagnosticSeverity::Warning,
                        format!(
                            "Function '{name}' accepts at most {}, {provided} provided",
                            plural(max, "argument")
                        ),
                    ));
                }
            }
            None if !ctx.is_known(name, site.start_offset) => out.push(semantic(
                ctx,
                site.start_offset,
                name_end,
                DiagnosticSeverity::Warning,
                format!("Undefined function '{name}'"),
            )),
            None => {}
        }
    }

    for (position, argument) in arguments.iter().enumerate() {
        let position = position + 1;
        match classify_argument(ctx, argument) {
            ArgumentKind::Empty => out.push(semantic(
                ctx,
                argument.start_offset,
                argument.start_offset + 1,
                DiagnosticSeverity::Error,
                format!("Empty argument at position {position} in call to '{name}'"),
            )),
            ArgumentKind::Invalid => out.push(semantic(
                ctx,
                argument.start_offset,
                argument.end_offset(),
                DiagnosticSeverity::Error,
                format!(
                    "Invalid argument at position {position} in call to '{name}': '{}'",
                    argument.text
                ),
            )),
            ArgumentKind::UnknownIdentifier => out.push(semantic(
                ctx,
                argument.start_offset,
                argument.end_offset(),
                DiagnosticSeverity::Warning,
                format!("Undefined variable '{}'", argument.text),
            )),
            _ => {}
        }
    }
}

fn validate_control_flow(
    ctx: &AnalysisContext<'_>,
    site: &FunctionCallSite,
    out: &mut Vec<Diagnostic>,
) {
    let keyword = site.name.as_str();
    let keyword_end = site.start_offset + keyword.len();
    let text = site.raw_argument_text.as_str();
    let body_start = site.argument_start_offset;
    let body_end = body_start + text.len();

    match keyword {
        "catch" => {
            let binding = text.trim();
            if !is_identifier(binding) || ctx.language().is_keyword(binding) {
                out.push(semantic(
                    ctx,
                    site.start_offset,
                    keyword_end,
                    DiagnosticSeverity::Error,
                    format!("Invalid catch binding '{binding}': expected an identifier"),
                ));
            }
        }
        "for" => {
            let clauses = split_top_level(text, body_start, ';');
            match clauses.len() {
                3 => check_reads(ctx, body_start, body_end, out),
                1 => match FOR_IN_OF.captures(text) {
                    Some(caps) => {
                        if let Some(iterated) = caps.get(2) {
                            check_reads(
                                ctx,
                                body_start + iterated.start(),
                                body_start + iterated.end(),
                                out,
                            );
                        }
                    }
                    None => out.push(semantic(
                        ctx,
                        site.start_offset,
                        keyword_end,
                        DiagnosticSeverity::Error,
                        "Malformed 'for' header: expected three clauses or 'x in/of y'"
                            .to_string(),
                    )),
                },
                _ => out.push(semantic(
                    ctx,
                    site.start_offset,
                    keyword_end,
                    DiagnosticSeverity::Error,
                    "Malformed 'for' header: expected three clauses or 'x in/of y'".to_string(),
                )),
            }
        }
        _ => {
            if text.trim().is_empty() {
                out.push(semantic(
                    ctx,
                    site.start_offset,
                    keyword_end,
                    DiagnosticSeverity::Error,
                    format!("Missing condition in '{keyword}' statement"),
                ));
            } else {
                check_reads(ctx, body_start, body_end, out);
            }
        }
    }
}

/// Report unresolved free identifiers in `start..end`.
fn check_reads(ctx: &AnalysisContext<'_>, start: usize, end: usize, out: &mut Vec<Diagnostic>) {
    let stream = ctx.tokens();
    let first = stream.index_at(start);
    let last = stream.index_at(end);
    for idx in first..last {
        let Some(token) = stream.get(idx) else {
            break;
        };
        let name = token.text(ctx.source());
        if is_free_read(ctx, idx) && !ctx.is_known(name, token.start) {
            out.push(semantic(
                ctx,
                token.start,
                token.end,
                DiagnosticSeverity::Warning,
                format!("Undefined variable '{name}'"),
            ));
        }
    }
}
