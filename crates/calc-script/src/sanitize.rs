//! Source sanitizer.
//!
//! Blanks out the *contents* of comments and string literals so that pattern matching over the
//! result never sees brackets, keywords or identifiers that live inside literals.
//!
//! Guarantees:
//! - the output has exactly the same byte length as the input (every blanked character becomes
//!   as many spaces as its UTF-8 encoding is long), so byte offsets map 1:1
//! - line terminators are never blanked, so line numbers map 1:1 as well
//! - comment markers (`//`, `/*`, `*/`) and quote characters are kept as-is

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str(char),
}

/// Sanitize `source`, returning a same-length string.
pub fn sanitize(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Code => {
                out.push(ch);
                match ch {
                    '/' if chars.peek() == Some(&'/') => {
                        chars.next();
                        out.push('/');
                        state = State::LineComment;
                    }
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        out.push('*');
                        state = State::BlockComment;
                    }
                    '"' | '\'' | '`' => state = State::Str(ch),
                    _ => {}
                }
            }
            State::LineComment => {
                if ch == '\n' || ch == '\r' {
                    out.push(ch);
                    state = State::Code;
                } else {
                    blank(&mut out, ch);
                }
            }
            State::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("*/");
                    state = State::Code;
                } else {
                    blank(&mut out, ch);
                }
            }
            State::Str(quote) => {
                if ch == quote {
                    out.push(ch);
                    state = State::Code;
                } else if ch == '\\' {
                    blank(&mut out, ch);
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if (ch == '\n' || ch == '\r') && quote != '`' {
                    // Unterminated single-line string: the literal ends at the line break.
                    out.push(ch);
                    state = State::Code;
                } else {
                    blank(&mut out, ch);
                }
            }
        }
    }

    out
}

/// Replace every character inside `spans` with spaces, preserving byte length and line breaks.
///
/// Used to hide regular-expression literal bodies (found by the tokenizer) from the sanitizer,
/// which has no notion of regex syntax.
pub fn blank_spans(source: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(source.len());
    for (offset, ch) in source.char_indices() {
        if spans.iter().any(|span| span.contains(&offset)) {
            blank(&mut out, ch);
        } else {
            out.push(ch);
        }
    }
    out
}

fn blank(out: &mut String, ch: char) {
    if ch == '\n' || ch == '\r' {
        out.push(ch);
        return;
    }
    for _ in 0..ch.len_utf8() {
        out.push(' ');
    }
}
