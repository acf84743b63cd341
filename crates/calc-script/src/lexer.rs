//! Tokenizer producing positioned tokens.
//!
//! This is not a standards-compliant lexer; it recognizes just enough structure for the scope
//! builder and the validators to reason about identifiers, calls and brackets without
//! re-deriving it from several independent pattern scans.
//!
//! Comments and whitespace are dropped. Offsets are byte offsets into the original source.

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Identifier,
    /// Numeric literal.
    Number,
    /// Single- or double-quoted string literal.
    String {
        /// The opening quote character.
        quote: char,
        /// Whether a closing quote was found before the end of the line.
        terminated: bool,
    },
    /// Back-tick template literal (may span lines).
    Template {
        /// Whether a closing back-tick was found.
        terminated: bool,
    },
    /// Regular expression literal.
    Regex,
    /// One of `( ) { } [ ] , ; . : ?`.
    Punct(char),
    /// Operator (`=`, `===`, `=>`, `+=`, `&&`, ...).
    Operator,
    /// Any other character.
    Unknown,
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Classification.
    pub kind: TokenKind,
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Token {
    /// The token text.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Returns `true` if this is the given punctuation character.
    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct(ch)
    }

    /// Returns `true` for identifiers (including keywords).
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Returns `true` for string, template, number and regex literals.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number
                | TokenKind::String { .. }
                | TokenKind::Template { .. }
                | TokenKind::Regex
        )
    }
}

const OPERATORS: &[&str] = &[
    ">>>=", "===", "!==", "**=", "<<=", ">>=", ">>>", "...", "&&=", "||=", "??=", "==", "!=", "<=",
    ">=", "=>", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "&&", "||", "??", "?.", "++", "--",
    "**", "<<", ">>", "=", "+", "-", "*", "/", "%", "<", ">", "!", "&", "|", "^", "~",
];

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(ch) = self.peek_char() {
            let start = self.pos;
            match ch {
                c if c.is_whitespace() => self.bump(c),
                '/' if self.byte_at(start + 1) == Some(b'/') => self.skip_line_comment(),
                '/' if self.byte_at(start + 1) == Some(b'*') => self.skip_block_comment(),
                '/' if self.regex_allowed() => self.lex_regex(start),
                '"' | '\'' => self.lex_string(start, ch),
                '`' => self.lex_template(start),
                c if c.is_ascii_digit() => self.lex_number(start),
                '.' if self.byte_at(start + 1).is_some_and(|b| b.is_ascii_digit()) => {
                    self.lex_number(start)
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => self.lex_identifier(start),
                '(' | ')' | '{' | '}' | '[' | ']' | ',' | ';' | ':' => {
                    self.bump(ch);
                    self.push(TokenKind::Punct(ch), start);
                }
                _ => self.lex_operator(start, ch),
            }
        }
        self.tokens
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn byte_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    fn bump(&mut self, ch: char) {
        self.pos += ch.len_utf8();
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
        });
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.bump(ch);
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        match self.source[self.pos..].find("*/") {
            Some(rel) => self.pos += rel + 2,
            None => self.pos = self.source.len(),
        }
    }

    fn lex_string(&mut self, start: usize, quote: char) {
        self.bump(quote);
        let mut terminated = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '\\' => {
                    self.bump(ch);
                    if let Some(escaped) = self.peek_char() {
                        self.bump(escaped);
                    }
                }
                '\n' | '\r' => break,
                c if c == quote => {
                    self.bump(c);
                    terminated = true;
                    break;
                }
                c => self.bump(c),
            }
        }
        self.push(TokenKind::String { quote, terminated }, start);
    }

    fn lex_template(&mut self, start: usize) {
        self.bump('`');
        let mut terminated = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '\\' => {
                    self.bump(ch);
                    if let Some(escaped) = self.peek_char() {
                        self.bump(escaped);
                    }
                }
                '`' => {
                    self.bump(ch);
                    terminated = true;
                    break;
                }
                c => self.bump(c),
            }
        }
        self.push(TokenKind::Template { terminated }, start);
    }

    fn lex_regex(&mut self, start: usize) {
        self.bump('/');
        let mut in_class = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '\\' => {
                    self.bump(ch);
                    if let Some(escaped) = self.peek_char()
                        && escaped != '\n'
                    {
                        self.bump(escaped);
                    }
                }
                '\n' | '\r' => break,
                '[' => {
                    in_class = true;
                    self.bump(ch);
                }
                ']' => {
                    in_class = false;
                    self.bump(ch);
                }
                '/' if !in_class => {
                    self.bump(ch);
                    break;
                }
                c => self.bump(c),
            }
        }
        while let Some(ch) = self.peek_char() {
            if !ch.is_ascii_alphabetic() {
                break;
            }
            self.bump(ch);
        }
        self.push(TokenKind::Regex, start);
    }

    fn lex_number(&mut self, start: usize) {
        let rest = &self.bytes[start..];
        let radix_prefix = rest.len() > 1
            && rest[0] == b'0'
            && matches!(rest[1], b'x' | b'X' | b'b' | b'B' | b'o' | b'O');
        if radix_prefix {
            self.pos += 2;
            while self
                .byte_at(self.pos)
                .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
            {
                self.pos += 1;
            }
        } else {
            while let Some(b) = self.byte_at(self.pos) {
                let exponent_sign = (b == b'+' || b == b'-')
                    && matches!(self.byte_at(self.pos - 1), Some(b'e' | b'E'));
                if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || exponent_sign {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn lex_identifier(&mut self, start: usize) {
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.bump(ch);
            } else {
                break;
            }
        }
        self.push(TokenKind::Identifier, start);
    }

    fn lex_operator(&mut self, start: usize, ch: char) {
        let rest = &self.source[start..];
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            // `a?.5:b` is a ternary, not optional chaining.
            let is_ternary_decimal = *op == "?."
                && self
                    .byte_at(start + 2)
                    .is_some_and(|b| b.is_ascii_digit());
            if !is_ternary_decimal {
                self.pos += op.len();
                self.push(TokenKind::Operator, start);
                return;
            }
        }

        self.bump(ch);
        let kind = match ch {
            '.' | '?' => TokenKind::Punct(ch),
            _ => TokenKind::Unknown,
        };
        self.push(kind, start);
    }

    /// A `/` starts a regex literal when it cannot be a division operator.
    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.last() else {
            return true;
        };
        match prev.kind {
            TokenKind::Identifier => matches!(
                prev.text(self.source),
                "return" | "typeof" | "case" | "do" | "else" | "in" | "of" | "new" | "delete"
                    | "void" | "throw"
            ),
            TokenKind::Number
            | TokenKind::String { .. }
            | TokenKind::Template { .. }
            | TokenKind::Regex => false,
            TokenKind::Punct(c) => !matches!(c, ')' | ']' | '}'),
            TokenKind::Operator => !matches!(prev.text(self.source), "++" | "--"),
            TokenKind::Unknown => true,
        }
    }
}

/// Tokens plus precomputed bracket partners.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    partners: Vec<Option<usize>>,
}

impl TokenStream {
    /// Tokenize `source` and pair up brackets.
    pub fn new(source: &str) -> Self {
        Self::from_tokens(tokenize(source))
    }

    /// Pair up brackets in an existing token list.
    ///
    /// Pairing tolerates mismatches: a closer pairs with the nearest open bracket of its kind,
    /// dropping any unmatched openers above it; a closer with no such opener stays unpaired.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut partners = vec![None; tokens.len()];
        let mut stack: Vec<(usize, char)> = Vec::new();

        for (idx, token) in tokens.iter().enumerate() {
            let TokenKind::Punct(ch) = token.kind else {
                continue;
            };
            match ch {
                '(' | '[' | '{' => stack.push((idx, closer_for(ch))),
                ')' | ']' | '}' => {
                    if let Some(depth) = stack.iter().rposition(|&(_, close)| close == ch) {
                        let (open, _) = stack[depth];
                        partners[open] = Some(idx);
                        partners[idx] = Some(open);
                        stack.truncate(depth);
                    }
                }
                _ => {}
            }
        }

        Self { tokens, partners }
    }

    /// All tokens.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Token at `index`.
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of the bracket paired with the bracket at `index`.
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(index).copied().flatten()
    }

    /// Index of the first token whose start is at or after `offset`.
    pub fn index_at(&self, offset: usize) -> usize {
        self.tokens.partition_point(|t| t.start < offset)
    }
}

/// The closing bracket for an opening bracket.
pub fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        other => other,
    }
}
