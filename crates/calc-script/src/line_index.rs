//! Offset-to-position mapping.
//!
//! Analyzers work on byte offsets into the source (the sanitizer keeps them aligned with the
//! original text). Diagnostics are reported as 1-based `(line, column)` pairs where the column
//! counts Unicode scalar values. [`LineIndex`] converts between the two using a Rope, which gives
//! O(log N) lookups.
//!
//! Only `\n` breaks a line. A `\r` before it stays at the end of the line, and lone `\r`,
//! U+2028 or NEL are ordinary characters, so line numbers agree with the prelude remapping of
//! compiler messages.

use ropey::Rope;

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// 1-based line.
    pub line: u32,
    /// 1-based column in `char`s.
    pub column: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Line index over an immutable source text.
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    /// Build a line index from text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Total line count (an empty document has one line).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total byte count.
    pub fn byte_count(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Zero-based line containing `byte_offset` (clamped to the document).
    pub fn line_of(&self, byte_offset: usize) -> usize {
        let byte_offset = byte_offset.min(self.rope.len_bytes());
        self.rope.byte_to_line(byte_offset)
    }

    /// Byte offset of the start of a zero-based line.
    pub fn line_start(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        self.rope.line_to_byte(line)
    }

    /// 1-based position of a byte offset.
    ///
    /// Offsets that fall inside a multi-byte character resolve to that character.
    pub fn position(&self, byte_offset: usize) -> Position {
        let byte_offset = byte_offset.min(self.rope.len_bytes());
        let char_offset = self.rope.byte_to_char(byte_offset);
        let line = self.rope.char_to_line(char_offset);
        let column = char_offset - self.rope.line_to_char(line);
        Position::new(line as u32 + 1, column as u32 + 1)
    }

    /// Number of `char`s between two byte offsets.
    pub fn char_len(&self, start: usize, end: usize) -> usize {
        let len = self.rope.len_bytes();
        let start = start.min(len);
        let end = end.clamp(start, len);
        self.rope.byte_to_char(end) - self.rope.byte_to_char(start)
    }

    /// Text of a zero-based line, without its line terminator.
    pub fn line_text(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }

        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        if text.ends_with('\r') {
            text.pop();
        }
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let index = LineIndex::from_text("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.position(0), Position::new(1, 1));
    }

    #[test]
    fn test_position() {
        let text = "ABC\nDEF\nGHI";
        let index = LineIndex::from_text(text);

        assert_eq!(index.position(0), Position::new(1, 1));
        assert_eq!(index.position(2), Position::new(1, 3));
        assert_eq!(index.position(4), Position::new(2, 1));
        assert_eq!(index.position(8), Position::new(3, 1));
        assert_eq!(index.position(100), Position::new(3, 4));
    }

    #[test]
    fn test_utf8_columns_count_chars() {
        let text = "var größe = 1;\nx";
        let index = LineIndex::from_text(text);
        let eq = text.find('=').unwrap();
        assert_eq!(index.position(eq), Position::new(1, 11));
        assert_eq!(index.char_len(4, 4 + "größe".len()), 5);
        assert_eq!(index.line_of(text.len()), 1);
    }

    #[test]
    fn test_line_text_and_start() {
        let index = LineIndex::from_text("first\r\nsecond\n");
        assert_eq!(index.line_text(0).as_deref(), Some("first"));
        assert_eq!(index.line_text(1).as_deref(), Some("second"));
        assert_eq!(index.line_start(1), 7);
        assert_eq!(index.line_text(5), None);
    }

    #[test]
    fn test_only_line_feed_breaks_lines() {
        let text = "a\u{2028}b\rc\u{85}d\ne";
        let index = LineIndex::from_text(text);
        assert_eq!(index.line_count(), 2);
        let d = text.find('d').unwrap();
        assert_eq!(index.position(d), Position::new(1, 7));
        assert_eq!(index.position(text.len() - 1), Position::new(2, 1));
    }
}
