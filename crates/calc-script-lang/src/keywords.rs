//! Static keyword and built-in tables.

/// Reserved words of the scripting language, plus the literal keywords.
///
/// None of these are ever reported as unknown identifiers.
pub const KEYWORDS: &[&str] = &[
    "arguments",
    "async",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "let",
    "new",
    "null",
    "of",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// Keywords that introduce a parenthesized condition or header.
pub const CONTROL_FLOW_KEYWORDS: &[&str] = &["if", "switch", "while", "for", "catch"];

/// Global objects and functions available to every script without declaration.
pub const BUILTIN_GLOBALS: &[&str] = &[
    "Array",
    "Boolean",
    "Date",
    "Error",
    "Infinity",
    "JSON",
    "Map",
    "Math",
    "NaN",
    "Number",
    "Object",
    "RangeError",
    "RegExp",
    "Set",
    "String",
    "TypeError",
    "console",
    "decodeURIComponent",
    "encodeURIComponent",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "undefined",
];

/// Returns `true` if `name` is a syntactically valid script identifier.
///
/// Identifiers start with a letter, `_` or `$` and continue with letters, digits, `_` or `$`.
/// Non-ASCII letters are accepted.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$')
}
