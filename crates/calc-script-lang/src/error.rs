use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while loading or validating language tables.
pub enum LanguageError {
    #[error("JSON parse error: {0}")]
    /// A registry or parameter file was not valid JSON (or had the wrong shape).
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    /// Reading a registry or parameter file failed.
    Io(#[from] std::io::Error),

    #[error("'{0}' is not a valid identifier")]
    /// A function or parameter name cannot be used as a script identifier.
    InvalidIdentifier(String),

    #[error("function '{0}' is registered more than once")]
    /// Two signatures share the same name.
    DuplicateFunction(String),

    #[error("parameter '{0}' is declared more than once")]
    /// Two calculator parameters share the same name.
    DuplicateParameter(String),
}
