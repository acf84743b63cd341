use thiserror::Error;

/// Errors raised by a single analyzer during a pass.
///
/// These never abort a pass: the pass logs them, records them on the
/// [`AnalysisSnapshot`](crate::AnalysisSnapshot) and continues with the remaining analyzers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analyzer '{analyzer}' panicked: {message}")]
    /// The analyzer panicked; the panic was contained.
    Panicked {
        /// Analyzer name.
        analyzer: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },

    #[error("analyzer '{analyzer}' failed: {message}")]
    /// The analyzer reported a failure.
    Failed {
        /// Analyzer name.
        analyzer: &'static str,
        /// Failure description.
        message: String,
    },
}

impl AnalysisError {
    /// Name of the analyzer that failed.
    pub fn analyzer(&self) -> &'static str {
        match self {
            Self::Panicked { analyzer, .. } | Self::Failed { analyzer, .. } => analyzer,
        }
    }
}
