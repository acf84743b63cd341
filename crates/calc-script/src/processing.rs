//! Generic analyzer interface.
//!
//! Every check in this crate (brackets, call sites, identifiers, style) is an [`Analyzer`]: a
//! read-only function of an [`AnalysisContext`] that returns diagnostics. Hosts can plug their own
//! checks into an [`Analysis`](crate::Analysis) through the same trait.

use crate::analysis::AnalysisContext;
use crate::diagnostics::Diagnostic;
use crate::error::AnalysisError;

/// A read-only check over one analysis pass.
pub trait Analyzer: Send + Sync {
    /// Short, stable name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Produce diagnostics for the pass.
    ///
    /// Implementations must not assume they run in any particular order relative to other
    /// analyzers; everything they need is in `ctx`.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Diagnostic>, AnalysisError>;
}
