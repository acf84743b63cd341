//! Identifier resolution.
//!
//! Two passes over the token stream:
//!
//! 1. Assignments: a plain `name = ...` whose target is not declared anywhere visible is reported
//!    once, and the name is then treated as an implicit global for the rest of the pass.
//!    Compound assignments (`+=`, `-=`, ...) are not considered declarations.
//! 2. Reads: every free identifier read that is neither a keyword, a built-in, a calculator
//!    parameter, a registered function, visible in scope, nor an implicit global is reported as
//!    undefined.
//!
//! Calls (`name(...)`) are left to the call-site validator.

use crate::analysis::AnalysisContext;
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity};
use crate::error::AnalysisError;
use crate::lexer::TokenKind;
use crate::processing::Analyzer;
use std::collections::HashSet;

/// Returns `true` if the token at `idx` is an identifier read as a free variable.
///
/// Excludes keywords, both sides of a property access (`a.b`, `a?.b`), object keys and labels
/// (`key:`), binding sites, callees (`name(`), and operands of `typeof`, `break` and `continue`.
pub(crate) fn is_free_read(ctx: &AnalysisContext<'_>, idx: usize) -> bool {
    let stream = ctx.tokens();
    let Some(token) = stream.get(idx) else {
        return false;
    };
    if !token.is_identifier() {
        return false;
    }

    let name = token.text(ctx.source());
    let language = ctx.language();
    if language.is_keyword(name) || language.is_control_flow_keyword(name) {
        return false;
    }
    if ctx.scopes().is_declaration_site(token.start) {
        return false;
    }

    let prev = idx.checked_sub(1).and_then(|p| stream.get(p));
    let next = stream.get(idx + 1);

    if let Some(prev) = prev {
        if prev.is_punct('.') {
            return false;
        }
        let prev_text = prev.text(ctx.source());
        if matches!(prev_text, "?." | "typeof" | "break" | "continue") {
            return false;
        }
    }

    match next {
        Some(next) if next.is_punct('(') => false,
        // The object of a property access is not checked.
        Some(next) if next.is_punct('.') || next.text(ctx.source()) == "?." => false,
        Some(next) if next.is_punct(':') => !prev.is_none_or(|p| {
            p.is_punct('{') || p.is_punct(',') || p.is_punct(';') || p.is_punct('}')
        }),
        _ => true,
    }
}

fn is_plain_assignment_target(ctx: &AnalysisContext<'_>, idx: usize) -> bool {
    ctx.tokens()
        .get(idx + 1)
        .is_some_and(|next| next.kind == TokenKind::Operator && next.text(ctx.source()) == "=")
}

/// Reports undeclared assignments and unresolved identifier reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierResolver;

impl Analyzer for IdentifierResolver {
    fn name(&self) -> &'static str {
        "identifiers"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Diagnostic>, AnalysisError> {
        let mut diagnostics = Vec::new();
        let stream = ctx.tokens();
        let mut implicit: HashSet<&str> = HashSet::new();

        for idx in 0..stream.len() {
            if !is_free_read(ctx, idx) || !is_plain_assignment_target(ctx, idx) {
                continue;
            }
            let Some(token) = stream.get(idx) else {
                continue;
            };
            let name = token.text(ctx.source());
            if ctx.is_known(name, token.start) || !implicit.insert(name) {
                continue;
            }
            diagnostics.push(ctx.diagnostic(
                token.start,
                token.end,
                DiagnosticSeverity::Warning,
                DiagnosticCategory::Semantic,
                format!("Variable '{name}' is assigned without declaration"),
            ));
        }

        for idx in 0..stream.len() {
            if !is_free_read(ctx, idx) || is_plain_assignment_target(ctx, idx) {
                continue;
            }
            let Some(token) = stream.get(idx) else {
                continue;
            };
            let name = token.text(ctx.source());
            if implicit.contains(name) || ctx.is_known(name, token.start) {
                continue;
            }
            diagnostics.push(ctx.diagnostic(
                token.start,
                token.end,
                DiagnosticSeverity::Warning,
                DiagnosticCategory::Semantic,
                format!("Undefined variable '{name}'"),
            ));
        }

        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_script_lang::{CalculatorParameter, DataType, ParameterSet, ScriptLanguage};
    use pretty_assertions::assert_eq;

    fn resolve_with(source: &str, params: &ParameterSet) -> Vec<Diagnostic> {
        let language = ScriptLanguage::dosage_calculator();
        let ctx = AnalysisContext::new(source, &language, params);
        IdentifierResolver.analyze(&ctx).expect("resolver is infallible")
    }

    fn messages(source: &str) -> Vec<String> {
        resolve_with(source, &ParameterSet::new())
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_block_scoped_let_is_undefined_outside() {
        let source = "{ let y = 1; } console.log(y);";
        let diags = resolve_with(source, &ParameterSet::new());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Undefined variable 'y'");
        assert_eq!(diags[0].column as usize, source.rfind('y').unwrap() + 1);
    }

    #[test]
    fn test_var_hoisting() {
        assert!(messages("function f(){ if (true) { var x = 1; } return x; }").is_empty());
    }

    #[test]
    fn test_function_params_visible_in_body() {
        assert!(messages("function f(a,b){ return a+b; }").is_empty());
    }

    #[test]
    fn test_undeclared_assignment_reported_once() {
        assert_eq!(
            messages("total = 1;\ntotal = total + 2;\nresult = total;"),
            vec![
                "Variable 'total' is assigned without declaration",
                "Variable 'result' is assigned without declaration",
            ]
        );
    }

    #[test]
    fn test_compound_assignment_is_a_read() {
        assert_eq!(messages("sum += 1;"), vec!["Undefined variable 'sum'"]);
    }

    #[test]
    fn test_parameters_builtins_and_functions_are_known() {
        let params = ParameterSet::new()
            .with(CalculatorParameter::new("weight", DataType::Number))
            .with(CalculatorParameter::new("isMale", DataType::Boolean));
        let diags = resolve_with(
            "var d = Math.round(weight * 2);\nif (isMale) { d = dosePerKg; }\nvar n = NaN;",
            &params,
        );
        assert_eq!(diags, vec![]);
    }

    #[test]
    fn test_properties_keys_and_labels_are_not_reads() {
        let source = "var o = { dose: 1, unit: 'mg' };\nvar u = o.unit;\nvar t = typeof missing;\nouter: for (;;) { break outer; }";
        assert_eq!(messages(source), Vec::<String>::new());
    }

    #[test]
    fn test_calls_are_left_to_call_validator() {
        assert!(messages("doStuff(1, 2);").is_empty());
    }

    #[test]
    fn test_closures_see_outer_vars() {
        let source = "var factor = 2;\nvar scale = function (v) { return v * factor; };\nvar sq = x => x * factor;";
        assert!(messages(source).is_empty());
    }

    #[test]
    fn test_ternary_branches_are_reads() {
        assert_eq!(
            messages("var a = 1;\nvar b = a ? low : 2;"),
            vec!["Undefined variable 'low'"]
        );
    }

    #[test]
    fn test_property_access_objects_are_not_reads() {
        assert!(messages("var v = result.value;\nvar w = patient?.weight;").is_empty());
        assert_eq!(
            messages("var v = result.value + missing;"),
            vec!["Undefined variable 'missing'"]
        );
    }
}
