use calc_script::{
    Analysis, AnalysisOptions, DiagnosticCategory, DiagnosticSeverity, analyze, split_arguments,
};
use calc_script_lang::{CalculatorParameter, DataType, ParameterSet, ScriptLanguage};
use pretty_assertions::assert_eq;

fn language() -> ScriptLanguage {
    ScriptLanguage::dosage_calculator()
}

fn params() -> ParameterSet {
    ParameterSet::new()
        .with(CalculatorParameter::new("weight", DataType::Number).with_default("70"))
        .with(CalculatorParameter::new("age", DataType::Integer))
        .with(CalculatorParameter::new("isFemale", DataType::Boolean))
        .with(CalculatorParameter::new("route", DataType::Select).with_default("oral"))
}

fn messages(source: &str) -> Vec<String> {
    analyze(source, &language(), &params())
        .into_diagnostics()
        .into_iter()
        .map(|d| d.message)
        .collect()
}

#[test]
fn test_function_scope_and_arity() {
    let source = "function f(a,b){ return a+b; }\nvar r = f(1);";
    assert_eq!(
        messages(source),
        vec!["Function 'f' requires at least 2 arguments, 1 provided"]
    );
}

#[test]
fn test_single_unclosed_paren() {
    let snapshot = analyze("if (x > 1 { }", &language(), &params());
    let structural: Vec<_> = snapshot
        .diagnostics()
        .iter()
        .filter(|d| d.category == DiagnosticCategory::Structural)
        .collect();
    assert_eq!(structural.len(), 1);
    assert_eq!(structural[0].message, "Unclosed bracket '('");
    assert_eq!((structural[0].line, structural[0].column), (1, 4));
}

#[test]
fn test_block_scoping_and_hoisting() {
    assert_eq!(
        messages("{ let y = 1; } console.log(y);"),
        vec!["Undefined variable 'y'"]
    );
    assert!(messages("function f(){ if (true) { var x = 1; } return x; }").is_empty());
}

#[test]
fn test_idempotent_analysis() {
    let source = "var dose = weight * 2\nif (dose == null) { addWarning('a', 'b'); }\nfoo(bar);";
    let first = analyze(source, &language(), &params());
    let second = analyze(source, &language(), &params());
    assert_eq!(first.diagnostics(), second.diagnostics());
    assert!(!first.diagnostics().is_empty());
}

#[test]
fn test_argument_splitting() {
    let args = split_arguments(r#"1, [2,3], "a,b""#, 0);
    let texts: Vec<_> = args.iter().map(|a| a.text.as_str()).collect();
    assert_eq!(texts, vec!["1", "[2,3]", r#""a,b""#]);
}

#[test]
fn test_registry_arity_and_unknown_functions() {
    assert_eq!(
        messages("addWarning('only one arg');"),
        vec!["Function 'addWarning' requires at least 5 arguments, 1 provided"]
    );
    let snapshot = analyze("doStuff(1,2);", &language(), &params());
    assert_eq!(snapshot.diagnostics().len(), 1);
    assert_eq!(snapshot.diagnostics()[0].message, "Undefined function 'doStuff'");
    assert_eq!(
        snapshot.diagnostics()[0].severity,
        DiagnosticSeverity::Warning
    );
}

#[test]
fn test_realistic_calculator_is_clean() {
    let source = r#"// Paediatric paracetamol
var mgPerKg = route === 'oral' ? 15 : 12.5;
var maxDaily = 75;

function cappedDose(perKg, cap) {
    var dose = dosePerKg(perKg, weight);
    return clamp(dose, 0, cap);
}

let single = cappedDose(mgPerKg, 1000);
const daily = single * 4;

if (daily > maxDaily * weight) {
    addWarning('Daily dose', 'Exceeds daily maximum', 'high', 'weight', daily);
}

for (let i = 0; i < 4; i++) {
    addResult('Dose ' + (i + 1), round(single, 1), 'mg');
}

var labels = ['low', 'mid', 'high'];
labels.forEach(label => addResult(label, 0));

try {
    var bsa = bodySurfaceArea(120, weight);
} catch (err) {
    addResult('error', err.message);
}

addResult('Clearance', creatinineClearance(age, weight, 0.9, isFemale), 'mL/min');
"#;
    let snapshot = analyze(source, &language(), &params());
    assert_eq!(snapshot.diagnostics(), &[]);
    assert_eq!(snapshot.summary(), "No problems found");
}

#[test]
fn test_mixed_problems_summary() {
    let source = "var a = \"x\";\nvar b = 'y'\nround(1, 2, 3);\nif (a == null) { }\nmissing(1);\nwhile (true) { }";
    let snapshot = analyze(source, &language(), &params());
    let got: Vec<_> = snapshot
        .diagnostics()
        .iter()
        .map(|d| (d.line, d.severity, d.message.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            (
                3,
                DiagnosticSeverity::Warning,
                "Function 'round' accepts at most 2 arguments, 3 provided"
            ),
            (5, DiagnosticSeverity::Warning, "Undefined function 'missing'"),
            (
                4,
                DiagnosticSeverity::Info,
                "Use '===' instead of '==' when comparing with 'null'"
            ),
            (
                2,
                DiagnosticSeverity::Info,
                "Mixed quote styles: prefer double quotes consistently"
            ),
            (
                6,
                DiagnosticSeverity::Warning,
                "Possible infinite loop: 'while (true)' has no 'break' or 'return'"
            ),
            (2, DiagnosticSeverity::Info, "Missing semicolon"),
        ]
    );
    assert_eq!(snapshot.summary(), "3 warnings, 3 infos");
}

#[test]
fn test_stylistic_checks_can_be_disabled() {
    let analysis = Analysis::new(AnalysisOptions {
        stylistic_checks: false,
        max_diagnostics: None,
    });
    let snapshot = analysis.run("var a = 1\nvar b = a == null", &language(), &params());
    assert!(snapshot.diagnostics().is_empty());
}

#[test]
fn test_unicode_columns() {
    let snapshot = analyze("var größe = 1;\nvar x = größe + höhe;", &language(), &params());
    assert_eq!(snapshot.diagnostics().len(), 1);
    let diag = &snapshot.diagnostics()[0];
    assert_eq!(diag.message, "Undefined variable 'höhe'");
    assert_eq!((diag.line, diag.column, diag.length), (2, 17, 4));
}
