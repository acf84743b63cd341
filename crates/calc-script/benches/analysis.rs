use calc_script::{Analysis, LineIndex, ScopeTree, TokenStream, match_brackets, sanitize};
use calc_script_lang::{CalculatorParameter, DataType, ParameterSet, ScriptLanguage};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn large_script(blocks: usize) -> String {
    let mut out = String::with_capacity(blocks * 256);
    for i in 0..blocks {
        out.push_str(&format!(
            "function dose{i}(perKg, cap) {{\n    var d = dosePerKg(perKg, weight);\n    if (d > cap) {{ addWarning('Dose {i}', 'capped', 'high', 'weight', d); d = cap; }}\n    return round(d, 1);\n}}\nlet result{i} = dose{i}({i}, 1000); // block {i}\n"
        ));
    }
    out
}

fn params() -> ParameterSet {
    ParameterSet::new().with(CalculatorParameter::new("weight", DataType::Number))
}

fn bench_sanitize_and_brackets(c: &mut Criterion) {
    let text = large_script(2_000);
    c.bench_function("brackets/2k_functions", |b| {
        b.iter(|| {
            let sanitized = sanitize(black_box(&text));
            let index = LineIndex::from_text(&text);
            black_box(match_brackets(&sanitized, &index));
        })
    });
}

fn bench_scope_tree(c: &mut Criterion) {
    let text = large_script(2_000);
    let language = ScriptLanguage::dosage_calculator();
    c.bench_function("scope_tree/2k_functions", |b| {
        b.iter(|| {
            let tokens = TokenStream::new(black_box(&text));
            black_box(ScopeTree::build(&text, &tokens, &language));
        })
    });
}

fn bench_full_pass(c: &mut Criterion) {
    let text = large_script(2_000);
    let language = ScriptLanguage::dosage_calculator();
    let params = params();
    let analysis = Analysis::default();
    c.bench_function("analysis/full_pass_2k_functions", |b| {
        b.iter(|| {
            let snapshot = analysis.run(black_box(&text), &language, &params);
            black_box(snapshot.diagnostics().len());
        })
    });
}

criterion_group!(
    benches,
    bench_sanitize_and_brackets,
    bench_scope_tree,
    bench_full_pass
);
criterion_main!(benches);
