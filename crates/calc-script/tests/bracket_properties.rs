//! Randomized bracket-matcher checks.
//!
//! 1. Balanced sequences (with noise in literals and comments) never produce diagnostics.
//! 2. Dropping one closer from a balanced sequence always produces at least one error.

use calc_script::{LineIndex, match_brackets, sanitize};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];
const NOISE: [&str; 6] = [
    "x",
    " + 1",
    "\n",
    "\"(]\"",
    "'}{'",
    "/* ) */",
];

fn balanced(rng: &mut StdRng, depth: usize, out: &mut String) {
    let items = rng.gen_range(0..4);
    for _ in 0..items {
        if rng.gen_bool(0.4) {
            out.push_str(NOISE[rng.gen_range(0..NOISE.len())]);
        }
        if depth < 6 && rng.gen_bool(0.7) {
            let (open, close) = PAIRS[rng.gen_range(0..PAIRS.len())];
            out.push(open);
            balanced(rng, depth + 1, out);
            out.push(close);
        }
    }
}

fn check(source: &str) -> usize {
    match_brackets(&sanitize(source), &LineIndex::from_text(source)).len()
}

#[test]
fn test_balanced_sequences_produce_no_diagnostics() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let mut source = String::new();
        balanced(&mut rng, 0, &mut source);
        assert_eq!(check(&source), 0, "unexpected diagnostics for {source:?}");
    }
}

#[test]
fn test_removing_a_closer_is_always_reported() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut checked = 0;
    while checked < 300 {
        let mut source = String::new();
        balanced(&mut rng, 0, &mut source);

        let sanitized = sanitize(&source);
        let closers: Vec<usize> = sanitized
            .char_indices()
            .filter(|(_, c)| matches!(c, ')' | ']' | '}'))
            .map(|(i, _)| i)
            .collect();
        if closers.is_empty() {
            continue;
        }

        let victim = closers[rng.gen_range(0..closers.len())];
        let mut broken = source.clone();
        broken.remove(victim);
        assert!(check(&broken) > 0, "missing diagnostics for {broken:?}");
        checked += 1;
    }
}
