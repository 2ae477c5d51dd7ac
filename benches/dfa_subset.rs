//! cargo bench --bench dfa_subset
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use unire::Regex;

pub fn criterion_benchmark(c: &mut Criterion) {
    {
        let re = Regex::new("needle").unwrap();
        let haystack = "hay ".repeat(200) + "needle";
        assert!(re.is_match(&haystack).unwrap());
        c.bench_function("dfa_literal_find", |b| {
            b.iter(|| re.find(black_box(&haystack)))
        });
    }

    {
        let re = Regex::new(r"[a-z]+@[a-z]+\.[a-z]+").unwrap();
        let haystack = "no match here, just prose ".repeat(50) + "user@example.com";
        assert!(re.is_match(&haystack).unwrap());
        c.bench_function("dfa_class_repetition_find", |b| {
            b.iter(|| re.find(black_box(&haystack)))
        });
    }

    {
        let re = Regex::new("a(b|c|d)*z").unwrap();
        let haystack = "bcdbcdbcdbcd".repeat(30) + "z";
        let haystack = "a".to_string() + &haystack;
        assert!(re.is_match(&haystack).unwrap());
        c.bench_function("dfa_alternation_repetition_find", |b| {
            b.iter(|| re.find(black_box(&haystack)))
        });
    }

    {
        let re = Regex::new("no_such_pattern_anywhere").unwrap();
        let haystack = "the quick brown fox jumps over the lazy dog ".repeat(100);
        assert!(!re.is_match(&haystack).unwrap());
        c.bench_function("dfa_full_scan_no_match", |b| {
            b.iter(|| re.is_match(black_box(&haystack)))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
