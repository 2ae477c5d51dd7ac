//! cargo bench --bench dissect
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use unire::{Dialect, Regex};

pub fn criterion_benchmark(c: &mut Criterion) {
    {
        let re = Regex::builder().dialect(Dialect::Advanced).build("(a+)\\1").unwrap();
        let haystack = "a".repeat(40);
        assert!(re.is_match(&haystack).unwrap());
        c.bench_function("dissect_backref_worst_case", |b| {
            b.iter(|| re.captures(black_box(&haystack)))
        });
    }

    {
        let re = Regex::builder().dialect(Dialect::Advanced).build("a(b+)c").unwrap();
        let haystack = "a".to_string() + &"b".repeat(60) + "c";
        assert!(re.is_match(&haystack).unwrap());
        c.bench_function("dissect_capturing_group_find", |b| {
            b.iter(|| re.captures(black_box(&haystack)))
        });
    }

    {
        let re = Regex::builder().dialect(Dialect::Advanced).build("a.*?b").unwrap();
        let haystack = "a".to_string() + &"x".repeat(200) + "b";
        assert!(re.is_match(&haystack).unwrap());
        c.bench_function("dissect_nongreedy_find", |b| {
            b.iter(|| re.find(black_box(&haystack)))
        });
    }

    {
        let re = Regex::builder().dialect(Dialect::Advanced).build("(?=abc)a.*").unwrap();
        let haystack = "abc".to_string() + &"x".repeat(100);
        assert!(re.is_match(&haystack).unwrap());
        c.bench_function("dissect_lookahead_find", |b| {
            b.iter(|| re.find(black_box(&haystack)))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
