use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use dlexer_unit::{cluster, Unit};

const TEXT: &str = "lexer лексер 字句解析器 😀😀";

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("width_walk", |b| {
        b.iter(|| {
            let s = black_box(TEXT.as_bytes());
            let mut pos = 0;
            while pos < s.len() {
                pos += cluster::width(&s[pos..]);
            }
            pos
        })
    });

    assert_eq!(cluster::len_backward("😀".as_bytes()), 4);
    c.bench_function("len_backward_walk", |b| {
        b.iter(|| {
            let s = black_box(TEXT.as_bytes());
            let mut pos = s.len();
            while pos > 0 {
                pos -= cluster::len_backward(&s[..pos]);
            }
            pos
        })
    });

    c.bench_function("unit_decode", |b| {
        b.iter(|| Unit::decode(black_box("字句".as_bytes())))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
