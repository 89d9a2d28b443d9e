use argus_ir::unfold::unfold;
use argus_ir::{Expr, VarDecl, VarIndexing};
use argus_smt::encoder::ExprEncoder;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Counter transition over `n` variables: every variable steps by its own offset.
fn counter_trans(n: usize) -> Expr {
    let conjuncts = (0..n).map(|i| {
        let v = VarDecl::int(format!("v{i}"));
        Expr::eq(
            Expr::prime(Expr::var(&v)),
            Expr::add(vec![Expr::var(&v), Expr::int(i as i64 + 1)]),
        )
    });
    Expr::and(conjuncts.collect())
}

fn unrolled(n: usize, depth: u32) -> Vec<Expr> {
    let trans = counter_trans(n);
    (0..depth).map(|k| unfold(&trans, &VarIndexing::all(k))).collect()
}

fn bench_encode_unrolled_cold(c: &mut Criterion) {
    let steps = unrolled(16, 10);
    c.bench_function("encode_unrolled_16x10_cold", |b| {
        b.iter(|| {
            let mut enc = ExprEncoder::new();
            for e in &steps {
                black_box(enc.encode(black_box(e)).ok());
            }
        })
    });
}

fn bench_encode_unrolled_warm(c: &mut Criterion) {
    let steps = unrolled(16, 10);
    let mut enc = ExprEncoder::new();
    c.bench_function("encode_unrolled_16x10_warm", |b| {
        b.iter(|| {
            for e in &steps {
                black_box(enc.encode(black_box(e)).ok());
            }
        })
    });
}

fn bench_encode_uncached(c: &mut Criterion) {
    let steps = unrolled(16, 10);
    c.bench_function("encode_unrolled_16x10_uncached", |b| {
        b.iter(|| {
            let mut enc = ExprEncoder::with_capacity(0);
            for e in &steps {
                black_box(enc.encode(black_box(e)).ok());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_encode_unrolled_cold,
    bench_encode_unrolled_warm,
    bench_encode_uncached
);
criterion_main!(benches);
