//! Benchmarks for the filter engine's expression merging.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use sluice::{
    Column, ColumnType, Expr, FilterOptions, Frame, Ledger, Value, filter_paths,
};

fn synthetic_ledger(rows: usize) -> (Ledger, Vec<String>) {
    let paths: Vec<String> = (0..rows).map(|i| format!("/data/{:06}.png", i)).collect();

    let mut ledger = Ledger::in_memory();
    ledger.add_paths(paths.clone()).unwrap();

    let chunk = Frame::from_columns([
        (
            "path".to_string(),
            Column::from_values(
                ColumnType::Str,
                paths.iter().map(|p| Some(Value::Str(p.clone()))).collect(),
            )
            .unwrap(),
        ),
        (
            "width".to_string(),
            Column::from_values(
                ColumnType::Int,
                (0..rows).map(|i| Some(Value::Int((i % 4096) as i64))).collect(),
            )
            .unwrap(),
        ),
        (
            "height".to_string(),
            Column::from_values(
                ColumnType::Int,
                (0..rows).map(|i| Some(Value::Int((i % 3072) as i64))).collect(),
            )
            .unwrap(),
        ),
    ])
    .unwrap();
    ledger.merge_chunk(&chunk).unwrap();
    (ledger, paths)
}

fn bench_merged_expression_pass(c: &mut Criterion) {
    let (ledger, paths) = synthetic_ledger(10_000);
    let options = FilterOptions::default();

    c.bench_function("filter_two_fast_rules_10k_rows", |b| {
        b.iter(|| {
            #[derive(Debug)]
            struct Bound(Expr);
            impl sluice::Rule for Bound {
                fn name(&self) -> &'static str {
                    "bound"
                }
                fn requires(&self) -> Vec<sluice::ColumnRef> {
                    Vec::new()
                }
                fn matcher(&self) -> sluice::Matcher {
                    sluice::Matcher::Fast(self.0.clone())
                }
            }
            let rules: Vec<Box<dyn sluice::Rule>> = vec![
                Box::new(Bound(Expr::col("width").ge(Expr::lit(64i64)))),
                Box::new(Bound(Expr::col("height").le(Expr::lit(2048i64)))),
            ];
            black_box(filter_paths(&ledger, &rules, &paths, &options).unwrap())
        })
    });
}

fn bench_expression_evaluation(c: &mut Criterion) {
    let (ledger, _) = synthetic_ledger(10_000);
    let expr = Expr::min_horizontal(vec![Expr::col("width"), Expr::col("height")])
        .ge(Expr::lit(256i64));

    c.bench_function("min_horizontal_mask_10k_rows", |b| {
        b.iter(|| black_box(expr.mask(ledger.frame()).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_merged_expression_pass,
    bench_expression_evaluation
);
criterion_main!(benches);
