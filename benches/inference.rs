use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use csv_autoload::inference::{infer_column_types, infer_with_scope, InferenceScope};
use csv_autoload::sanitize::{RowSanitizer, TypeLookup};
use csv_autoload::types::RowSet;

const ROW_COUNTS: &[usize] = &[1_000, 10_000, 100_000];

fn synthetic_rows(n: usize) -> RowSet {
    let columns = ["id", "title", "score", "release_date", "notes"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows = (0..n)
        .map(|i| {
            vec![
                Some(i.to_string()),
                Some(format!("Track {i}")),
                if i % 7 == 0 { Some(String::new()) } else { Some(format!("{}.5", i % 100)) },
                Some(format!("{}-{:02}", 1960 + i % 60, 1 + i % 12)),
                None,
            ]
        })
        .collect();
    RowSet::new(columns, rows)
}

fn bench_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("infer_column_types");
    for &n in ROW_COUNTS {
        let rows = synthetic_rows(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("all_rows", n), &rows, |b, rows| {
            b.iter(|| infer_column_types(black_box(rows)))
        });
        group.bench_with_input(BenchmarkId::new("sample_5", n), &rows, |b, rows| {
            b.iter(|| infer_with_scope(black_box(rows), InferenceScope::Sample(5)))
        });
    }
    group.finish();
}

fn bench_sanitize(c: &mut Criterion) {
    let rows = synthetic_rows(10_000);
    let types = infer_column_types(&rows);
    let date_columns = vec!["release_date".to_string()];
    let sanitizer = RowSanitizer::new(&types, TypeLookup::ByColumnName, &date_columns);

    let mut group = c.benchmark_group("prepare_row");
    group.throughput(Throughput::Elements(rows.row_count() as u64));
    group.bench_function("10k_rows", |b| {
        b.iter(|| {
            for row in &rows.rows {
                black_box(sanitizer.prepare_row(&rows.columns, row));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_inference, bench_sanitize);
criterion_main!(benches);
