//! Benchmarks for descriptor parsing, encoding, and drag updates.
//!
//! Run with: cargo bench -p mosaic-layout

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use mosaic_core::geometry::{CellSize, Point};
use mosaic_core::ids::{SequentialIds, TokenId};
use mosaic_layout::{
    DragReorderController, LayoutDescriptor, LayoutParser, SectionLayout, StagingStore,
    encode_parsed,
};
use std::hint::black_box;

/// `n` tokens split into sections of 24 with a few whitespace cells each.
fn make_collection(n: usize) -> (Vec<TokenId>, LayoutDescriptor) {
    let tokens: Vec<TokenId> = (0..n).map(|i| TokenId::new(format!("tok-{i}"))).collect();
    let mut layout = LayoutDescriptor::default();
    for (index, start) in (0..n).step_by(24).enumerate() {
        layout.sections.push(start);
        layout
            .section_layout
            .push(SectionLayout::new(2 + index % 4).with_whitespace([0, 5, 11]));
    }
    (tokens, layout)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/parse");
    let parser = LayoutParser::default();

    for n in [24, 240, 2_400, 24_000] {
        let (tokens, layout) = make_collection(n);
        group.bench_with_input(BenchmarkId::new("tokens", n), &(tokens, layout), |b, input| {
            b.iter(|| {
                let mut ids = SequentialIds::default();
                black_box(parser.parse(&input.0, &input.1, &mut ids))
            })
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/encode");

    for n in [24, 240, 2_400, 24_000] {
        let (tokens, layout) = make_collection(n);
        let parsed = LayoutParser::default().parse(&tokens, &layout, &mut SequentialIds::default());
        group.bench_with_input(BenchmarkId::new("parsed", n), &parsed, |b, parsed| {
            b.iter(|| black_box(encode_parsed(parsed)))
        });

        let mut store = StagingStore::default();
        let id = store.load_collection(&tokens, &layout);
        group.bench_with_input(BenchmarkId::new("staged", n), &store, |b, store| {
            b.iter(|| black_box(store.commit(id)))
        });
    }

    group.finish();
}

fn bench_drag_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/drag_update");
    let cell = CellSize::new(100.0).unwrap();

    for n in [12, 120, 1_200] {
        let columns = 4;
        let path: Vec<Point> = (0..n)
            .map(|order| {
                Point::new(
                    (order % columns) as f64 * 100.0 + 7.0,
                    (order / columns) as f64 * 100.0 - 7.0,
                )
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("sweep", n), &path, |b, path| {
            b.iter_batched(
                || {
                    let mut drag = DragReorderController::new(0..n, columns, cell);
                    drag.begin(&0);
                    drag
                },
                |mut drag| {
                    for &point in path {
                        black_box(drag.update(point));
                    }
                    black_box(drag.end())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_encode, bench_drag_update);
criterion_main!(benches);
