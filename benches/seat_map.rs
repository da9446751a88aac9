//! Построение схем мест: зал-сетка и стадион на 9 600 мест.
//!
//! Запуск: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeSet;

use quicket::seating::{GridLayout, Layout, SeatId, SeatMap, StadiumLayout, Subsector};

fn bench_grid(c: &mut Criterion) {
    let layout = Layout::Grid(GridLayout::default());
    let occupied: BTreeSet<SeatId> = (1..=10).map(|n| SeatId::grid(5, n)).collect();
    let selected = vec![SeatId::grid(1, 1), SeatId::grid(1, 2)];

    c.bench_function("grid_100_seats", |b| {
        b.iter(|| SeatMap::generate(black_box(&layout), black_box(100), &occupied, &selected))
    });
}

fn bench_stadium(c: &mut Criterion) {
    let layout = Layout::Stadium(StadiumLayout::astana_arena());
    let occupied: BTreeSet<SeatId> = (1..=15)
        .flat_map(|row| (1..=20).map(move |n| SeatId::stadium(Subsector::new('A', 1), row, n)))
        .collect();
    let selected = vec![SeatId::stadium(Subsector::new('B', 3), 2, 7)];

    let mut group = c.benchmark_group("stadium");
    group.sample_size(30);
    group.bench_function("generate", |b| {
        b.iter(|| SeatMap::generate(black_box(&layout), 0, &occupied, &selected))
    });
    group.bench_function("count_available", |b| {
        let map = SeatMap::generate(&layout, 0, &occupied, &selected);
        b.iter(|| black_box(&map).count(quicket::seating::SeatState::Available))
    });
    group.finish();
}

criterion_group!(benches, bench_grid, bench_stadium);
criterion_main!(benches);
