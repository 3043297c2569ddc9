//! Capacity sweep: build cost and per-query cost of the octree matcher
//! against the linear scan.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use zenmatch::{BruteForceMatcher, Color, ColorMatcher, ColorOctree, Palette, presets};

const CAPACITIES: &[usize] = &[1, 4, 16, 32, 64, 128, 256, 512, 736];

fn glyph_palette() -> Arc<Palette> {
    Arc::new(
        presets::shade_glyphs(&presets::ansi16())
            .expect("ansi16 shade palette")
            .into_palette(),
    )
}

fn samples(n: usize) -> Vec<Color> {
    (0..n as u32)
        .map(|i| {
            let h = i.wrapping_mul(2654435761);
            Color::new(h as u8, (h >> 8) as u8, (h >> 16) as u8)
        })
        .collect()
}

fn bench_query(c: &mut Criterion) {
    let palette = glyph_palette();
    let queries = samples(4096);

    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(queries.len() as u64));

    let brute = BruteForceMatcher::new(Arc::clone(&palette));
    group.bench_function("brute_force", |b| {
        b.iter(|| {
            for &q in &queries {
                black_box(brute.best_match_index(black_box(q)));
            }
        });
    });

    for &capacity in CAPACITIES {
        let tree = ColorOctree::build(Arc::clone(&palette), capacity).expect("valid capacity");
        group.bench_with_input(BenchmarkId::new("octree", capacity), &tree, |b, tree| {
            b.iter(|| {
                for &q in &queries {
                    black_box(tree.best_match_index(black_box(q)));
                }
            });
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let palette = glyph_palette();
    let mut group = c.benchmark_group("build");
    for &capacity in CAPACITIES {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter(|| black_box(ColorOctree::build(Arc::clone(&palette), capacity)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_query, bench_build);
criterion_main!(benches);
