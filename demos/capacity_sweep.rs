//! Capacity sweep: query time and match accuracy per octree capacity.
//!
//! Usage:
//!   cargo run --example capacity_sweep --release -- [samples] [capacities...]

use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use zenmatch::remap::measure_accuracy;
use zenmatch::{BruteForceMatcher, Color, ColorMatcher, ColorOctree, Palette, presets};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let sample_count: usize = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(500_000);
    let mut capacities: Vec<usize> = args[2.min(args.len())..]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let palette: Arc<Palette> = Arc::new(
        presets::shade_glyphs(&presets::ansi16())
            .unwrap_or_else(|e| panic!("cannot build glyph palette: {e}"))
            .into_palette(),
    );
    if capacities.is_empty() {
        capacities = vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 512, palette.len()];
    }

    let samples: Vec<Color> = (0..sample_count as u32)
        .map(|i| {
            let h = i.wrapping_mul(2654435761);
            Color::new(h as u8, (h >> 8) as u8, (h >> 16) as u8)
        })
        .collect();

    eprintln!(
        "{} palette entries, {} samples",
        palette.len(),
        samples.len()
    );

    println!(
        "{:<10} {:>7} {:>7} {:>8} {:>10} {:>10} {:>8} {:>10}",
        "capacity", "leaves", "nodes", "max_leaf", "build_us", "ns/query", "exact%", "mean_err"
    );
    println!("{}", "-".repeat(78));

    {
        let brute = BruteForceMatcher::new(Arc::clone(&palette));
        let t = Instant::now();
        for &q in &samples {
            black_box(brute.best_match_index(black_box(q)));
        }
        let ns = t.elapsed().as_nanos() as f64 / samples.len() as f64;
        println!(
            "{:<10} {:>7} {:>7} {:>8} {:>10} {:>10.1} {:>8.2} {:>10.2}",
            "brute", "-", "-", palette.len(), "-", ns, 100.0, 0.0
        );
    }

    for &capacity in &capacities {
        let t = Instant::now();
        let tree = match ColorOctree::build(Arc::clone(&palette), capacity) {
            Ok(tree) => tree,
            Err(e) => {
                eprintln!("capacity {capacity}: {e}");
                continue;
            }
        };
        let build_us = t.elapsed().as_secs_f64() * 1e6;

        let t = Instant::now();
        for &q in &samples {
            black_box(tree.best_match_index(black_box(q)));
        }
        let ns = t.elapsed().as_nanos() as f64 / samples.len() as f64;

        let stats = tree.stats();
        let accuracy = measure_accuracy(&samples, &tree);
        println!(
            "{:<10} {:>7} {:>7} {:>8} {:>10.1} {:>10.1} {:>8.2} {:>10.2}",
            capacity,
            stats.leaf_count,
            stats.node_count,
            stats.max_leaf_len,
            build_us,
            ns,
            accuracy.exact_fraction() * 100.0,
            accuracy.mean_excess_sq
        );
    }
}
