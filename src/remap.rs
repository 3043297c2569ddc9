use crate::color::Color;
use crate::error::MatchError;
use crate::matcher::ColorMatcher;
use crate::palette::EntryId;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Map each pixel to the id of its matched palette entry.
pub fn remap_pixels<M: ColorMatcher + ?Sized>(pixels: &[Color], matcher: &M) -> Vec<EntryId> {
    pixels.iter().map(|&p| matcher.best_match(p).id).collect()
}

/// Map a row-major frame of `width`-pixel scanlines to entry ids.
///
/// With the `parallel` feature, scanlines are matched concurrently; the
/// matcher is only read, so no synchronization is involved.
pub fn remap_frame<M: ColorMatcher + Sync + ?Sized>(
    pixels: &[Color],
    width: usize,
    matcher: &M,
) -> Result<Vec<EntryId>, MatchError> {
    validate_frame(pixels.len(), width)?;

    let mut ids = vec![EntryId(0); pixels.len()];

    #[cfg(feature = "parallel")]
    ids.par_chunks_mut(width)
        .zip(pixels.par_chunks(width))
        .for_each(|(out, row)| remap_row(row, out, matcher));

    #[cfg(not(feature = "parallel"))]
    ids.chunks_mut(width)
        .zip(pixels.chunks(width))
        .for_each(|(out, row)| remap_row(row, out, matcher));

    Ok(ids)
}

/// Same as [`remap_frame`] for `rgb` crate pixels.
pub fn remap_frame_rgb<M: ColorMatcher + Sync + ?Sized>(
    pixels: &[rgb::RGB8],
    width: usize,
    matcher: &M,
) -> Result<Vec<EntryId>, MatchError> {
    let colors: Vec<Color> = pixels.iter().map(|&p| p.into()).collect();
    remap_frame(&colors, width, matcher)
}

fn remap_row<M: ColorMatcher + ?Sized>(row: &[Color], out: &mut [EntryId], matcher: &M) {
    for (slot, &pixel) in out.iter_mut().zip(row) {
        *slot = matcher.best_match(pixel).id;
    }
}

fn validate_frame(len: usize, width: usize) -> Result<(), MatchError> {
    if width == 0 {
        return Err(MatchError::ZeroDimension);
    }
    if len % width != 0 {
        return Err(MatchError::DimensionMismatch { len, width });
    }
    Ok(())
}

/// How far a matcher's answers are from the exact nearest entries.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccuracyReport {
    pub samples: usize,
    /// Samples whose match is exactly the brute-force answer.
    pub exact_matches: usize,
    /// Mean of `dist(match) - dist(nearest)` over all samples.
    pub mean_excess_sq: f64,
    pub max_excess_sq: u32,
}

impl AccuracyReport {
    pub fn exact_fraction(&self) -> f64 {
        if self.samples == 0 {
            return 1.0;
        }
        self.exact_matches as f64 / self.samples as f64
    }

    fn record(&mut self, excess: u32, exact: bool) {
        self.samples += 1;
        self.exact_matches += exact as usize;
        self.mean_excess_sq += excess as f64;
        self.max_excess_sq = self.max_excess_sq.max(excess);
    }

    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    fn merge(mut self, other: Self) -> Self {
        self.samples += other.samples;
        self.exact_matches += other.exact_matches;
        self.mean_excess_sq += other.mean_excess_sq;
        self.max_excess_sq = self.max_excess_sq.max(other.max_excess_sq);
        self
    }

    fn finish(mut self) -> Self {
        if self.samples > 0 {
            self.mean_excess_sq /= self.samples as f64;
        }
        self
    }
}

/// Compare `matcher` against a linear scan of its own palette.
pub fn measure_accuracy<M: ColorMatcher + Sync + ?Sized>(
    samples: &[Color],
    matcher: &M,
) -> AccuracyReport {
    let measure = |acc: AccuracyReport, &query: &Color| {
        let palette = matcher.palette();
        let got = matcher.best_match_index(query);
        let want = palette.nearest_index(query);
        let got_dist = query.distance_sq(palette.entries()[got].color);
        let want_dist = query.distance_sq(palette.entries()[want].color);
        let mut acc = acc;
        acc.record(got_dist - want_dist, got == want);
        acc
    };

    #[cfg(feature = "parallel")]
    let report = samples
        .par_iter()
        .fold(AccuracyReport::default, measure)
        .reduce(AccuracyReport::default, AccuracyReport::merge);

    #[cfg(not(feature = "parallel"))]
    let report = samples.iter().fold(AccuracyReport::default(), measure);

    report.finish()
}
