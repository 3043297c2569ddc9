//! Nearest-palette color matching for character-cell renderers.
//!
//! A renderer produces continuous RGB colors; a terminal can only show a
//! fixed set of color/glyph combinations. This crate answers, once per
//! output pixel, which [`Palette`] entry is closest to a color.
//!
//! Two matchers implement [`ColorMatcher`]:
//!
//! - [`BruteForceMatcher`] scans the whole palette. It defines what
//!   "nearest" means (squared RGB distance, ties to the earlier entry).
//! - [`ColorOctree`] indexes the palette by channel bits and caps its leaf
//!   count at a configured capacity. With `capacity >= palette.len()` it
//!   agrees with the linear scan exactly; smaller capacities merge cells,
//!   trading accuracy for smaller per-leaf scans. Query cost is U-shaped in
//!   the capacity, so it is always an explicit [`MatchConfig`] value.
//!
//! ```
//! use zenmatch::{Color, ColorMatcher, EntryId, MatchConfig, Matcher, Palette};
//!
//! let palette = Palette::new([
//!     (Color::new(255, 0, 0), EntryId(1)),
//!     (Color::new(0, 255, 0), EntryId(2)),
//!     (Color::new(0, 0, 255), EntryId(3)),
//! ])?;
//! let matcher = Matcher::build(palette, &MatchConfig::octree(3))?;
//! assert_eq!(matcher.best_match(Color::new(250, 10, 5)).id, EntryId(1));
//! # Ok::<(), zenmatch::MatchError>(())
//! ```
#![forbid(unsafe_code)]

pub mod color;
pub mod error;
pub mod matcher;
pub mod octree;
pub mod palette;
pub mod presets;
mod reduce;
pub mod remap;

pub use color::Color;
pub use error::{ErrorKind, MatchError};
pub use matcher::{ColorMatcher, MatchConfig, MatchMode, Matcher, SharedMatcher};
pub use octree::{ColorOctree, LeafView, OctreeStats};
pub use palette::{BruteForceMatcher, EntryId, Palette, PaletteEntry};
pub use remap::AccuracyReport;

/// Internals exposed for tests and benchmarks. Not a stable API.
#[doc(hidden)]
pub mod _internals {
    use crate::color::Color;

    /// Child octant a color selects at `depth` (`0..8`).
    pub fn octant(color: Color, depth: u8) -> usize {
        color.octant(depth)
    }

    /// Squared distance from `color` to the cube at `origin` of the given depth.
    pub fn cube_distance_sq(origin: Color, depth: u8, color: Color) -> u32 {
        crate::octree::cube_distance_sq(origin.to_array(), depth, color)
    }
}
