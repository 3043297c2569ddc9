use std::collections::HashSet;
use std::sync::Arc;

use crate::color::Color;
use crate::error::MatchError;
use crate::matcher::ColorMatcher;

/// Opaque identifier attached to a palette entry by whoever loaded it.
///
/// The core never interprets it; renderers map it to a glyph or color code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryId(pub u32);

/// A representable output color and its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaletteEntry {
    pub color: Color,
    pub id: EntryId,
}

/// A fixed, non-empty, ordered set of output colors.
///
/// Iteration order is the order the entries were supplied in and is what
/// breaks distance ties. Palettes are immutable; share them with `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Largest supported palette. Entry positions are stored as `u32`.
    pub const MAX_LEN: usize = u32::MAX as usize;

    /// Build a palette from `(color, id)` pairs in their display order.
    ///
    /// Fails if there are no entries or an id repeats.
    pub fn new(entries: impl IntoIterator<Item = (Color, EntryId)>) -> Result<Self, MatchError> {
        let entries: Vec<PaletteEntry> = entries
            .into_iter()
            .map(|(color, id)| PaletteEntry { color, id })
            .collect();

        if entries.is_empty() {
            return Err(MatchError::EmptyPalette);
        }
        if entries.len() > Self::MAX_LEN {
            return Err(MatchError::PaletteTooLarge {
                len: entries.len(),
                max: Self::MAX_LEN,
            });
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(MatchError::DuplicateId(entry.id.0));
            }
        }

        Ok(Self { entries })
    }

    /// Build a palette whose ids are the entry positions.
    pub fn from_colors(colors: impl IntoIterator<Item = Color>) -> Result<Self, MatchError> {
        Self::new(
            colors
                .into_iter()
                .enumerate()
                .map(|(i, c)| (c, EntryId(i as u32))),
        )
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PaletteEntry> {
        self.entries.get(index)
    }

    /// Position of the entry carrying `id`.
    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; construction rejects empty palettes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the nearest entry by squared RGB distance (linear scan).
    ///
    /// Ties go to the entry that comes first.
    pub fn nearest_index(&self, query: Color) -> usize {
        let mut best_idx = 0;
        let mut best_dist = u32::MAX;

        for (i, entry) in self.entries.iter().enumerate() {
            let d = query.distance_sq(entry.color);
            if d < best_dist {
                best_dist = d;
                best_idx = i;
                if d == 0 {
                    break;
                }
            }
        }

        best_idx
    }

    /// Nearest entry among the given positions, which must be ascending.
    /// Returns `(position, distance)`.
    pub(crate) fn nearest_among(&self, query: Color, positions: &[u32]) -> (u32, u32) {
        debug_assert!(!positions.is_empty());
        let mut best = (positions[0], u32::MAX);

        for &i in positions {
            let d = query.distance_sq(self.entries[i as usize].color);
            if d < best.1 {
                best = (i, d);
                if d == 0 {
                    break;
                }
            }
        }

        best
    }
}

/// The linear-scan baseline. Defines what "nearest" means for every other
/// matcher in the crate.
#[derive(Debug, Clone)]
pub struct BruteForceMatcher {
    palette: Arc<Palette>,
}

impl BruteForceMatcher {
    pub fn new(palette: impl Into<Arc<Palette>>) -> Self {
        Self {
            palette: palette.into(),
        }
    }
}

impl ColorMatcher for BruteForceMatcher {
    fn best_match_index(&self, query: Color) -> usize {
        self.palette.nearest_index(query)
    }

    fn palette(&self) -> &Palette {
        &self.palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_palette() -> Palette {
        Palette::new([
            (Color::new(255, 0, 0), EntryId(1)),
            (Color::new(0, 255, 0), EntryId(2)),
            (Color::new(0, 0, 255), EntryId(3)),
        ])
        .unwrap()
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert_eq!(Palette::new(Vec::new()), Err(MatchError::EmptyPalette));
        assert_eq!(Palette::from_colors(Vec::new()), Err(MatchError::EmptyPalette));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = Palette::new([
            (Color::new(1, 1, 1), EntryId(7)),
            (Color::new(2, 2, 2), EntryId(7)),
        ]);
        assert_eq!(result, Err(MatchError::DuplicateId(7)));
    }

    #[test]
    fn duplicate_colors_are_allowed() {
        let p = Palette::from_colors([Color::WHITE, Color::WHITE]).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.nearest_index(Color::WHITE), 0);
    }

    #[test]
    fn nearest_finds_closest() {
        let p = rgb_palette();
        assert_eq!(p.nearest_index(Color::new(250, 10, 5)), 0);
        assert_eq!(p.nearest_index(Color::new(10, 10, 230)), 2);
        assert_eq!(p.nearest_index(Color::new(20, 200, 40)), 1);
    }

    #[test]
    fn ties_go_to_first_entry() {
        let p = Palette::from_colors([Color::new(0, 0, 0), Color::new(20, 0, 0)]).unwrap();
        // (10, 0, 0) is 100 away from both
        assert_eq!(p.nearest_index(Color::new(10, 0, 0)), 0);
    }

    #[test]
    fn nearest_among_respects_subset() {
        let p = rgb_palette();
        let (i, d) = p.nearest_among(Color::new(250, 10, 5), &[1, 2]);
        assert_eq!(i, 1);
        assert_eq!(d, Color::new(250, 10, 5).distance_sq(Color::new(0, 255, 0)));
    }

    #[test]
    fn brute_force_returns_entry() {
        let m = BruteForceMatcher::new(rgb_palette());
        assert_eq!(m.best_match(Color::new(250, 10, 5)).id, EntryId(1));
        assert_eq!(m.palette().index_of(EntryId(3)), Some(2));
    }
}
