use std::sync::Arc;

use parking_lot::RwLock;

use crate::color::Color;
use crate::error::MatchError;
use crate::octree::ColorOctree;
use crate::palette::{BruteForceMatcher, Palette, PaletteEntry};

/// Anything that answers "which palette entry is closest to this color".
///
/// Implementations never mutate shared state while matching.
pub trait ColorMatcher {
    /// Palette position of the match for `query`.
    fn best_match_index(&self, query: Color) -> usize;

    /// The palette matches are drawn from.
    fn palette(&self) -> &Palette;

    fn best_match(&self, query: Color) -> PaletteEntry {
        self.palette().entries()[self.best_match_index(query)]
    }
}

/// Which matcher to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchMode {
    /// Linear scan over the whole palette. Exact; useful for small
    /// palettes and as a test oracle.
    BruteForce,
    /// Color octree with at most `capacity` leaves.
    Octree { capacity: usize },
}

/// Matcher configuration.
///
/// Has no `Default`; the octree capacity is always chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchConfig {
    pub mode: MatchMode,
}

impl MatchConfig {
    pub fn octree(capacity: usize) -> Self {
        Self {
            mode: MatchMode::Octree { capacity },
        }
    }

    pub fn brute_force() -> Self {
        Self {
            mode: MatchMode::BruteForce,
        }
    }

    /// Switch to octree mode with the given capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.mode = MatchMode::Octree { capacity };
        self
    }
}

/// A built matcher, chosen once from a [`MatchConfig`].
#[derive(Debug, Clone)]
pub enum Matcher {
    BruteForce(BruteForceMatcher),
    Octree(ColorOctree),
}

impl Matcher {
    pub fn build(
        palette: impl Into<Arc<Palette>>,
        config: &MatchConfig,
    ) -> Result<Self, MatchError> {
        let palette = palette.into();
        match config.mode {
            MatchMode::BruteForce => Ok(Self::BruteForce(BruteForceMatcher::new(palette))),
            MatchMode::Octree { capacity } => {
                ColorOctree::build(palette, capacity).map(Self::Octree)
            }
        }
    }

    pub fn mode(&self) -> MatchMode {
        match self {
            Self::BruteForce(_) => MatchMode::BruteForce,
            Self::Octree(tree) => MatchMode::Octree {
                capacity: tree.capacity(),
            },
        }
    }

    pub fn as_octree(&self) -> Option<&ColorOctree> {
        match self {
            Self::Octree(tree) => Some(tree),
            Self::BruteForce(_) => None,
        }
    }
}

impl ColorMatcher for Matcher {
    #[inline]
    fn best_match_index(&self, query: Color) -> usize {
        match self {
            Self::BruteForce(m) => m.best_match_index(query),
            Self::Octree(m) => m.best_match_index(query),
        }
    }

    fn palette(&self) -> &Palette {
        match self {
            Self::BruteForce(m) => m.palette(),
            Self::Octree(m) => m.palette(),
        }
    }
}

/// Holder for the matcher snapshot that render workers read.
///
/// Workers call [`snapshot`](Self::snapshot) once per frame (or tile) and
/// query the returned `Arc` without any locking. Replacing the palette or
/// capacity builds a new matcher and swaps it in; snapshots already handed
/// out stay valid and unchanged until dropped.
#[derive(Debug)]
pub struct SharedMatcher {
    current: RwLock<Arc<Matcher>>,
}

impl SharedMatcher {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            current: RwLock::new(Arc::new(matcher)),
        }
    }

    pub fn build(palette: impl Into<Arc<Palette>>, config: &MatchConfig) -> Result<Self, MatchError> {
        Matcher::build(palette, config).map(Self::new)
    }

    pub fn snapshot(&self) -> Arc<Matcher> {
        Arc::clone(&self.current.read())
    }

    /// Swap in `matcher`, returning the previous snapshot.
    pub fn replace(&self, matcher: Matcher) -> Arc<Matcher> {
        let mode = matcher.mode();
        let previous = std::mem::replace(&mut *self.current.write(), Arc::new(matcher));
        tracing::debug!(?mode, "replaced matcher snapshot");
        previous
    }

    /// Build a matcher and swap it in. On error the current snapshot is
    /// left in place.
    pub fn rebuild(
        &self,
        palette: impl Into<Arc<Palette>>,
        config: &MatchConfig,
    ) -> Result<(), MatchError> {
        let matcher = Matcher::build(palette, config)?;
        self.replace(matcher);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::EntryId;

    fn rgb_palette() -> Arc<Palette> {
        Arc::new(
            Palette::new([
                (Color::new(255, 0, 0), EntryId(1)),
                (Color::new(0, 255, 0), EntryId(2)),
                (Color::new(0, 0, 255), EntryId(3)),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn config_selects_mode() {
        let m = Matcher::build(rgb_palette(), &MatchConfig::brute_force()).unwrap();
        assert_eq!(m.mode(), MatchMode::BruteForce);
        assert!(m.as_octree().is_none());

        let m = Matcher::build(rgb_palette(), &MatchConfig::octree(2)).unwrap();
        assert_eq!(m.mode(), MatchMode::Octree { capacity: 2 });
        assert!(m.as_octree().unwrap().leaf_count() <= 2);

        let config = MatchConfig::brute_force().with_capacity(5);
        assert_eq!(config.mode, MatchMode::Octree { capacity: 5 });
    }

    #[test]
    fn zero_capacity_fails() {
        let err = Matcher::build(rgb_palette(), &MatchConfig::octree(0)).unwrap_err();
        assert_eq!(err, MatchError::InvalidCapacity(0));
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn both_modes_agree_on_scenario() {
        for config in [MatchConfig::brute_force(), MatchConfig::octree(3), MatchConfig::octree(1)] {
            let m = Matcher::build(rgb_palette(), &config).unwrap();
            assert_eq!(m.best_match(Color::new(250, 10, 5)).id, EntryId(1), "{config:?}");
            assert_eq!(m.best_match(Color::new(10, 10, 230)).id, EntryId(3), "{config:?}");
        }
    }

    #[test]
    fn replace_keeps_old_snapshot_intact() {
        let shared = SharedMatcher::build(rgb_palette(), &MatchConfig::octree(3)).unwrap();
        let before = shared.snapshot();

        let gray = Arc::new(Palette::from_colors([Color::new(128, 128, 128)]).unwrap());
        shared.rebuild(gray, &MatchConfig::brute_force()).unwrap();

        assert_eq!(before.best_match(Color::new(250, 10, 5)).id, EntryId(1));
        assert_eq!(before.palette().len(), 3);
        let after = shared.snapshot();
        assert_eq!(after.palette().len(), 1);
        assert_eq!(after.mode(), MatchMode::BruteForce);
    }

    #[test]
    fn failed_rebuild_leaves_snapshot() {
        let shared = SharedMatcher::build(rgb_palette(), &MatchConfig::octree(3)).unwrap();
        let err = shared.rebuild(rgb_palette(), &MatchConfig::octree(0));
        assert!(err.is_err());
        assert_eq!(shared.snapshot().mode(), MatchMode::Octree { capacity: 3 });
    }
}
