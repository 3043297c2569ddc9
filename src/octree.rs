use std::sync::Arc;

use smallvec::SmallVec;

use crate::color::{CHANNEL_BITS, Color};
use crate::error::MatchError;
use crate::matcher::ColorMatcher;
use crate::palette::{Palette, PaletteEntry};

pub(crate) type NodeId = u32;

/// Root of every octree arena.
pub(crate) const ROOT: NodeId = 0;

/// A node of the frozen octree: an axis-aligned cube of RGB space.
///
/// The cube spans `origin ..= origin + (256 >> depth) - 1` on each channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) origin: [u8; 3],
    pub(crate) depth: u8,
    pub(crate) kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Internal { children: [Option<NodeId>; 8] },
    Leaf(Leaf),
}

/// Leaf payload. Members live in the octree's shared `members` buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Leaf {
    pub(crate) representative: Color,
    pub(crate) start: u32,
    pub(crate) len: u32,
}

/// An immutable color octree over a palette.
///
/// Built once with [`ColorOctree::build`] and never mutated afterwards, so a
/// single instance can serve any number of threads without locking.
#[derive(Debug, Clone)]
pub struct ColorOctree {
    palette: Arc<Palette>,
    /// Node arena, depth-first, root first.
    nodes: Vec<Node>,
    /// Palette positions grouped per leaf, ascending within each leaf.
    members: Vec<u32>,
    capacity: usize,
    leaf_count: usize,
}

/// Read-only view of one leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafView<'a> {
    /// Subdivision depth, `0` for the root.
    pub depth: u8,
    /// Lowest corner of the leaf's cube.
    pub origin: Color,
    /// Mean of the member colors, rounded per channel.
    pub representative: Color,
    /// Palette positions of the members, ascending.
    pub members: &'a [u32],
}

impl LeafView<'_> {
    /// Edge length of the leaf's cube.
    pub fn extent(&self) -> u16 {
        256 >> self.depth
    }
}

/// Shape summary used by tuning tools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeStats {
    pub leaf_count: usize,
    pub node_count: usize,
    pub max_depth: u8,
    pub max_leaf_len: usize,
    pub mean_leaf_len: f64,
}

impl ColorOctree {
    /// Build an octree over `palette` holding at most `capacity` leaves.
    ///
    /// `capacity >= palette.len()` yields an exact index. Smaller capacities
    /// merge sibling cells bottom-up, least populated first.
    pub fn build(palette: impl Into<Arc<Palette>>, capacity: usize) -> Result<Self, MatchError> {
        crate::reduce::build_octree(palette.into(), capacity)
    }

    pub(crate) fn from_parts(
        palette: Arc<Palette>,
        nodes: Vec<Node>,
        members: Vec<u32>,
        capacity: usize,
        leaf_count: usize,
    ) -> Self {
        debug_assert_eq!(members.len(), palette.len());
        debug_assert!(leaf_count <= capacity);
        Self {
            palette,
            nodes,
            members,
            capacity,
            leaf_count,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn shared_palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    /// All leaves in depth-first, octant order.
    pub fn leaves(&self) -> impl Iterator<Item = LeafView<'_>> + '_ {
        self.nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Leaf(leaf) => Some(self.view(node, leaf)),
            NodeKind::Internal { .. } => None,
        })
    }

    /// The leaf whose cube contains `query`, if the descent reaches one.
    pub fn locate(&self, query: Color) -> Option<LeafView<'_>> {
        match self.descend(query) {
            Descent::Leaf(id) => {
                let node = &self.nodes[id as usize];
                match &node.kind {
                    NodeKind::Leaf(leaf) => Some(self.view(node, leaf)),
                    NodeKind::Internal { .. } => None,
                }
            }
            Descent::Missing => None,
        }
    }

    pub fn stats(&self) -> OctreeStats {
        let mut max_depth = 0;
        let mut max_leaf_len = 0;
        for leaf in self.leaves() {
            max_depth = max_depth.max(leaf.depth);
            max_leaf_len = max_leaf_len.max(leaf.members.len());
        }
        OctreeStats {
            leaf_count: self.leaf_count,
            node_count: self.nodes.len(),
            max_depth,
            max_leaf_len,
            mean_leaf_len: self.members.len() as f64 / self.leaf_count.max(1) as f64,
        }
    }

    /// Palette position of the match for `query`.
    ///
    /// Descends by the query's octant bits to the leaf covering it and scans
    /// that leaf's members. Once reduction has merged cells this is an
    /// approximation: the answer is the nearest member of the reached leaf,
    /// not necessarily of the whole palette. If the descent hits an octant
    /// with no palette entries, an exact nearest search over the whole tree
    /// answers instead.
    pub fn best_match_index(&self, query: Color) -> usize {
        match self.descend(query) {
            Descent::Leaf(id) => match &self.nodes[id as usize].kind {
                NodeKind::Leaf(leaf) => self.scan(leaf, query).0 as usize,
                NodeKind::Internal { .. } => unreachable!("descent stopped on an internal node"),
            },
            Descent::Missing => self.nearest_populated(query) as usize,
        }
    }

    fn descend(&self, query: Color) -> Descent {
        let mut id = ROOT;
        loop {
            let node = &self.nodes[id as usize];
            match &node.kind {
                NodeKind::Leaf(_) => return Descent::Leaf(id),
                NodeKind::Internal { children } => match children[query.octant(node.depth)] {
                    Some(child) => id = child,
                    None => return Descent::Missing,
                },
            }
        }
    }

    fn scan(&self, leaf: &Leaf, query: Color) -> (u32, u32) {
        let start = leaf.start as usize;
        let members = &self.members[start..start + leaf.len as usize];
        self.palette.nearest_among(query, members)
    }

    /// Exact branch-and-bound nearest search over every leaf.
    ///
    /// Children are pushed farthest-first so the nearest cube is explored
    /// first; a subtree is skipped when its cube is strictly farther than
    /// the best distance so far. Equal distances resolve to the lower
    /// palette position, matching the linear scan.
    fn nearest_populated(&self, query: Color) -> u32 {
        // Depth-first with at most 7 pending siblings per level.
        let mut stack: SmallVec<[(NodeId, u32); 64]> = SmallVec::new();
        stack.push((ROOT, 0));

        let mut best_idx = u32::MAX;
        let mut best_dist = u32::MAX;

        while let Some((id, bound)) = stack.pop() {
            if bound > best_dist {
                continue;
            }
            let node = &self.nodes[id as usize];
            match &node.kind {
                NodeKind::Leaf(leaf) => {
                    let (idx, dist) = self.scan(leaf, query);
                    if dist < best_dist || (dist == best_dist && idx < best_idx) {
                        best_idx = idx;
                        best_dist = dist;
                    }
                }
                NodeKind::Internal { children } => {
                    let mut pending: SmallVec<[(NodeId, u32); 8]> = children
                        .iter()
                        .flatten()
                        .map(|&child| (child, box_distance_sq(&self.nodes[child as usize], query)))
                        .filter(|&(_, d)| d <= best_dist)
                        .collect();
                    pending.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
                    stack.extend(pending);
                }
            }
        }

        debug_assert!(best_idx != u32::MAX, "octree has no leaves");
        best_idx
    }

    fn view<'a>(&'a self, node: &Node, leaf: &Leaf) -> LeafView<'a> {
        let start = leaf.start as usize;
        LeafView {
            depth: node.depth,
            origin: Color::from(node.origin),
            representative: leaf.representative,
            members: &self.members[start..start + leaf.len as usize],
        }
    }

    /// Palette entries of a leaf's members.
    pub fn leaf_entries<'a>(&'a self, leaf: LeafView<'a>) -> impl Iterator<Item = &'a PaletteEntry> {
        let palette = &self.palette;
        leaf.members.iter().map(move |&i| &palette.entries()[i as usize])
    }
}

enum Descent {
    Leaf(NodeId),
    Missing,
}

impl ColorMatcher for ColorOctree {
    fn best_match_index(&self, query: Color) -> usize {
        ColorOctree::best_match_index(self, query)
    }

    fn palette(&self) -> &Palette {
        &self.palette
    }
}

/// Squared distance from `query` to the nearest point of the node's cube.
pub(crate) fn box_distance_sq(node: &Node, query: Color) -> u32 {
    cube_distance_sq(node.origin, node.depth, query)
}

pub(crate) fn cube_distance_sq(origin: [u8; 3], depth: u8, query: Color) -> u32 {
    debug_assert!(depth <= CHANNEL_BITS);
    let extent = 256i32 >> depth;
    query
        .to_array()
        .iter()
        .zip(origin)
        .map(|(&q, lo)| {
            let (q, lo) = (q as i32, lo as i32);
            let hi = lo + extent - 1;
            let d = if q < lo {
                lo - q
            } else if q > hi {
                q - hi
            } else {
                0
            };
            (d * d) as u32
        })
        .sum()
}
