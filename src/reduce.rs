//! Octree build pipeline: insertion, bottom-up leaf reduction, freezing.
//!
//! Every palette entry is first inserted down to depth 8, giving one leaf
//! per distinct color. While the leaf count exceeds the capacity, the
//! deepest internal nodes (whose children are then all leaves) are folded
//! into their parents: the parent becomes a leaf holding its children's
//! summed color mass and the union of their members. Within a level the
//! least populated nodes fold first, ties by creation order, and folding
//! stops as soon as the leaf count fits. The merge sequence is therefore
//! independent of the capacity, which only decides where it stops.
//!
//! The result is frozen into a compact depth-first arena for querying.

use std::sync::Arc;

use crate::color::{CHANNEL_BITS, Color};
use crate::error::MatchError;
use crate::octree::{ColorOctree, Leaf, Node, NodeId, NodeKind};
use crate::palette::Palette;

/// Octree node under construction.
#[derive(Debug, Clone)]
struct BuildNode {
    origin: [u8; 3],
    depth: u8,
    children: [Option<usize>; 8],
    /// Per-channel sum of member colors. Only meaningful on leaves.
    sum: [u64; 3],
    count: u32,
    members: Vec<u32>,
    leaf: bool,
}

impl BuildNode {
    fn new(origin: [u8; 3], depth: u8) -> Self {
        Self {
            origin,
            depth,
            children: [None; 8],
            sum: [0; 3],
            count: 0,
            members: Vec::new(),
            leaf: depth == CHANNEL_BITS,
        }
    }

    fn representative(&self) -> Color {
        debug_assert!(self.count > 0);
        let n = self.count as u64;
        let avg = |s: u64| ((s + n / 2) / n) as u8;
        Color::new(avg(self.sum[0]), avg(self.sum[1]), avg(self.sum[2]))
    }
}

struct OctreeBuilder {
    nodes: Vec<BuildNode>,
    /// Internal nodes by depth, in creation order.
    levels: [Vec<usize>; CHANNEL_BITS as usize],
    leaf_count: usize,
}

impl OctreeBuilder {
    fn new() -> Self {
        Self {
            nodes: vec![BuildNode::new([0; 3], 0)],
            levels: std::array::from_fn(|d| if d == 0 { vec![0] } else { Vec::new() }),
            leaf_count: 0,
        }
    }

    fn insert(&mut self, position: u32, color: Color) {
        let mut id = 0;
        for depth in 0..CHANNEL_BITS {
            let octant = color.octant(depth);
            let next = self.nodes[id].children[octant];
            id = match next {
                Some(child) => child,
                None => self.add_child(id, octant),
            };
        }

        let leaf = &mut self.nodes[id];
        debug_assert!(leaf.leaf);
        leaf.sum[0] += color.r as u64;
        leaf.sum[1] += color.g as u64;
        leaf.sum[2] += color.b as u64;
        leaf.count += 1;
        leaf.members.push(position);
    }

    fn add_child(&mut self, parent: usize, octant: usize) -> usize {
        let (origin, depth) = {
            let p = &self.nodes[parent];
            let half = 128u8 >> p.depth;
            let mut origin = p.origin;
            for (channel, bit) in [(0, 0b100), (1, 0b010), (2, 0b001)] {
                if octant & bit != 0 {
                    origin[channel] += half;
                }
            }
            (origin, p.depth + 1)
        };

        let id = self.nodes.len();
        self.nodes.push(BuildNode::new(origin, depth));
        self.nodes[parent].children[octant] = Some(id);

        if depth == CHANNEL_BITS {
            self.leaf_count += 1;
        } else {
            self.levels[depth as usize].push(id);
        }
        id
    }

    /// Fold levels bottom-up until at most `capacity` leaves remain.
    /// Returns the number of folds performed.
    fn reduce(&mut self, capacity: usize) -> usize {
        let mut folds = 0;

        for depth in (0..CHANNEL_BITS as usize).rev() {
            if self.leaf_count <= capacity {
                break;
            }

            let mut candidates = std::mem::take(&mut self.levels[depth]);
            for &id in &candidates {
                self.gather(id);
            }
            candidates.sort_by_key(|&id| (self.nodes[id].count, id));

            let before = self.leaf_count;
            for &id in &candidates {
                if self.leaf_count <= capacity {
                    break;
                }
                self.fold(id);
                folds += 1;
            }
            tracing::trace!(
                depth,
                candidates = candidates.len(),
                leaves_before = before,
                leaves_after = self.leaf_count,
                "reduced octree level"
            );
        }

        debug_assert!(self.leaf_count <= capacity);
        folds
    }

    /// Sum the children's counts into an internal node whose children are
    /// all leaves, so folds can be ordered by population.
    fn gather(&mut self, id: usize) {
        let count: u32 = self.nodes[id]
            .children
            .iter()
            .flatten()
            .map(|&c| {
                debug_assert!(self.nodes[c].leaf);
                self.nodes[c].count
            })
            .sum();
        self.nodes[id].count = count;
    }

    fn fold(&mut self, id: usize) {
        let children = std::mem::replace(&mut self.nodes[id].children, [None; 8]);
        let mut sum = [0u64; 3];
        let mut members = Vec::new();
        let mut merged = 0;

        for child in children.into_iter().flatten() {
            let child = &mut self.nodes[child];
            debug_assert!(child.leaf);
            for (acc, s) in sum.iter_mut().zip(child.sum) {
                *acc += s;
            }
            members.append(&mut child.members);
            merged += 1;
        }

        let node = &mut self.nodes[id];
        node.sum = sum;
        node.members = members;
        node.leaf = true;
        debug_assert_eq!(node.count as usize, node.members.len());
        self.leaf_count = self.leaf_count + 1 - merged;
    }

    /// Copy the reachable tree into a depth-first arena with a shared
    /// member buffer.
    fn freeze(self, palette: Arc<Palette>, capacity: usize) -> ColorOctree {
        let mut nodes = Vec::new();
        let mut members = Vec::with_capacity(palette.len());
        self.freeze_node(0, &mut nodes, &mut members);

        ColorOctree::from_parts(palette, nodes, members, capacity, self.leaf_count)
    }

    fn freeze_node(&self, id: usize, nodes: &mut Vec<Node>, members: &mut Vec<u32>) -> NodeId {
        let node = &self.nodes[id];
        let frozen_id = nodes.len() as NodeId;

        if node.leaf {
            let start = members.len() as u32;
            let mut own = node.members.clone();
            own.sort_unstable();
            members.extend_from_slice(&own);
            nodes.push(Node {
                origin: node.origin,
                depth: node.depth,
                kind: NodeKind::Leaf(Leaf {
                    representative: node.representative(),
                    start,
                    len: own.len() as u32,
                }),
            });
            return frozen_id;
        }

        nodes.push(Node {
            origin: node.origin,
            depth: node.depth,
            kind: NodeKind::Internal {
                children: [None; 8],
            },
        });

        let mut frozen_children = [None; 8];
        for (octant, child) in node.children.iter().enumerate() {
            if let Some(child) = *child {
                frozen_children[octant] = Some(self.freeze_node(child, nodes, members));
            }
        }
        nodes[frozen_id as usize].kind = NodeKind::Internal {
            children: frozen_children,
        };
        frozen_id
    }
}

/// Build a [`ColorOctree`] over `palette` with at most `capacity` leaves.
pub(crate) fn build_octree(
    palette: Arc<Palette>,
    capacity: usize,
) -> Result<ColorOctree, MatchError> {
    if capacity == 0 {
        return Err(MatchError::InvalidCapacity(capacity));
    }
    if palette.is_empty() {
        return Err(MatchError::EmptyPalette);
    }

    let mut builder = OctreeBuilder::new();
    for (position, entry) in palette.entries().iter().enumerate() {
        builder.insert(position as u32, entry.color);
    }
    let distinct_cells = builder.leaf_count;
    let folds = builder.reduce(capacity);
    let leaves = builder.leaf_count;

    let tree = builder.freeze(palette, capacity);
    tracing::debug!(
        palette = tree.palette().len(),
        capacity,
        distinct_cells,
        folds,
        leaves,
        nodes = tree.node_count(),
        "built color octree"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::EntryId;

    fn gray_ramp(n: u32) -> Arc<Palette> {
        Arc::new(
            Palette::from_colors((0..n).map(|i| {
                let v = (i * 255 / (n - 1).max(1)) as u8;
                Color::new(v, v, v)
            }))
            .unwrap(),
        )
    }

    #[test]
    #[tracing_test::traced_test]
    fn build_logs_summary() {
        build_octree(gray_ramp(8), 2).unwrap();
        assert!(logs_contain("built color octree"));
        assert!(logs_contain("reduced octree level"));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = build_octree(gray_ramp(4), 0);
        assert!(matches!(result, Err(MatchError::InvalidCapacity(0))));
    }

    #[test]
    fn child_origins_follow_octant_bits() {
        let mut b = OctreeBuilder::new();
        let c = b.add_child(0, 0b101);
        assert_eq!(b.nodes[c].origin, [128, 0, 128]);
        assert_eq!(b.nodes[c].depth, 1);
        let gc = b.add_child(c, 0b010);
        assert_eq!(b.nodes[gc].origin, [128, 64, 128]);
    }

    #[test]
    fn insertion_lands_on_exact_cell() {
        let mut b = OctreeBuilder::new();
        b.insert(0, Color::new(12, 200, 77));
        b.insert(1, Color::new(12, 200, 77));
        assert_eq!(b.leaf_count, 1);
        let leaf = b.nodes.iter().find(|n| n.leaf).unwrap();
        assert_eq!(leaf.origin, [12, 200, 77]);
        assert_eq!(leaf.count, 2);
        assert_eq!(leaf.members, vec![0, 1]);
        // Root plus one node per level
        assert_eq!(b.nodes.len(), 9);
    }

    #[test]
    fn no_reduction_when_capacity_suffices() {
        let tree = build_octree(gray_ramp(16), 16).unwrap();
        assert_eq!(tree.leaf_count(), 16);
        assert!(tree.leaves().all(|l| l.depth == 8));
    }

    #[test]
    fn reduction_respects_capacity() {
        for capacity in 1..=20 {
            let tree = build_octree(gray_ramp(20), capacity).unwrap();
            assert!(tree.leaf_count() <= capacity, "capacity {capacity}");
            let total: usize = tree.leaves().map(|l| l.members.len()).sum();
            assert_eq!(total, 20);
        }
    }

    #[test]
    fn fold_merges_mass() {
        let palette = Arc::new(
            Palette::new([
                (Color::new(0, 0, 0), EntryId(10)),
                (Color::new(1, 1, 1), EntryId(11)),
                (Color::new(1, 0, 0), EntryId(12)),
            ])
            .unwrap(),
        );
        // All three share a depth-7 parent: folding once leaves one leaf.
        let tree = build_octree(palette, 1).unwrap();
        let leaves: Vec<_> = tree.leaves().collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].depth, 7);
        assert_eq!(leaves[0].origin, Color::new(0, 0, 0));
        assert_eq!(leaves[0].members, &[0, 1, 2]);
        // (0+1+1)/3, (0+1+0)/3, (0+1+0)/3 rounded
        assert_eq!(leaves[0].representative, Color::new(1, 0, 0));
    }

    #[test]
    fn least_populated_folds_first() {
        // Two depth-7 groups: three near-black colors and a near-gray pair.
        let palette = Arc::new(
            Palette::from_colors([
                Color::new(0, 0, 0),
                Color::new(0, 0, 1),
                Color::new(1, 0, 0),
                Color::new(200, 200, 200),
                Color::new(200, 200, 201),
            ])
            .unwrap(),
        );
        // Folding the smaller group (2 leaves -> 1) is enough for capacity 4.
        let tree = build_octree(palette, 4).unwrap();
        assert_eq!(tree.leaf_count(), 4);
        let merged: Vec<_> = tree.leaves().filter(|l| l.members.len() > 1).collect();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].members, &[3, 4]);
    }
}
