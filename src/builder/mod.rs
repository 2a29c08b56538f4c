mod propagate;
mod sort;
mod topology;

use std::ops::Index;

use log::debug;

use crate::geometry::{Aabb, Real};
use crate::morton::{self, MortonCode};
use crate::scheduler::{DefaultScheduler, Scheduler};
use crate::util::{SliceWriter, Stats};

const LEFT_IS_LEAF: u32 = 1;
const RIGHT_IS_LEAF: u32 = 1 << 1;

/// Internal node of the hierarchy.
///
/// A child reference is either another internal node index or, when the
/// corresponding leaf flag is set, a position in the sorted primitive
/// permutation. Leaves are not stored as nodes; a hierarchy over `n`
/// primitives has exactly `n - 1` internal nodes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Node<S: Real> {
    pub bounds: Aabb<S>,
    pub left: u32,
    pub right: u32,
    flags: u32,
}

impl<S: Real> Node<S> {
    pub fn left_is_leaf(&self) -> bool {
        self.flags & LEFT_IS_LEAF != 0
    }

    pub fn right_is_leaf(&self) -> bool {
        self.flags & RIGHT_IS_LEAF != 0
    }
}

/// Immutable bounding volume hierarchy. Built once by [`Builder::build`],
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Bvh<S: Real> {
    nodes: Vec<Node<S>>,
    perm: Vec<u32>,
}

impl<S: Real> Bvh<S> {
    /// Internal nodes; the root is at index 0. Empty for fewer than two
    /// primitives.
    pub fn nodes(&self) -> &[Node<S>] {
        &self.nodes
    }

    /// Permutation of the primitive indices in Morton order. Leaf references
    /// index into this table.
    pub fn perm(&self) -> &[u32] {
        &self.perm
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    /// Statistics over leaf depths (number of internal nodes on the path
    /// from the root).
    pub fn depth_statistics(&self) -> Stats {
        let mut stats = Stats::default();
        if self.nodes.is_empty() {
            if !self.perm.is_empty() {
                stats.add_sample(0);
            }
            return stats;
        }

        let mut stack = vec![(0u32, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index as usize];
            for (child, is_leaf) in [
                (node.left, node.left_is_leaf()),
                (node.right, node.right_is_leaf()),
            ] {
                if is_leaf {
                    stats.add_sample(depth);
                } else {
                    stack.push((child, depth + 1));
                }
            }
        }
        stats
    }

    #[cfg(test)]
    pub(crate) fn nodes_mut(&mut self) -> &mut [Node<S>] {
        &mut self.nodes
    }
}

impl<S: Real> Index<usize> for Bvh<S> {
    type Output = Node<S>;

    fn index(&self, index: usize) -> &Node<S> {
        &self.nodes[index]
    }
}

/// Constructs hierarchies from a primitive stream and a box derivation
/// callable.
///
/// The primitive order, the stable sort and the position tie-break make the
/// result deterministic: the same input produces the same tree on any worker
/// count.
#[derive(Clone, Debug, Default)]
pub struct Builder<Sch = DefaultScheduler> {
    scheduler: Sch,
}

impl Builder<DefaultScheduler> {
    pub fn new() -> Builder<DefaultScheduler> {
        Builder {
            scheduler: DefaultScheduler::default(),
        }
    }
}

impl<Sch: Scheduler> Builder<Sch> {
    pub fn with_scheduler(scheduler: Sch) -> Builder<Sch> {
        Builder { scheduler }
    }

    /// Builds the hierarchy. `box_of` maps a primitive to its bounding box;
    /// it is evaluated exactly once per primitive.
    pub fn build<S, P, F>(&self, primitives: &[P], box_of: F) -> Bvh<S>
    where
        S: Real,
        P: Sync,
        F: Fn(&P) -> Aabb<S> + Sync,
    {
        let len = primitives.len();
        if len == 0 {
            return Bvh {
                nodes: Vec::new(),
                perm: Vec::new(),
            };
        }

        let boxes = self.primitive_boxes(primitives, &box_of);
        let codes = self.morton_codes(&boxes);
        let perm = sort::sort_by_code(&self.scheduler, &codes);

        if len == 1 {
            return Bvh {
                nodes: Vec::new(),
                perm,
            };
        }

        let sorted_codes: Vec<MortonCode> =
            perm.iter().map(|&prim| codes[prim as usize]).collect();
        let (mut nodes, parents) = topology::build_topology(&self.scheduler, &sorted_codes);
        propagate::propagate_boxes(&self.scheduler, &mut nodes, &parents, &perm, &boxes);

        debug!(
            "built hierarchy over {} primitives ({} internal nodes)",
            len,
            nodes.len()
        );

        Bvh { nodes, perm }
    }

    fn primitive_boxes<S, P, F>(&self, primitives: &[P], box_of: &F) -> Vec<Aabb<S>>
    where
        S: Real,
        P: Sync,
        F: Fn(&P) -> Aabb<S> + Sync,
    {
        let mut boxes = vec![Aabb::empty(); primitives.len()];
        {
            let boxes_writer = SliceWriter::new(&mut boxes);
            self.scheduler.run(|div| {
                for i in div.shard(primitives.len()) {
                    unsafe { boxes_writer.set(i, box_of(&primitives[i])) };
                }
            });
        }
        boxes
    }

    fn morton_codes<S: Real>(&self, boxes: &[Aabb<S>]) -> Vec<MortonCode> {
        // Scene bounds are taken over centroids, not over the boxes
        // themselves: the grid only has to separate centroids.
        let mut partials = vec![Aabb::empty(); self.scheduler.shards() as usize];
        {
            let partials_writer = SliceWriter::new(&mut partials);
            self.scheduler.run(|div| {
                let mut bounds = Aabb::empty();
                for b in &boxes[div.shard(boxes.len())] {
                    bounds.grow(&b.center());
                }
                unsafe { partials_writer.set(div.idx as usize, bounds) };
            });
        }
        let scene_bounds = partials.iter().fold(Aabb::empty(), |acc, b| acc.union(b));

        let mut codes: Vec<MortonCode> = vec![0; boxes.len()];
        {
            let codes_writer = SliceWriter::new(&mut codes);
            self.scheduler.run(|div| {
                for i in div.shard(boxes.len()) {
                    let normalized =
                        morton::normalized_centroid(&scene_bounds, &boxes[i].center());
                    unsafe { codes_writer.set(i, morton::morton_code(&normalized)) };
                }
            });
        }
        codes
    }
}

/// Builds a hierarchy with the default scheduler.
pub fn build<S, P, F>(primitives: &[P], box_of: F) -> Bvh<S>
where
    S: Real,
    P: Sync,
    F: Fn(&P) -> Aabb<S> + Sync,
{
    Builder::new().build(primitives, box_of)
}
