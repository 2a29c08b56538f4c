use crate::geometry::{Aabb, Real};
use crate::morton::MortonCode;
use crate::scheduler::Scheduler;
use crate::util::SliceWriter;

use super::{LEFT_IS_LEAF, Node, RIGHT_IS_LEAF};

/// Marks the root in the parent tables.
pub(super) const NO_PARENT: u32 = u32::MAX;

/// Upward links materialized for the bottom-up box pass, kept out of `Node`
/// so the hot traversal struct stays purely downward.
pub(super) struct ParentLinks {
    /// Parent internal node of each sorted leaf position.
    pub leaf: Vec<u32>,
    /// Parent internal node of each internal node; `NO_PARENT` for the root.
    pub node: Vec<u32>,
}

/// Derives the internal-node topology from the sorted code sequence. Each of
/// the `len - 1` internal nodes depends only on code prefixes, so the shards
/// need no synchronization beyond the final join.
pub(super) fn build_topology<S: Real, Sch: Scheduler>(
    scheduler: &Sch,
    codes: &[MortonCode],
) -> (Vec<Node<S>>, ParentLinks) {
    let leaf_count = codes.len();
    let node_count = leaf_count - 1;

    let placeholder = Node {
        bounds: Aabb::empty(),
        left: 0,
        right: 0,
        flags: 0,
    };
    let mut nodes = vec![placeholder; node_count];
    let mut leaf_parent = vec![NO_PARENT; leaf_count];
    let mut node_parent = vec![NO_PARENT; node_count];

    {
        let nodes_writer = SliceWriter::new(&mut nodes);
        let leaf_parent_writer = SliceWriter::new(&mut leaf_parent);
        let node_parent_writer = SliceWriter::new(&mut node_parent);

        scheduler.run(|div| {
            for i in div.shard(node_count) {
                let links = node_links(codes, i);

                let mut flags = 0;
                if links.left_is_leaf {
                    flags |= LEFT_IS_LEAF;
                    // Each leaf has exactly one parent, so the write is disjoint.
                    unsafe { leaf_parent_writer.set(links.left as usize, i as u32) };
                } else {
                    unsafe { node_parent_writer.set(links.left as usize, i as u32) };
                }
                if links.right_is_leaf {
                    flags |= RIGHT_IS_LEAF;
                    unsafe { leaf_parent_writer.set(links.right as usize, i as u32) };
                } else {
                    unsafe { node_parent_writer.set(links.right as usize, i as u32) };
                }

                let node = Node {
                    bounds: Aabb::empty(),
                    left: links.left,
                    right: links.right,
                    flags,
                };
                unsafe { nodes_writer.set(i, node) };
            }
        });
    }

    (
        nodes,
        ParentLinks {
            leaf: leaf_parent,
            node: node_parent,
        },
    )
}

struct NodeLinks {
    left: u32,
    left_is_leaf: bool,
    right: u32,
    right_is_leaf: bool,
}

/// Longest-common-prefix ordering key between sorted code positions.
///
/// Positions outside the code range compare as -1. Equal codes fall back to
/// the common prefix of the positions themselves, which makes the order
/// strict and the resulting tree unique even when every code collides.
fn delta(codes: &[MortonCode], i: usize, j: i64) -> i32 {
    if j < 0 || j >= codes.len() as i64 {
        return -1;
    }

    let a = codes[i];
    let b = codes[j as usize];
    if a == b {
        32 + (i as u32 ^ j as u32).leading_zeros() as i32
    } else {
        (a ^ b).leading_zeros() as i32
    }
}

/// Finds the range covered by internal node `i`, its split position and the
/// resulting child references.
fn node_links(codes: &[MortonCode], i: usize) -> NodeLinks {
    let ii = i as i64;

    let d: i64 = if delta(codes, i, ii + 1) > delta(codes, i, ii - 1) {
        1
    } else {
        -1
    };

    // The other end of the range shares a strictly longer prefix with i than
    // anything outside the range does.
    let delta_min = delta(codes, i, ii - d);

    let mut l_max: i64 = 2;
    while delta(codes, i, ii + l_max * d) > delta_min {
        l_max <<= 1;
    }

    let mut l: i64 = 0;
    let mut t = l_max >> 1;
    while t >= 1 {
        if delta(codes, i, ii + (l + t) * d) > delta_min {
            l += t;
        }
        t >>= 1;
    }
    let j = ii + l * d;

    // Highest position in the range whose prefix is longer than the range's
    // own; the child ranges split right after it.
    let delta_node = delta(codes, i, j);
    let mut s: i64 = 0;
    let mut t = l;
    while t > 1 {
        t = (t + 1) >> 1;
        if delta(codes, i, ii + (s + t) * d) > delta_node {
            s += t;
        }
    }
    let gamma = ii + s * d + d.min(0);

    NodeLinks {
        left: gamma as u32,
        left_is_leaf: ii.min(j) == gamma,
        right: (gamma + 1) as u32,
        right_is_leaf: ii.max(j) == gamma + 1,
    }
}
