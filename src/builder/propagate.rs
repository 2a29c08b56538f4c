use std::sync::atomic::{AtomicU32, Ordering};

use crate::geometry::{Aabb, Real};
use crate::scheduler::Scheduler;
use crate::util::SliceWriter;

use super::Node;
use super::topology::{NO_PARENT, ParentLinks};

/// Fills every internal node's box with the exact union of its children's
/// boxes.
///
/// Internal node indices are not ordered bottom-up, so one walk starts per
/// leaf and climbs toward the root. A per-node arrival counter decides who
/// may proceed: the first arriving child stops (its sibling's subtree is not
/// finished), the second unions both finalized child boxes and continues
/// upward. Every node's union is therefore computed exactly once.
pub(super) fn propagate_boxes<S: Real, Sch: Scheduler>(
    scheduler: &Sch,
    nodes: &mut [Node<S>],
    parents: &ParentLinks,
    perm: &[u32],
    primitive_boxes: &[Aabb<S>],
) {
    let visited: Vec<AtomicU32> = (0..nodes.len()).map(|_| AtomicU32::new(0)).collect();
    let leaf_count = perm.len();
    let nodes_writer = SliceWriter::new(nodes);

    scheduler.run(|div| {
        for leaf in div.shard(leaf_count) {
            let mut current = parents.leaf[leaf];
            loop {
                // The release half publishes this child's finished subtree,
                // the acquire half makes the sibling's published boxes
                // visible to whoever arrives second.
                if visited[current as usize].fetch_add(1, Ordering::AcqRel) == 0 {
                    break;
                }

                // Both children are final now and only this task touches the
                // node, so the read-modify-write is race free.
                let mut node = unsafe { nodes_writer.read(current as usize) };
                let left = child_bounds(&nodes_writer, node.left, node.left_is_leaf(), perm, primitive_boxes);
                let right = child_bounds(
                    &nodes_writer,
                    node.right,
                    node.right_is_leaf(),
                    perm,
                    primitive_boxes,
                );
                node.bounds = left.union(&right);
                unsafe { nodes_writer.set(current as usize, node) };

                current = parents.node[current as usize];
                if current == NO_PARENT {
                    break;
                }
            }
        }
    });
}

fn child_bounds<S: Real>(
    nodes: &SliceWriter<'_, Node<S>>,
    child: u32,
    is_leaf: bool,
    perm: &[u32],
    primitive_boxes: &[Aabb<S>],
) -> Aabb<S> {
    if is_leaf {
        primitive_boxes[perm[child as usize] as usize]
    } else {
        // Finalized by the walk that was second at `child`, ordered before
        // this read by the arrival counter.
        unsafe { nodes.read(child as usize) }.bounds
    }
}
