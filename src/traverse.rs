use arrayvec::ArrayVec;
use num_traits::Float;

use crate::builder::Bvh;
use crate::geometry::{Intersection, Ray, Real};

/// Traversal stack capacity. The position tie-break keeps the tree depth
/// below the total prefix length (30 code bits plus 32 position bits), so 64
/// entries can never overflow.
const STACK_SIZE: usize = 64;

/// Read-only view over a hierarchy and the primitive array it was built
/// from. Many threads may traverse the same pair concurrently.
pub struct Traverser<'a, S: Real, P> {
    bvh: &'a Bvh<S>,
    primitives: &'a [P],
}

impl<'a, S: Real, P> Traverser<'a, S, P> {
    /// `primitives` must be the same array the hierarchy was built from.
    pub fn new(bvh: &'a Bvh<S>, primitives: &'a [P]) -> Traverser<'a, S, P> {
        assert_eq!(
            primitives.len(),
            bvh.primitive_count(),
            "traverser needs the same primitive array the hierarchy was built from",
        );
        Traverser { bvh, primitives }
    }

    /// Finds the nearest intersection along `ray`.
    ///
    /// `intersect` reports the nearest intersection of the ray with one
    /// primitive; any non-finite or non-positive `t` counts as a miss. The
    /// returned `prim_id` refers to the original primitive array.
    pub fn traverse<F>(&self, ray: &Ray<S>, intersect: F) -> Intersection<S>
    where
        F: Fn(&P, &Ray<S>) -> Intersection<S>,
    {
        let mut best = Intersection::none();

        match self.bvh.primitive_count() {
            0 => return best,
            1 => {
                self.intersect_leaf(0, ray, &intersect, &mut best);
                return best;
            }
            _ => {}
        }

        let mut stack: ArrayVec<(u32, S), STACK_SIZE> = ArrayVec::new();

        let (t_near, t_far) = self.bvh[0].bounds.intersect(ray);
        if t_near > t_far || t_far < S::zero() {
            return best;
        }
        stack.push((0, t_near));

        while let Some((node_index, node_t)) = stack.pop() {
            if node_t > best.t {
                // Everything below this node is farther away than the best
                // hit found so far.
                continue;
            }

            let node = &self.bvh[node_index as usize];
            let mut pending: ArrayVec<(u32, S), 2> = ArrayVec::new();

            for (child, is_leaf) in [
                (node.left, node.left_is_leaf()),
                (node.right, node.right_is_leaf()),
            ] {
                if is_leaf {
                    self.intersect_leaf(child as usize, ray, &intersect, &mut best);
                } else {
                    let (t_near, t_far) = self.bvh[child as usize].bounds.intersect(ray);
                    if t_near <= t_far && t_far >= S::zero() && t_near < best.t {
                        pending.push((child, t_near));
                    }
                }
            }

            // Push the farther child first so the nearer one is popped next,
            // maximizing early pruning.
            if pending.len() == 2 && pending[0].1 < pending[1].1 {
                pending.swap(0, 1);
            }
            for entry in pending {
                stack.push(entry);
            }
        }

        best
    }

    fn intersect_leaf<F>(
        &self,
        leaf: usize,
        ray: &Ray<S>,
        intersect: &F,
        best: &mut Intersection<S>,
    ) where
        F: Fn(&P, &Ray<S>) -> Intersection<S>,
    {
        let prim = self.bvh.perm()[leaf];
        let mut candidate = intersect(&self.primitives[prim as usize], ray);
        if Float::is_finite(candidate.t) && candidate.t > S::zero() && candidate.t < best.t {
            candidate.prim_id = prim;
            *best = candidate;
        }
    }
}

/// Finds the nearest intersection in one call; see [`Traverser::traverse`].
pub fn traverse<S, P, F>(
    bvh: &Bvh<S>,
    primitives: &[P],
    ray: &Ray<S>,
    intersect: F,
) -> Intersection<S>
where
    S: Real,
    F: Fn(&P, &Ray<S>) -> Intersection<S>,
{
    Traverser::new(bvh, primitives).traverse(ray, intersect)
}
