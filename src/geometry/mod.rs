mod aabb;
mod ray_box_intersection;

use nalgebra::{Point3, RealField, Vector2, Vector3};
use num_traits::Float;

pub use aabb::Aabb;

/// Scalar type of the engine. Both `f32` and `f64` qualify; the precision is
/// picked at monomorphization time and the two instantiations produce the
/// same tree topology for the same input.
pub trait Real: RealField + Float + Copy + Send + Sync {}

impl<T: RealField + Float + Copy + Send + Sync> Real for T {}

/// `min` that never resolves to the `RealField`/`Float` ambiguity on a
/// generic scalar. Keeps the left operand when the comparison fails (NaN).
#[inline(always)]
pub(crate) fn fast_min<S: Real>(a: S, b: S) -> S {
    if b < a { b } else { a }
}

#[inline(always)]
pub(crate) fn fast_max<S: Real>(a: S, b: S) -> S {
    if b > a { b } else { a }
}

/// Ray going through the world. Only positive direction is considered to be
/// on the ray. The direction is kept exactly as given, it does not have to be
/// normalized.
#[derive(Copy, Clone, Debug)]
pub struct Ray<S: Real> {
    pub origin: Point3<S>,
    pub direction: Vector3<S>,

    /// Componentwise inverse of the ray direction.
    /// Zeros in direction get turned into positive infinity regardless of the
    /// sign of the zero.
    pub inv_direction: Vector3<S>,
}

impl<S: Real> Ray<S> {
    pub fn new(origin: Point3<S>, direction: Vector3<S>) -> Ray<S> {
        let inv_direction = direction.map(|x| {
            if x == S::zero() {
                Float::infinity()
            } else {
                S::one() / x
            }
        });

        Ray {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn point_at(&self, distance: S) -> Point3<S> {
        self.origin + self.direction * distance
    }
}

/// Intersection of a ray and a primitive.
///
/// The miss sentinel is `t = +inf`; anything downstream only ever asks
/// whether `t` is finite and positive. `prim_id` is meaningful only for a
/// hit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection<S: Real> {
    /// Position along the ray.
    pub t: S,
    pub normal: Vector3<S>,
    pub uv: Vector2<S>,
    pub prim_id: u32,
}

impl<S: Real> Intersection<S> {
    pub fn none() -> Intersection<S> {
        Intersection {
            t: Float::infinity(),
            normal: Vector3::zeros(),
            uv: Vector2::zeros(),
            prim_id: u32::MAX,
        }
    }

    pub fn is_hit(&self) -> bool {
        Float::is_finite(self.t) && self.t > S::zero()
    }
}

impl<S: Real> Default for Intersection<S> {
    fn default() -> Self {
        Intersection::none()
    }
}
