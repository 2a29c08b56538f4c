use nalgebra::{Point3, Vector3};
use num_traits::Float;

use super::{Real, fast_max, fast_min};

/// Axis-aligned bounding box. Valid whenever `min <= max` on every axis; a
/// degenerate (point) box is valid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb<S: Real> {
    pub min: Point3<S>,
    pub max: Point3<S>,
}

impl<S: Real> Aabb<S> {
    pub fn new(min: Point3<S>, max: Point3<S>) -> Aabb<S> {
        Aabb { min, max }
    }

    /// Degenerate box covering a single point.
    pub fn from_point(point: Point3<S>) -> Aabb<S> {
        Aabb {
            min: point,
            max: point,
        }
    }

    /// Identity element of `union`: grows to exactly the first thing merged
    /// into it. Not a valid box on its own.
    pub fn empty() -> Aabb<S> {
        Aabb {
            min: Point3::from(Vector3::repeat(Float::infinity())),
            max: Point3::from(Vector3::repeat(Float::neg_infinity())),
        }
    }

    pub fn union(&self, other: &Aabb<S>) -> Aabb<S> {
        Aabb {
            min: Point3::from(self.min.coords.zip_map(&other.min.coords, fast_min)),
            max: Point3::from(self.max.coords.zip_map(&other.max.coords, fast_max)),
        }
    }

    /// Extends the box to cover `point`.
    pub fn grow(&mut self, point: &Point3<S>) {
        self.min = Point3::from(self.min.coords.zip_map(&point.coords, fast_min));
        self.max = Point3::from(self.max.coords.zip_map(&point.coords, fast_max));
    }

    pub fn center(&self) -> Point3<S> {
        let two = S::one() + S::one();
        Point3::from((self.min.coords + self.max.coords) / two)
    }

    pub fn size(&self) -> Vector3<S> {
        self.max - self.min
    }

    /// Product of the extents, with negative extents clamped to zero so an
    /// inverted box reports zero volume instead of a signed artifact.
    pub fn volume(&self) -> S {
        let size = self.size().map(|x| fast_max(x, S::zero()));
        size.x * size.y * size.z
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn contains(&self, point: &Point3<S>) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
            && self.min.z <= point.z
            && point.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    fn aabb(min: [f32; 3], max: [f32; 3]) -> Aabb<f32> {
        Aabb::new(min.into(), max.into())
    }

    #[test]
    fn union_is_componentwise() {
        let a = aabb([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = aabb([10.0, -1.0, 0.5], [11.0, 1.0, 0.75]);
        let u = a.union(&b);
        assert!(u == aabb([0.0, -1.0, 0.0], [11.0, 1.0, 1.0]));
    }

    #[test]
    fn empty_is_union_identity() {
        let a = aabb([-2.0, 3.0, 0.0], [5.0, 4.0, 1.0]);
        assert!(Aabb::empty().union(&a) == a);
        assert!(a.union(&Aabb::empty()) == a);
    }

    #[test]
    fn grow_matches_union_with_point_box() {
        let mut a = aabb([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let p = [2.0, -1.0, 0.5].into();
        a.grow(&p);
        assert!(a == aabb([0.0, -1.0, 0.0], [2.0, 1.0, 1.0]));
    }

    #[test]
    fn center_of_degenerate_box_is_the_point() {
        let p = [1.5f32, 2.5, -3.0].into();
        let a = Aabb::from_point(p);
        assert!(a.center() == p);
        assert!(a.is_valid());
        assert!(a.volume() == 0.0);
    }

    #[test]
    fn volume_clamps_inverted_extents() {
        let inverted = aabb([1.0, 0.0, 0.0], [0.0, 1.0, 1.0]);
        assert!(!inverted.is_valid());
        assert!(inverted.volume() == 0.0);
    }

    #[test]
    fn contains_is_inclusive() {
        let a = aabb([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert!(a.contains(&[0.0, 0.0, 0.0].into()));
        assert!(a.contains(&[1.0, 1.0, 1.0].into()));
        assert!(a.contains(&[0.5, 0.5, 0.5].into()));
        assert!(!a.contains(&[1.0, 1.0, 1.001].into()));
    }
}
