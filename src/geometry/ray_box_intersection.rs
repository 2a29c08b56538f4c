use num_traits::Float;

use super::{Aabb, Ray, Real, fast_max, fast_min};

impl<S: Real> Aabb<S> {
    /// Calculates ray intersection with the box.
    ///
    /// Returns minimum and maximum distance along the ray; the ray intersects
    /// iff min <= max (the caller additionally clips the interval against its
    /// own parametric range).
    pub fn intersect(&self, ray: &Ray<S>) -> (S, S) {
        // Componentwise distances along the ray to the box's min and max corners.
        // The multiplication is NaN if the ray is starting inside the slab bounding
        // plane and is parallel to it. In this case we blend to +-infinity, so that
        // the range becomes infinite.
        let to_box_min = (self.min - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if Float::is_nan(x) { Float::neg_infinity() } else { x });
        let to_box_max = (self.max - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if Float::is_nan(x) { Float::infinity() } else { x });

        // Correctly ordered (min_t <= max_t)
        let componentwise_min_t = to_box_min.zip_map(&to_box_max, fast_min);
        let componentwise_max_t = to_box_min.zip_map(&to_box_max, fast_max);

        let min_t = fast_max(
            componentwise_min_t.x,
            fast_max(componentwise_min_t.y, componentwise_min_t.z),
        );
        let max_t = fast_min(
            componentwise_max_t.x,
            fast_min(componentwise_max_t.y, componentwise_max_t.z),
        );

        (min_t, max_t)
    }
}
