//! Shared fixtures for the test modules: simple primitives, their
//! intersectors and procedural scenes.

use nalgebra::{Point3, Vector2, Vector3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{Aabb, Intersection, Ray};

/// Error tolerance of the triangle intersector. This is not machine epsilon;
/// it rejects hits close enough to the origin to be self-intersections.
const EPSILON: f32 = 1e-6;

/// Axis-aligned cube of the given half extent.
pub fn cube(center: [f32; 3], radius: f32) -> Aabb<f32> {
    let center = Point3::from(Vector3::from(center));
    let half = Vector3::repeat(radius);
    Aabb::new(center - half, center + half)
}

/// Box derivation for scenes whose primitives already are boxes.
pub fn box_identity<S: crate::geometry::Real>(primitive: &Aabb<S>) -> Aabb<S> {
    *primitive
}

/// Intersects a ray with the box itself: the entry distance of the slab
/// interval, or the exit distance when the origin is inside.
pub fn box_intersector(primitive: &Aabb<f32>, ray: &Ray<f32>) -> Intersection<f32> {
    let (t_near, t_far) = primitive.intersect(ray);
    if t_near > t_far || t_far < 0.0 {
        return Intersection::none();
    }

    let mut isect = Intersection::none();
    isect.t = if t_near > 0.0 { t_near } else { t_far };
    isect
}

/// Triangle with per-vertex texture coordinates.
#[derive(Clone, Debug)]
pub struct Triangle {
    pub pos: [Point3<f32>; 3],
    pub uv: [Vector2<f32>; 3],
}

pub fn triangle_aabb(triangle: &Triangle) -> Aabb<f32> {
    let mut bounds = Aabb::from_point(triangle.pos[0]);
    bounds.grow(&triangle.pos[1]);
    bounds.grow(&triangle.pos[2]);
    bounds
}

/// Basic Möller and Trumbore algorithm, two sided. Rejects hits with
/// `t < EPSILON` rather than `t < 0`.
pub fn triangle_intersector(triangle: &Triangle, ray: &Ray<f32>) -> Intersection<f32> {
    let v0v1 = triangle.pos[1] - triangle.pos[0];
    let v0v2 = triangle.pos[2] - triangle.pos[0];

    let pvec = ray.direction.cross(&v0v2);
    let det = v0v1.dot(&pvec);

    if det.abs() < EPSILON {
        return Intersection::none();
    }

    let inv_det = 1.0 / det;
    let tvec = ray.origin - triangle.pos[0];
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return Intersection::none();
    }

    let qvec = tvec.cross(&v0v1);
    let v = ray.direction.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return Intersection::none();
    }

    let t = v0v2.dot(&qvec) * inv_det;
    if t < EPSILON {
        return Intersection::none();
    }

    let uv = triangle.uv[0] * (1.0 - u - v) + triangle.uv[1] * u + triangle.uv[2] * v;

    Intersection {
        t,
        normal: v0v1.cross(&v0v2).normalize(),
        uv,
        prim_id: 0,
    }
}

/// Deterministic cloud of boxes with varying sizes and plenty of overlap.
pub fn random_boxes(count: usize, seed: u64) -> Vec<Aabb<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let center = [
                rng.random_range(0.0..100.0),
                rng.random_range(0.0..100.0),
                rng.random_range(0.0..100.0),
            ];
            cube(center, rng.random_range(0.1..3.0))
        })
        .collect()
}

mod tests {
    use assert2::assert;

    use super::*;
    use crate::builder::Builder;
    use crate::scheduler::SerialScheduler;
    use crate::traverse::traverse;
    use crate::validate::check_bvh;

    fn quad(z: f32, uv_scale: f32) -> [Triangle; 2] {
        let corners = [
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(1.0, 1.0, z),
            Point3::new(0.0, 1.0, z),
        ];
        let uvs = [
            Vector2::new(0.0, 0.0),
            Vector2::new(uv_scale, 0.0),
            Vector2::new(uv_scale, uv_scale),
            Vector2::new(0.0, uv_scale),
        ];
        [
            Triangle {
                pos: [corners[0], corners[1], corners[2]],
                uv: [uvs[0], uvs[1], uvs[2]],
            },
            Triangle {
                pos: [corners[0], corners[2], corners[3]],
                uv: [uvs[0], uvs[2], uvs[3]],
            },
        ]
    }

    #[test]
    fn triangle_intersector_reports_distance_and_uv() {
        let [tri, _] = quad(2.0, 1.0);
        let ray = Ray::new(
            Point3::new(0.75, 0.25, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );

        let hit = triangle_intersector(&tri, &ray);
        assert!(hit.is_hit());
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!((hit.uv.x - 0.75).abs() < 1e-5);
        assert!((hit.uv.y - 0.25).abs() < 1e-5);
    }

    #[test]
    fn triangle_intersector_rejects_near_origin_hits() {
        let [tri, _] = quad(0.0, 1.0);
        let ray = Ray::new(
            Point3::new(0.75, 0.25, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        assert!(!triangle_intersector(&tri, &ray).is_hit());
    }

    #[test]
    fn triangle_scene_traverses_to_the_nearest_surface() {
        // Two parallel quads; the ray must hit the closer one.
        let mut triangles = Vec::new();
        triangles.extend(quad(5.0, 1.0));
        triangles.extend(quad(3.0, 1.0));

        let bvh = Builder::with_scheduler(SerialScheduler).build(&triangles, triangle_aabb);
        assert!(check_bvh(&bvh, true));

        let ray = Ray::new(
            Point3::new(0.5, 0.5, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        let hit = traverse(&bvh, &triangles, &ray, triangle_intersector);

        assert!(hit.is_hit());
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!(hit.prim_id >= 2);
    }
}
