use morton_encoding::morton_encode;
use nalgebra::Vector3;
use num_traits::Float;

use crate::geometry::{Aabb, Real, fast_max, fast_min};

/// 3D Z-order code of a quantized centroid. Only the low 30 bits are used,
/// 10 per axis.
pub type MortonCode = u32;

const GRID_BITS: u32 = 10;
const GRID_CELLS: u32 = 1 << GRID_BITS;

/// Maps a centroid to grid coordinates inside the scene bounds.
///
/// An axis on which the bounds are degenerate divides 0 by 0; the resulting
/// NaN quantizes to cell 0, collapsing the whole axis.
pub(crate) fn normalized_centroid<S: Real>(
    scene_bounds: &Aabb<S>,
    centroid: &nalgebra::Point3<S>,
) -> Vector3<S> {
    (centroid - scene_bounds.min).component_div(&scene_bounds.size())
}

pub(crate) fn morton_code<S: Real>(normalized: &Vector3<S>) -> MortonCode {
    let grid_coordinates = [
        quantize(normalized.x),
        quantize(normalized.y),
        quantize(normalized.z),
    ];

    let code: u128 = morton_encode(grid_coordinates);
    code as MortonCode
}

/// Quantizes a normalized coordinate to a 10 bit cell index, saturating at
/// the last cell. NaN and negative inputs land in cell 0.
fn quantize<S: Real>(normalized: S) -> u32 {
    let clamped = fast_min(fast_max(normalized, S::zero()), S::one());
    let cells: S = num_traits::cast(GRID_CELLS).expect("grid size fits any scalar");
    Float::floor(clamped * cells)
        .to_u32()
        .map_or(0, |cell| cell.min(GRID_CELLS - 1))
}
