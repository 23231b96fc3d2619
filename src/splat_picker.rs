// Ray picking against depth-sorted splats
//
// Walks the sorted index buffer front-to-back, skips splats outside the
// cursor's 3x3 chunk neighborhood, reconstructs each survivor's
// screen-aligned quad in world space and ray-tests its two triangles.
// The first geometric hit is the nearest tested splat by construction, so
// the walk stops there. Picking is approximate-nearest: splats outside the
// chunk neighborhood are never tested.

use glam::{Mat3, Mat4, Quat, Vec3};
use tracing::debug;

use crate::chunk_grid::is_adjacent_chunk;
use crate::transform::{mat4_from_row_major, transform_matrix};

/// Near-parallel rejection threshold for the ray-triangle test, and the
/// minimum accepted hit distance.
pub const RAY_EPSILON: f32 = 1e-6;

/// Unit-square corners are scaled by `CORNER_EXTENT * scale` to cover the
/// splat's rendered footprint.
pub const CORNER_EXTENT: f32 = 4.0;

/// Unit-square quad corners in the splat's local plane, wound
/// counter-clockwise from the bottom-left.
const LOCAL_CORNERS: [Vec3; 4] = [
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
    Vec3::new(0.5, 0.5, 0.0),
    Vec3::new(-0.5, 0.5, 0.0),
];

/// Möller–Trumbore ray-triangle intersection. Returns the hit distance
/// along the ray, or `None` for near-parallel rays, barycentric misses and
/// hits at or behind the origin.
pub fn ray_intersects_triangle(
    origin: Vec3,
    direction: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = direction.cross(edge2);
    let a = edge1.dot(h);
    if a > -RAY_EPSILON && a < RAY_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > RAY_EPSILON).then_some(t)
}

/// World-space corners of a splat's view-aligned quad: unit-square corners
/// through the camera's rotation basis, scaled per axis, rotated by the
/// splat quaternion, translated, then parent-transformed.
fn splat_corners(
    view_basis: Mat3,
    transform: &Mat4,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
) -> [Vec3; 4] {
    LOCAL_CORNERS.map(|corner| {
        let aligned = view_basis * corner;
        let rotated = rotation * (aligned * scale * CORNER_EXTENT);
        transform.transform_point3(position + rotated)
    })
}

/// Test a world-space ray against splats in depth order and return the
/// index of the first hit, or `None` when every candidate misses or is
/// filtered out by chunk adjacency.
///
/// `view` is the camera's row-major 4x4 view matrix; `depth_index` is the
/// sorted permutation from [`DepthSorter`](crate::DepthSorter) and defines
/// both the candidate set and the test order. Splat rotations are assumed
/// unit-length.
#[allow(clippy::too_many_arguments)]
pub fn pick_splat(
    view: &[f32],
    transforms: &[f32],
    transform_indices: &[u32],
    positions: &[f32],
    rotations: &[f32],
    scales: &[f32],
    depth_index: &[u32],
    chunks: &[u8],
    cursor_chunk: u8,
    ray_origin: Vec3,
    ray_direction: Vec3,
) -> Option<u32> {
    let count = positions.len() / 3;
    assert_eq!(positions.len(), count * 3, "positions must be 3 floats per splat");
    assert_eq!(rotations.len(), count * 4, "rotations must be 4 floats per splat");
    assert_eq!(scales.len(), count * 3, "scales must be 3 floats per splat");
    assert_eq!(transform_indices.len(), count, "transform_indices must be 1 per splat");
    assert_eq!(chunks.len(), count, "chunks must be 1 byte per splat");

    let view_basis = Mat3::from_mat4(mat4_from_row_major(view));

    for &index in depth_index {
        let i = index as usize;
        if !is_adjacent_chunk(chunks[i], cursor_chunk) {
            continue;
        }

        let transform = transform_matrix(transforms, transform_indices[i]);
        let position = Vec3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);
        let rotation = Quat::from_xyzw(
            rotations[i * 4],
            rotations[i * 4 + 1],
            rotations[i * 4 + 2],
            rotations[i * 4 + 3],
        );
        let scale = Vec3::new(scales[i * 3], scales[i * 3 + 1], scales[i * 3 + 2]);

        let c = splat_corners(view_basis, &transform, position, rotation, scale);
        if ray_intersects_triangle(ray_origin, ray_direction, c[0], c[1], c[2]).is_some()
            || ray_intersects_triangle(ray_origin, ray_direction, c[0], c[2], c[3]).is_some()
        {
            debug!("picked splat {}", index);
            return Some(index);
        }
    }

    None
}
