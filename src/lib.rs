// Depth-ordered visibility index builder for splat rendering
//
// Given per-splat pose buffers and a camera transform, produces the
// back-to-front draw permutation (quantized counting sort), the packed
// per-splat GPU records (covariance + color + flags), and ray-based splat
// picking over the sorted order. Single-threaded, allocation-free per call
// beyond the sorter's reusable scratch; all primitive buffers are owned by
// the caller.

pub mod chunk_grid;
pub mod depth_sort;
pub mod splat_pack;
pub mod splat_picker;
pub mod transform;

// Re-exports - core entry points and wire-contract constants
pub use chunk_grid::{chunk_cell, is_adjacent_chunk, CHUNK_COUNT, CHUNK_GRID, CHUNK_NONE};
pub use depth_sort::{DepthSorter, DEPTH_RANGE, DEPTH_SCALE};
pub use splat_pack::{
    float_to_half, pack_half_2x16, pack_splats, PackedSplat, SELECTED_FLAG, SPLAT_WORDS,
};
pub use splat_picker::{pick_splat, ray_intersects_triangle, CORNER_EXTENT, RAY_EPSILON};
pub use transform::{transform_matrix, TRANSFORM_STRIDE};
