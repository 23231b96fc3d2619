// Quantized counting sort over projected splat depths
//
// Projects every splat to a scalar view depth, quantizes the observed
// [min, max] range into 65536 buckets, and scatters splat indices into a
// depth-ordered permutation in one linear pass per phase. No comparisons,
// no dynamic sort: cost is O(count + DEPTH_RANGE) per call regardless of
// input order.
//
// The resulting order is ascending by quantized depth; consumers iterate
// forward for front-to-back (picking) or backward for back-to-front
// (alpha blending). The scatter is stable: equal buckets keep their
// original relative order.

use glam::{Mat4, Vec4};
use tracing::debug;

use crate::chunk_grid::{chunk_cell, CHUNK_NONE};
use crate::transform::{mat4_from_row_major, TRANSFORM_STRIDE};

/// Number of quantization buckets.
pub const DEPTH_RANGE: usize = 256 * 256;

/// Fixed-point scale applied to projected depths before quantization. Part
/// of the wire contract; changing it changes every depth bucket.
pub const DEPTH_SCALE: f32 = 4096.0;

/// Owns the transient scratch of the counting sort (bucket counts, prefix
/// sums, per-splat quantized depths). Reusable across frames; every call
/// fully overwrites the ranges it touches, so nothing carries semantic
/// state between invocations.
pub struct DepthSorter {
    depths: Vec<i32>,
    counts: Vec<u32>,
    starts: Vec<u32>,
}

impl DepthSorter {
    pub fn new() -> Self {
        Self {
            depths: Vec::new(),
            counts: vec![0; DEPTH_RANGE],
            starts: vec![0; DEPTH_RANGE],
        }
    }

    /// Quantized bucket id per splat from the most recent sort call, in
    /// original splat order. Ascending bucket id is ascending depth.
    pub fn depth_buckets(&self) -> &[i32] {
        &self.depths
    }

    /// Sort splats by projected depth through their parent transforms.
    ///
    /// `view_proj` is a row-major 4x4 (16 floats), `transforms` the
    /// 20-float-stride parent table, `transform_indices` one entry per
    /// splat, `positions` 3 floats per splat. `depth_index` receives the
    /// permutation; its length is the splat count.
    ///
    /// The composed projection row is cached across consecutive splats with
    /// the same transform index. Callers should group splats by transform
    /// index to benefit; ungrouped input is still sorted correctly, it just
    /// recomputes the composition on every index change.
    pub fn sort(
        &mut self,
        view_proj: &[f32],
        transforms: &[f32],
        transform_indices: &[u32],
        positions: &[f32],
        depth_index: &mut [u32],
    ) {
        let count = depth_index.len();
        assert_eq!(positions.len(), count * 3, "positions must be 3 floats per splat");
        assert_eq!(transform_indices.len(), count, "transform_indices must be 1 per splat");

        let view_proj = mat4_from_row_major(view_proj);
        self.depths.clear();
        self.depths.resize(count, 0);

        let mut min_depth = i32::MAX;
        let mut max_depth = i32::MIN;
        let mut cached_index = None;
        let mut z_row = Vec4::ZERO;
        for i in 0..count {
            let transform_index = transform_indices[i];
            if cached_index != Some(transform_index) {
                cached_index = Some(transform_index);
                let base = transform_index as usize * TRANSFORM_STRIDE;
                let transform = mat4_from_row_major(&transforms[base..base + 16]);
                z_row = (view_proj * transform).row(2);
            }

            let p = Vec4::new(
                positions[i * 3],
                positions[i * 3 + 1],
                positions[i * 3 + 2],
                1.0,
            );
            let depth = (z_row.dot(p) * DEPTH_SCALE) as i32;
            self.depths[i] = depth;
            min_depth = min_depth.min(depth);
            max_depth = max_depth.max(depth);
        }

        self.scatter(depth_index, min_depth, max_depth);
    }

    /// Same as [`sort`](Self::sort), and additionally assigns each splat its
    /// screen-space chunk cell for later picking: clip-space X/Y divided by
    /// W, mapped onto the 15x15 grid. Splats with `W == 0` or projecting
    /// outside `[0, 1)` on either axis get [`CHUNK_NONE`].
    pub fn sort_with_chunks(
        &mut self,
        view_proj: &[f32],
        transforms: &[f32],
        transform_indices: &[u32],
        positions: &[f32],
        chunks: &mut [u8],
        depth_index: &mut [u32],
    ) {
        let count = depth_index.len();
        assert_eq!(positions.len(), count * 3, "positions must be 3 floats per splat");
        assert_eq!(transform_indices.len(), count, "transform_indices must be 1 per splat");
        assert_eq!(chunks.len(), count, "chunks must be 1 byte per splat");

        let view_proj = mat4_from_row_major(view_proj);
        self.depths.clear();
        self.depths.resize(count, 0);

        let mut min_depth = i32::MAX;
        let mut max_depth = i32::MIN;
        let mut cached_index = None;
        let mut combined = Mat4::IDENTITY;
        for i in 0..count {
            let transform_index = transform_indices[i];
            if cached_index != Some(transform_index) {
                cached_index = Some(transform_index);
                let base = transform_index as usize * TRANSFORM_STRIDE;
                let transform = mat4_from_row_major(&transforms[base..base + 16]);
                combined = view_proj * transform;
            }

            let p = Vec4::new(
                positions[i * 3],
                positions[i * 3 + 1],
                positions[i * 3 + 2],
                1.0,
            );
            let clip = combined * p;

            let depth = (clip.z * DEPTH_SCALE) as i32;
            self.depths[i] = depth;
            min_depth = min_depth.min(depth);
            max_depth = max_depth.max(depth);

            chunks[i] = if clip.w == 0.0 {
                CHUNK_NONE
            } else {
                let screen_x = 0.5 * (clip.x / clip.w) + 0.5;
                let screen_y = 0.5 * (clip.y / clip.w) + 0.5;
                if (0.0..1.0).contains(&screen_x) && (0.0..1.0).contains(&screen_y) {
                    chunk_cell(screen_x, screen_y)
                } else {
                    CHUNK_NONE
                }
            };
        }

        self.scatter(depth_index, min_depth, max_depth);
    }

    /// Sort splats that carry no parent transform: depth comes from the
    /// view-projection Z column alone. The translation term is omitted; a
    /// per-frame constant offset cannot change the ordering.
    pub fn sort_untransformed(
        &mut self,
        view_proj: &[f32],
        positions: &[f32],
        depth_index: &mut [u32],
    ) {
        let count = depth_index.len();
        assert_eq!(positions.len(), count * 3, "positions must be 3 floats per splat");

        let z_row = mat4_from_row_major(view_proj).row(2);
        self.depths.clear();
        self.depths.resize(count, 0);

        let mut min_depth = i32::MAX;
        let mut max_depth = i32::MIN;
        for i in 0..count {
            let projected = z_row.x * positions[i * 3]
                + z_row.y * positions[i * 3 + 1]
                + z_row.z * positions[i * 3 + 2];
            let depth = (projected * DEPTH_SCALE) as i32;
            self.depths[i] = depth;
            min_depth = min_depth.min(depth);
            max_depth = max_depth.max(depth);
        }

        self.scatter(depth_index, min_depth, max_depth);
    }

    /// Bucket-remap, prefix-sum and stable-scatter phases shared by every
    /// variant. Rewrites `self.depths` from raw quantized depth to bucket
    /// id in place.
    fn scatter(&mut self, depth_index: &mut [u32], min_depth: i32, max_depth: i32) {
        let count = self.depths.len();

        // Width in i64: projected depths may legitimately span more than
        // the i32 range once scaled.
        let width = max_depth as i64 - min_depth as i64;
        let depth_inv = if width > 0 {
            (DEPTH_RANGE - 1) as f32 / width as f32
        } else {
            if count > 0 {
                debug!(
                    "degenerate depth range ({} splats at depth {}), mapping all to bucket 0",
                    count, min_depth
                );
            }
            0.0
        };

        self.counts.fill(0);
        for depth in &mut self.depths {
            let offset = (*depth as i64 - min_depth as i64) as f32;
            let bucket = ((offset * depth_inv) as usize).min(DEPTH_RANGE - 1);
            *depth = bucket as i32;
            self.counts[bucket] += 1;
        }

        // Exclusive prefix sum.
        self.starts[0] = 0;
        for i in 1..DEPTH_RANGE {
            self.starts[i] = self.starts[i - 1] + self.counts[i - 1];
        }

        // Stable scatter: original order within a bucket is preserved.
        for i in 0..count {
            let bucket = self.depths[i] as usize;
            let slot = self.starts[bucket] as usize;
            self.starts[bucket] += 1;
            depth_index[slot] = i as u32;
        }
    }
}

impl Default for DepthSorter {
    fn default() -> Self {
        Self::new()
    }
}
