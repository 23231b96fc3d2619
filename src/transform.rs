// Transform table layout and row-major matrix loading
//
// The scene graph hands this crate a flat array of parent transforms, 20
// floats per entry: a 4x4 affine matrix stored row-major for row-vector
// composition (point on the left), followed by a 4-float reserved tail this
// crate never reads. The table is owned and mutated externally; everything
// here only reads it.

use glam::Mat4;

/// Floats per transform-table entry (16 matrix + 4 reserved).
pub const TRANSFORM_STRIDE: usize = 20;

/// Load a 4x4 matrix stored row-major for row-vector composition.
///
/// glam is column-major with points multiplying on the right. A row-major
/// matrix composed with row vectors is exactly the transpose of that, so the
/// raw floats load directly as glam columns and `Mat4::transform_point3` /
/// `Mat4::row` then reproduce the table's composition order unchanged.
#[inline]
pub(crate) fn mat4_from_row_major(m: &[f32]) -> Mat4 {
    Mat4::from_cols_slice(&m[..16])
}

/// Fetch the parent transform at `index` from the flat transform table.
///
/// Panics if the table is shorter than `(index + 1) * TRANSFORM_STRIDE`.
#[inline]
pub fn transform_matrix(transforms: &[f32], index: u32) -> Mat4 {
    let base = index as usize * TRANSFORM_STRIDE;
    mat4_from_row_major(&transforms[base..base + 16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn row_major_translation_applies_in_row_vector_order() {
        // Row-major affine with translation in the last row, as the table
        // stores it: p' = p * M puts the translation at m[12..15].
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            3.0, -2.0, 5.0, 1.0,
        ];
        let p = mat4_from_row_major(&m).transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vec3::new(4.0, -1.0, 6.0));
    }

    #[test]
    fn transform_matrix_skips_reserved_tail() {
        let mut table = vec![0.0f32; 2 * TRANSFORM_STRIDE];
        // Entry 1 = identity; reserved floats poisoned to catch over-reads.
        for i in 0..4 {
            table[TRANSFORM_STRIDE + i * 4 + i] = 1.0;
        }
        for f in &mut table[TRANSFORM_STRIDE + 16..] {
            *f = f32::NAN;
        }
        let m = transform_matrix(&table, 1);
        assert_eq!(m, Mat4::IDENTITY);
    }
}
