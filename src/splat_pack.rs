// Splat packing for GPU consumption
//
// Converts per-splat rotation + scale into a compressed anisotropic
// covariance (three packed f16 pairs) and lays each splat out as an 8-word
// record the rasterizer reads directly. The word layout, the rotation
// component permutation, and the x4 extent factor are part of the wire
// contract with the consuming shader and must stay bit-exact.

use glam::{Mat3, Quat, Vec3};
use half::f16;

/// 32-bit words per packed splat record.
pub const SPLAT_WORDS: usize = 8;

/// Bit OR'd into the flags word when a splat is selected (globally or
/// per-splat).
pub const SELECTED_FLAG: u32 = 0x0100_0000;

/// One packed splat record, exactly as the rasterizer consumes it.
///
/// Word layout: `[x_bits, y_bits, z_bits, flags, cov0, cov1, cov2, color]`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedSplat {
    /// Raw f32 bit patterns of the splat center.
    pub position: [u32; 3],
    /// Selection flag word.
    pub flags: u32,
    /// Six covariance entries as three packed f16 pairs.
    pub covariance: [u32; 3],
    /// RGBA color, one byte per channel, little-endian.
    pub color: u32,
}

/// Convert an f32 to IEEE-754 binary16 bits (round to nearest even,
/// subnormals preserved, overflow saturates to infinity).
#[inline]
pub fn float_to_half(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Pack two f32 values into f16 format and store in a u32 (x in the low
/// 16 bits, y in the high 16 bits).
#[inline]
pub fn pack_half_2x16(x: f32, y: f32) -> u32 {
    (float_to_half(x) as u32) | ((float_to_half(y) as u32) << 16)
}

/// Pack every splat into the 8-word GPU record and refresh the world-space
/// cache buffers.
///
/// `positions`/`scales` are 3 floats per splat, `rotations` 4 floats per
/// splat stored scalar-first, `colors` 4 bytes per splat, `selection` one
/// byte per splat. `data` receives `SPLAT_WORDS` words per splat;
/// `world_positions`/`world_rotations`/`world_scales` receive the cached
/// world-space pose (positions and scales verbatim, rotations in the
/// shader's vector-first permuted form). No parent transform is applied
/// here; callers pre-transform into world space or consume the cache as
/// local coordinates.
///
/// Rotations are assumed unit-length; non-unit input yields a
/// non-orthonormal basis and a distorted covariance, not an error.
#[allow(clippy::too_many_arguments)]
pub fn pack_splats(
    selected: bool,
    positions: &[f32],
    rotations: &[f32],
    scales: &[f32],
    colors: &[u8],
    selection: &[u8],
    data: &mut [u32],
    world_positions: &mut [f32],
    world_rotations: &mut [f32],
    world_scales: &mut [f32],
) {
    let count = positions.len() / 3;
    assert_eq!(positions.len(), count * 3, "positions must be 3 floats per splat");
    assert_eq!(rotations.len(), count * 4, "rotations must be 4 floats per splat");
    assert_eq!(scales.len(), count * 3, "scales must be 3 floats per splat");
    assert_eq!(colors.len(), count * 4, "colors must be 4 bytes per splat");
    assert_eq!(selection.len(), count, "selection must be 1 byte per splat");
    assert_eq!(data.len(), count * SPLAT_WORDS, "data must be 8 words per splat");
    assert_eq!(world_positions.len(), count * 3, "world_positions must match positions");
    assert_eq!(world_rotations.len(), count * 4, "world_rotations must match rotations");
    assert_eq!(world_scales.len(), count * 3, "world_scales must match scales");

    let records: &mut [PackedSplat] = bytemuck::cast_slice_mut(data);

    for (i, record) in records.iter_mut().enumerate() {
        let position = Vec3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);
        world_positions[i * 3..i * 3 + 3].copy_from_slice(&position.to_array());

        // Stored scalar-first; the shader wants the vector part first with
        // the scalar negated.
        let rot = Quat::from_xyzw(
            rotations[i * 4 + 1],
            rotations[i * 4 + 2],
            rotations[i * 4 + 3],
            -rotations[i * 4],
        );
        world_rotations[i * 4..i * 4 + 4].copy_from_slice(&rot.to_array());

        let scale = Vec3::new(scales[i * 3], scales[i * 3 + 1], scales[i * 3 + 2]);
        world_scales[i * 3..i * 3 + 3].copy_from_slice(&scale.to_array());

        // Sigma = (S R)^T (S R), six independent entries by symmetry, scaled
        // by 4 to compensate the half-extent convention.
        let m = Mat3::from_diagonal(scale) * Mat3::from_quat(rot);
        let sigma = m.transpose() * m;

        record.position = [
            position.x.to_bits(),
            position.y.to_bits(),
            position.z.to_bits(),
        ];
        record.flags = if selected || selection[i] > 0 {
            SELECTED_FLAG
        } else {
            0
        };
        record.covariance = [
            pack_half_2x16(4.0 * sigma.x_axis.x, 4.0 * sigma.y_axis.x),
            pack_half_2x16(4.0 * sigma.z_axis.x, 4.0 * sigma.y_axis.y),
            pack_half_2x16(4.0 * sigma.z_axis.y, 4.0 * sigma.z_axis.z),
        ];
        record.color = u32::from_le_bytes([
            colors[i * 4],
            colors[i * 4 + 1],
            colors[i * 4 + 2],
            colors[i * 4 + 3],
        ]);
    }
}
