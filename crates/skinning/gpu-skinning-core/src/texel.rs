//! Texel packing for the baked bone-matrix texture.
//!
//! Each texel is an RGBA8 data word, not a color: two 32-bit floats are
//! truncated to binary16 and their high/low bytes spread across the four
//! channels. A 4x4 affine matrix takes 6 texels (top three rows, four
//! columns each; the fourth row is always (0,0,0,1) and is omitted). The
//! texture must be sampled point-filtered.

use glam::Mat4;
use half::f16;
use serde::{Deserialize, Serialize};

use crate::data::AnimationData;

/// Texels per packed matrix (three rows, two floats per texel).
pub const TEXELS_PER_MATRIX: usize = 6;

/// Pack two floats into one RGBA8 texel.
///
/// Channel order: v1-high, v1-low, v2-high, v2-low. Precision loss is
/// bounded by the binary16 conversion; the byte split itself is lossless.
#[inline]
pub fn pack_pair(v1: f32, v2: f32) -> [u8; 4] {
    let a = f16::from_f32(v1).to_bits();
    let b = f16::from_f32(v2).to_bits();
    [(a >> 8) as u8, (a & 0x00ff) as u8, (b >> 8) as u8, (b & 0x00ff) as u8]
}

/// Exact inverse of [`pack_pair`].
#[inline]
pub fn unpack_pair(texel: [u8; 4]) -> (f32, f32) {
    let a = ((texel[0] as u16) << 8) | texel[1] as u16;
    let b = ((texel[2] as u16) << 8) | texel[3] as u16;
    (
        f16::from_bits(a).to_f32(),
        f16::from_bits(b).to_f32(),
    )
}

/// Pack a matrix's top three rows into six consecutive texels.
pub fn pack_matrix(m: &Mat4) -> [[u8; 4]; TEXELS_PER_MATRIX] {
    let r0 = m.row(0);
    let r1 = m.row(1);
    let r2 = m.row(2);
    [
        pack_pair(r0.x, r0.y),
        pack_pair(r0.z, r0.w),
        pack_pair(r1.x, r1.y),
        pack_pair(r1.z, r1.w),
        pack_pair(r2.x, r2.y),
        pack_pair(r2.z, r2.w),
    ]
}

/// Smallest power-of-two (width, height) holding `texel_count` texels.
///
/// Width and height start at 1 and double alternately, width first, which
/// keeps the texture close to square instead of growing one dimension
/// unboundedly.
pub fn minimal_pow2_size(texel_count: usize) -> (u32, u32) {
    let mut width: u32 = 1;
    let mut height: u32 = 1;
    loop {
        if width as usize * height as usize >= texel_count {
            break;
        }
        width *= 2;
        if width as usize * height as usize >= texel_count {
            break;
        }
        height *= 2;
    }
    (width, height)
}

/// The baked texture payload: RGBA8, point-filtered by contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes; texels beyond the last clip are zero.
    pub rgba: Vec<u8>,
}

impl Texture {
    /// Read back one texel (row-major).
    pub fn texel(&self, index: usize) -> [u8; 4] {
        let at = index * 4;
        [
            self.rgba[at],
            self.rgba[at + 1],
            self.rgba[at + 2],
            self.rgba[at + 3],
        ]
    }
}

/// Encode every clip's frame matrices into the shared texture: matrices
/// consecutive per frame, frames consecutive per clip, clips consecutive in
/// bake order starting at texel 0.
pub fn encode_animation(data: &AnimationData) -> Texture {
    let (width, height) = (data.texture_width, data.texture_height);
    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    let mut at = 0usize;
    for clip in &data.clips {
        for frame in &clip.frames {
            for matrix in &frame.matrices {
                for texel in pack_matrix(matrix) {
                    rgba[at..at + 4].copy_from_slice(&texel);
                    at += 4;
                }
            }
        }
    }
    Texture {
        width,
        height,
        rgba,
    }
}
