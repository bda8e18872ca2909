use ksplat_wire::CompressionLevel;
use ksplat_wire::le::{read_f32, write_f32};

/// Size of one row in the raw `.splat` format.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────┐
/// │ Offset │ Size    │ Description                      │
/// ├────────┼─────────┼──────────────────────────────────┤
/// │ 0x00   │ 3 × f32 │ Position                         │
/// │ 0x0C   │ 3 × f32 │ Scale                            │
/// │ 0x18   │ 4 × u8  │ Color RGBA                       │
/// │ 0x1C   │ 4 × u8  │ Rotation w,x,y,z as (v-128)/128  │
/// └────────┴─────────┴──────────────────────────────────┘
/// ```
pub const RAW_ROW_SIZE: usize = 32;

/// Size of one level-0, SH-degree-0 record.
const LEVEL0_RECORD_SIZE: usize = 44;

/// A single splat with full-precision fields.
///
/// This is the record both raw `.splat` rows and level-0 sections decode
/// to. Rotation is stored as `[w, x, y, z]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UncompressedSplat {
    pub center: [f32; 3],
    pub scale: [f32; 3],
    pub rotation: [f32; 4],
    pub color: [u8; 4],
}

impl UncompressedSplat {
    /// Decode one raw `.splat` row. The rotation is normalized.
    #[must_use]
    pub fn from_raw_row(row: &[u8; RAW_ROW_SIZE]) -> Self {
        let mut rotation = [0.0f32; 4];
        for (i, r) in rotation.iter_mut().enumerate() {
            *r = (f32::from(row[28 + i]) - 128.0) / 128.0;
        }
        let norm = rotation.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for r in &mut rotation {
                *r /= norm;
            }
        } else {
            rotation = [1.0, 0.0, 0.0, 0.0];
        }

        Self {
            center: [read_f32(row, 0), read_f32(row, 4), read_f32(row, 8)],
            scale: [read_f32(row, 12), read_f32(row, 16), read_f32(row, 20)],
            rotation,
            color: [row[24], row[25], row[26], row[27]],
        }
    }

    /// Encode as a raw `.splat` row. Rotation components are quantized to
    /// 8 bits, so a decode of the result is only approximately equal.
    #[must_use]
    pub fn to_raw_row(&self) -> [u8; RAW_ROW_SIZE] {
        let mut row = [0u8; RAW_ROW_SIZE];
        for (i, v) in self.center.iter().enumerate() {
            write_f32(&mut row, i * 4, *v);
        }
        for (i, v) in self.scale.iter().enumerate() {
            write_f32(&mut row, 12 + i * 4, *v);
        }
        row[24..28].copy_from_slice(&self.color);
        for (i, v) in self.rotation.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let q = (v * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8;
            row[28 + i] = q;
        }
        row
    }

    /// Write the level-0, SH-degree-0 record (44 bytes) into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than 44 bytes.
    pub fn write_level0(&self, out: &mut [u8]) {
        let d = CompressionLevel::Uncompressed.descriptor();
        for (i, v) in self.center.iter().enumerate() {
            write_f32(out, i * 4, *v);
        }
        for (i, v) in self.scale.iter().enumerate() {
            write_f32(out, d.scale_offset() + i * 4, *v);
        }
        for (i, v) in self.rotation.iter().enumerate() {
            write_f32(out, d.rotation_offset() + i * 4, *v);
        }
        out[d.color_offset()..d.color_offset() + 4].copy_from_slice(&self.color);
    }

    /// Read a level-0 record. SH coefficients, if any, follow the color and
    /// are not decoded here.
    ///
    /// # Panics
    ///
    /// Panics if `rec` is shorter than 44 bytes.
    #[must_use]
    pub fn read_level0(rec: &[u8]) -> Self {
        let d = CompressionLevel::Uncompressed.descriptor();
        let s = d.scale_offset();
        let r = d.rotation_offset();
        let c = d.color_offset();
        Self {
            center: [read_f32(rec, 0), read_f32(rec, 4), read_f32(rec, 8)],
            scale: [read_f32(rec, s), read_f32(rec, s + 4), read_f32(rec, s + 8)],
            rotation: [
                read_f32(rec, r),
                read_f32(rec, r + 4),
                read_f32(rec, r + 8),
                read_f32(rec, r + 12),
            ],
            color: [rec[c], rec[c + 1], rec[c + 2], rec[c + 3]],
        }
    }

    #[must_use]
    pub fn alpha(&self) -> u8 {
        self.color[3]
    }

    /// Size of the record written by [`write_level0`](Self::write_level0).
    #[must_use]
    pub const fn level0_size() -> usize {
        LEVEL0_RECORD_SIZE
    }
}
