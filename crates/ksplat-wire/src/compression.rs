/// Per-level storage description of one splat record.
///
/// ```text
/// ┌───────┬────────┬───────┬──────────┬───────┬─────────┬─────────────┐
/// │ Level │ center │ scale │ rotation │ color │ SH comp │ scale range │
/// ├───────┼────────┼───────┼──────────┼───────┼─────────┼─────────────┤
/// │ 0     │ 12     │ 12    │ 16       │ 4     │ 4       │ 1           │
/// │ 1     │ 6      │ 6     │ 8        │ 4     │ 2       │ 32767       │
/// │ 2     │ 6      │ 6     │ 8        │ 4     │ 1       │ 32767       │
/// └───────┴────────┴───────┴──────────┴───────┴─────────┴─────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionDescriptor {
    pub bytes_per_center: usize,
    pub bytes_per_scale: usize,
    pub bytes_per_rotation: usize,
    pub bytes_per_color: usize,
    pub bytes_per_sh_component: usize,
    /// Default quantization range for scales when a section stores 0.
    pub scale_range: u32,
    /// `bytes_per_splat` indexed by spherical-harmonics degree.
    pub bytes_per_splat: [usize; 3],
}

impl CompressionDescriptor {
    /// Byte offset of the scale component inside one splat record.
    #[must_use]
    pub const fn scale_offset(&self) -> usize {
        self.bytes_per_center
    }

    #[must_use]
    pub const fn rotation_offset(&self) -> usize {
        self.bytes_per_center + self.bytes_per_scale
    }

    #[must_use]
    pub const fn color_offset(&self) -> usize {
        self.rotation_offset() + self.bytes_per_rotation
    }

    #[must_use]
    pub const fn sh_offset(&self) -> usize {
        self.color_offset() + self.bytes_per_color
    }
}

const fn descriptor(
    center: usize,
    scale: usize,
    rotation: usize,
    color: usize,
    sh_component: usize,
    scale_range: u32,
) -> CompressionDescriptor {
    let base = center + scale + rotation + color;
    CompressionDescriptor {
        bytes_per_center: center,
        bytes_per_scale: scale,
        bytes_per_rotation: rotation,
        bytes_per_color: color,
        bytes_per_sh_component: sh_component,
        scale_range,
        bytes_per_splat: [
            base,
            base + ShDegree::One.component_count() * sh_component,
            base + ShDegree::Two.component_count() * sh_component,
        ],
    }
}

/// The static descriptor table, indexed by [`CompressionLevel`].
pub const COMPRESSION_LEVELS: [CompressionDescriptor; 3] = [
    descriptor(12, 12, 16, 4, 4, 1),
    descriptor(6, 6, 8, 4, 2, 32767),
    descriptor(6, 6, 8, 4, 1, 32767),
];

/// Compression level stored in the file header.
///
/// The level applies to every section in the file. Level 0 stores full
/// 32-bit floats and carries no bucket metadata; levels 1 and 2 quantize
/// positions relative to spatial buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompressionLevel {
    #[default]
    Uncompressed = 0,
    Half = 1,
    Quantized = 2,
}

impl CompressionLevel {
    /// Map a raw wire value to a level. Returns `None` outside the table.
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Uncompressed),
            1 => Some(Self::Half),
            2 => Some(Self::Quantized),
            _ => None,
        }
    }

    #[must_use]
    pub fn raw(self) -> u16 {
        self as u16
    }

    /// Whether sections at this level carry bucket metadata.
    #[must_use]
    pub fn is_bucketed(self) -> bool {
        self != Self::Uncompressed
    }

    #[must_use]
    pub fn descriptor(self) -> &'static CompressionDescriptor {
        &COMPRESSION_LEVELS[self as usize]
    }
}

/// Spherical-harmonics degree of a section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShDegree {
    #[default]
    Zero = 0,
    One = 1,
    Two = 2,
}

impl ShDegree {
    #[must_use]
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Zero),
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }

    #[must_use]
    pub fn raw(self) -> u16 {
        self as u16
    }

    /// Number of stored SH coefficients per splat (three color channels).
    #[must_use]
    pub const fn component_count(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 9,
            Self::Two => 24,
        }
    }
}

/// Size in bytes of one splat record for the given level and SH degree.
///
/// Both arguments are closed enums validated at decode time, so the lookup
/// cannot miss.
#[must_use]
pub fn bytes_per_splat(level: CompressionLevel, sh_degree: ShDegree) -> usize {
    level.descriptor().bytes_per_splat[sh_degree as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_reference_sizes() {
        assert_eq!(bytes_per_splat(CompressionLevel::Uncompressed, ShDegree::Zero), 44);
        assert_eq!(bytes_per_splat(CompressionLevel::Uncompressed, ShDegree::One), 80);
        assert_eq!(bytes_per_splat(CompressionLevel::Uncompressed, ShDegree::Two), 140);
        assert_eq!(bytes_per_splat(CompressionLevel::Half, ShDegree::Zero), 24);
        assert_eq!(bytes_per_splat(CompressionLevel::Half, ShDegree::One), 42);
        assert_eq!(bytes_per_splat(CompressionLevel::Half, ShDegree::Two), 72);
        assert_eq!(bytes_per_splat(CompressionLevel::Quantized, ShDegree::Zero), 24);
        assert_eq!(bytes_per_splat(CompressionLevel::Quantized, ShDegree::One), 33);
        assert_eq!(bytes_per_splat(CompressionLevel::Quantized, ShDegree::Two), 48);
    }

    #[test]
    fn level_zero_offsets() {
        let d = CompressionLevel::Uncompressed.descriptor();
        assert_eq!(d.scale_offset(), 12);
        assert_eq!(d.rotation_offset(), 24);
        assert_eq!(d.color_offset(), 40);
        assert_eq!(d.sh_offset(), 44);
    }

    #[test]
    fn raw_values_outside_table_are_rejected() {
        assert_eq!(CompressionLevel::from_raw(3), None);
        assert_eq!(ShDegree::from_raw(3), None);
        assert_eq!(CompressionLevel::from_raw(2), Some(CompressionLevel::Quantized));
    }
}
