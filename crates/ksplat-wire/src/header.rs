use crate::compression::CompressionLevel;
use crate::error::WireError;
use crate::le::{read_f32, read_u16, read_u32, write_f32, write_u16, write_u32};

/// Total header size in bytes (fixed). Most of it is zero padding reserved
/// for future fields.
pub const HEADER_SIZE: usize = 4096;

/// Version written by this crate, and the oldest version it reads.
pub const CURRENT_VERSION_MAJOR: u8 = 0;
pub const CURRENT_VERSION_MINOR: u8 = 1;

/// Half-width of the default 8-bit spherical-harmonics quantization range.
/// Used when a header stores 0 for both coefficient bounds.
pub const DEFAULT_SH_8BIT_HALF_RANGE: f32 = 1.5;

/// `.ksplat` file header: the first 4096 bytes of every file.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────┐
/// │ Offset │ Size    │ Description                      │
/// ├────────┼─────────┼──────────────────────────────────┤
/// │ 0x00   │ 1 byte  │ Version major                    │
/// │ 0x01   │ 1 byte  │ Version minor                    │
/// │ 0x02   │ 2 bytes │ Reserved (0x00)                  │
/// │ 0x04   │ u32     │ Max section count                │
/// │ 0x08   │ u32     │ Section count                    │
/// │ 0x0C   │ u32     │ Max splat count                  │
/// │ 0x10   │ u32     │ Splat count                      │
/// │ 0x14   │ u16     │ Compression level                │
/// │ 0x18   │ 3 × f32 │ Scene center                     │
/// │ 0x24   │ f32     │ Min SH coefficient               │
/// │ 0x28   │ f32     │ Max SH coefficient               │
/// └────────┴─────────┴──────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SplatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub max_section_count: u32,
    pub section_count: u32,
    pub max_splat_count: u32,
    pub splat_count: u32,
    pub compression_level: CompressionLevel,
    pub scene_center: [f32; 3],
    pub min_sh_coeff: f32,
    pub max_sh_coeff: f32,
}

impl Default for SplatHeader {
    fn default() -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            max_section_count: 0,
            section_count: 0,
            max_splat_count: 0,
            splat_count: 0,
            compression_level: CompressionLevel::Uncompressed,
            scene_center: [0.0; 3],
            min_sh_coeff: 0.0,
            max_sh_coeff: 0.0,
        }
    }
}

impl SplatHeader {
    /// Write the header into `buf` starting at `offset`.
    ///
    /// Only the defined fields are touched; the padding is assumed to be
    /// zero already (a freshly allocated store is).
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if fewer than [`HEADER_SIZE`]
    /// bytes are available after `offset`.
    pub fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<(), WireError> {
        let available = buf.len().saturating_sub(offset);
        if available < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: available,
                needed: HEADER_SIZE,
            });
        }
        let rec = &mut buf[offset..offset + HEADER_SIZE];

        rec[0] = self.version_major;
        rec[1] = self.version_minor;
        rec[2] = 0x00; // reserved
        rec[3] = 0x00; // reserved
        write_u32(rec, 4, self.max_section_count);
        write_u32(rec, 8, self.section_count);
        write_u32(rec, 12, self.max_splat_count);
        write_u32(rec, 16, self.splat_count);
        write_u16(rec, 20, self.compression_level.raw());
        write_f32(rec, 24, self.scene_center[0]);
        write_f32(rec, 28, self.scene_center[1]);
        write_f32(rec, 32, self.scene_center[2]);
        write_f32(rec, 36, self.min_sh_coeff);
        write_f32(rec, 40, self.max_sh_coeff);

        Ok(())
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// This does not run [`check_version`](Self::check_version); callers
    /// that size allocations from the header must do that first.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if the buffer is too short.
    /// - [`WireError::UnknownCompressionLevel`] if the level has no
    ///   descriptor.
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: buf.len(),
                needed: HEADER_SIZE,
            });
        }

        let raw_level = read_u16(buf, 20);
        let compression_level = CompressionLevel::from_raw(raw_level)
            .ok_or(WireError::UnknownCompressionLevel { level: raw_level })?;

        Ok(Self {
            version_major: buf[0],
            version_minor: buf[1],
            max_section_count: read_u32(buf, 4),
            section_count: read_u32(buf, 8),
            max_splat_count: read_u32(buf, 12),
            splat_count: read_u32(buf, 16),
            compression_level,
            scene_center: [read_f32(buf, 24), read_f32(buf, 28), read_f32(buf, 32)],
            min_sh_coeff: read_f32(buf, 36),
            max_sh_coeff: read_f32(buf, 40),
        })
    }

    /// Accept the header iff its version is at least
    /// [`CURRENT_VERSION_MAJOR`].[`CURRENT_VERSION_MINOR`].
    ///
    /// # Errors
    ///
    /// [`WireError::UnsupportedVersion`] naming the found and required
    /// versions.
    pub fn check_version(&self) -> Result<(), WireError> {
        check_version_against(
            self.version_major,
            self.version_minor,
            CURRENT_VERSION_MAJOR,
            CURRENT_VERSION_MINOR,
        )
    }

    /// Effective SH quantization bounds. A header storing 0 for both bounds
    /// uses the default 8-bit range.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn sh_coeff_range(&self) -> (f32, f32) {
        let min = if self.min_sh_coeff == 0.0 {
            -DEFAULT_SH_8BIT_HALF_RANGE
        } else {
            self.min_sh_coeff
        };
        let max = if self.max_sh_coeff == 0.0 {
            DEFAULT_SH_8BIT_HALF_RANGE
        } else {
            self.max_sh_coeff
        };
        (min, max)
    }
}

/// Version-compatibility rule: a newer major is always accepted, an equal
/// major needs an equal-or-newer minor.
///
/// # Errors
///
/// [`WireError::UnsupportedVersion`] when `(major, minor)` is older than
/// `(min_major, min_minor)`.
pub fn check_version_against(
    major: u8,
    minor: u8,
    min_major: u8,
    min_minor: u8,
) -> Result<(), WireError> {
    if major > min_major || (major == min_major && minor >= min_minor) {
        Ok(())
    } else {
        Err(WireError::UnsupportedVersion {
            major,
            minor,
            min_major,
            min_minor,
        })
    }
}

/// Run the version rule on the two leading bytes of a raw header, before
/// any other field is decoded.
///
/// # Errors
///
/// - [`WireError::UnexpectedEof`] if fewer than two bytes are available.
/// - [`WireError::UnsupportedVersion`] if the file is too old.
pub fn check_raw_version(buf: &[u8]) -> Result<(), WireError> {
    if buf.len() < 2 {
        return Err(WireError::UnexpectedEof {
            offset: buf.len(),
            needed: 2,
        });
    }
    check_version_against(buf[0], buf[1], CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_version_is_checked_before_fields() {
        // Level 9 is garbage, but the version failure is reported first.
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[20] = 9;
        assert!(check_raw_version(&buf).unwrap_err().is_version_error());
        buf[1] = 1;
        assert!(check_raw_version(&buf).is_ok());
    }

    fn sample() -> SplatHeader {
        SplatHeader {
            max_section_count: 4,
            section_count: 3,
            max_splat_count: 1_000,
            splat_count: 900,
            compression_level: CompressionLevel::Quantized,
            scene_center: [1.5, -2.0, 0.25],
            min_sh_coeff: -2.0,
            max_sh_coeff: 2.0,
            ..SplatHeader::default()
        }
    }

    #[test]
    fn roundtrip_header() {
        let header = sample();
        let mut buf = vec![0u8; HEADER_SIZE];
        header.write_to(&mut buf, 0).unwrap();
        assert_eq!(SplatHeader::read_from(&buf).unwrap(), header);
    }

    #[test]
    fn roundtrip_at_offset() {
        let header = sample();
        let mut buf = vec![0u8; HEADER_SIZE + 16];
        header.write_to(&mut buf, 16).unwrap();
        assert_eq!(SplatHeader::read_from(&buf[16..]).unwrap(), header);
        assert!(buf[..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn field_offsets_are_little_endian() {
        let mut buf = vec![0u8; HEADER_SIZE];
        sample().write_to(&mut buf, 0).unwrap();
        assert_eq!(&buf[0..4], &[0, 1, 0, 0]);
        assert_eq!(&buf[4..8], &4u32.to_le_bytes());
        assert_eq!(&buf[20..22], &2u16.to_le_bytes());
        assert_eq!(&buf[24..28], &1.5f32.to_le_bytes());
    }

    #[test]
    fn reject_buffer_too_short() {
        let buf = [0u8; 100];
        assert!(matches!(
            SplatHeader::read_from(&buf),
            Err(WireError::UnexpectedEof { offset: 100, needed: HEADER_SIZE })
        ));

        let mut small = [0u8; 100];
        assert!(sample().write_to(&mut small, 0).is_err());
    }

    #[test]
    fn reject_unknown_compression_level() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[20] = 9;
        assert!(matches!(
            SplatHeader::read_from(&buf),
            Err(WireError::UnknownCompressionLevel { level: 9 })
        ));
    }

    #[test]
    fn version_acceptance() {
        assert!(check_version_against(0, 1, 0, 1).is_ok());
        assert!(check_version_against(0, 2, 0, 1).is_ok());
        assert!(check_version_against(1, 0, 0, 1).is_ok());
        assert!(check_version_against(3, 0, 2, 5).is_ok());
    }

    #[test]
    fn version_rejection_names_both_versions() {
        let err = check_version_against(0, 0, 0, 1).unwrap_err();
        assert!(err.is_version_error());
        assert_eq!(
            err.to_string(),
            "ksplat version not supported: v0.0, minimum required: v0.1"
        );
        assert!(check_version_against(1, 9, 2, 5).is_err());
        assert!(check_version_against(2, 4, 2, 5).is_err());
    }

    #[test]
    fn zero_sh_bounds_use_default_range() {
        let header = SplatHeader::default();
        assert_eq!(header.sh_coeff_range(), (-1.5, 1.5));
        assert_eq!(sample().sh_coeff_range(), (-2.0, 2.0));
    }
}
