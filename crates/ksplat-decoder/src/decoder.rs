use ksplat_types::{BackingStore, SplatBuffer, SplatBufferWriter};
use ksplat_wire::header::check_raw_version;
use ksplat_wire::section::section_data_base;
use ksplat_wire::{HEADER_SIZE, SectionHeader, SplatHeader, WireError, parse_section_headers};
use tracing::debug;

use crate::assembler::account_loaded_splats;
use crate::error::DecodeError;

/// One-shot `.ksplat` decoder for a payload that is already fully in memory.
///
/// The result is the same buffer a progressive load of the same bytes
/// produces once complete: every section reached and every section's
/// loaded count equal to its `max_splat_count`.
///
/// # Example
///
/// ```rust
/// use ksplat_decoder::SplatDecoder;
/// use ksplat_encoder::SplatEncoder;
/// use ksplat_types::UncompressedSplat;
/// use ksplat_wire::CompressionLevel;
///
/// let payload = SplatEncoder::new(CompressionLevel::Uncompressed)
///     .add_splats(&vec![UncompressedSplat::default(); 3])
///     .encode()
///     .unwrap();
///
/// let buffer = SplatDecoder::decode(payload).unwrap();
/// assert_eq!(buffer.loaded_splat_count(), 3);
/// ```
pub struct SplatDecoder;

impl SplatDecoder {
    /// Decode a complete payload. The bytes become the backing store
    /// without being copied.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Wire`] if the version is too old, a record is
    ///   malformed, or the input is shorter than the header and section
    ///   table.
    /// - [`DecodeError::Truncated`] if the input ends before the last
    ///   section payload.
    /// - [`DecodeError::TrailingData`] if bytes follow the last section.
    pub fn decode(payload: Vec<u8>) -> Result<SplatBuffer, DecodeError> {
        let (header, sections) = Self::decode_headers(&payload)?;
        let total = section_data_base(header.max_section_count)
            + sections.iter().map(|s| s.storage_size_bytes).sum::<usize>();

        if payload.len() < total {
            return Err(DecodeError::Truncated {
                expected: total,
                received: payload.len(),
            });
        }
        if payload.len() > total {
            return Err(DecodeError::TrailingData {
                expected: total,
                extra_bytes: payload.len() - total,
            });
        }

        let mut writer = SplatBufferWriter::new(BackingStore::from_vec(payload), header, sections)?;
        account_loaded_splats(&mut writer, total)?;

        let buffer = writer.finish();
        debug!(
            sections = buffer.reached_section_count(),
            splats = buffer.loaded_splat_count(),
            "ksplat decoded"
        );
        Ok(buffer)
    }

    /// Decode only the file header and the section-header table.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Wire`]: version rejected, unknown level or degree, or
    /// fewer bytes than the header and table need.
    pub fn decode_headers(payload: &[u8]) -> Result<(SplatHeader, Vec<SectionHeader>), DecodeError> {
        if payload.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: payload.len(),
                needed: HEADER_SIZE,
            }
            .into());
        }
        check_raw_version(payload)?;
        let header = SplatHeader::read_from(payload)?;
        header.check_version()?;
        let sections = parse_section_headers(&header, payload, HEADER_SIZE)?;
        Ok((header, sections))
    }
}

#[cfg(test)]
mod tests {
    use ksplat_encoder::SplatEncoder;
    use ksplat_types::UncompressedSplat;
    use ksplat_wire::{CompressionLevel, SECTION_HEADER_SIZE, ShDegree};

    use super::*;

    fn splat(i: u8) -> UncompressedSplat {
        UncompressedSplat {
            center: [f32::from(i), 1.0, 2.0],
            scale: [0.5; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
            color: [i, i, i, 200],
        }
    }

    #[test]
    fn decode_reports_every_splat() {
        let payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .add_splats(&[splat(1), splat(2)])
            .add_splats(&[splat(3)])
            .encode()
            .unwrap();

        let buffer = SplatDecoder::decode(payload).unwrap();
        assert_eq!(buffer.reached_section_count(), 2);
        assert_eq!(buffer.loaded_splat_count(), 3);
        assert_eq!(buffer.section_loaded_count(0), 2);
        assert_eq!(buffer.section_loaded_count(1), 1);
        assert_eq!(buffer.uncompressed_splat(1, 0), Some(splat(3)));
        let all: Vec<_> = buffer.loaded_uncompressed_splats().collect();
        assert_eq!(all, vec![splat(1), splat(2), splat(3)]);
    }

    #[test]
    fn decode_headers_only() {
        let payload = SplatEncoder::new(CompressionLevel::Half)
            .add_section(SectionHeader {
                max_splat_count: 8,
                splat_count: 8,
                sh_degree: ShDegree::One,
                ..SectionHeader::default()
            })
            .encode()
            .unwrap();

        let (header, sections) =
            SplatDecoder::decode_headers(&payload[..HEADER_SIZE + SECTION_HEADER_SIZE]).unwrap();
        assert_eq!(header.compression_level, CompressionLevel::Half);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].storage_size_bytes, 8 * 42);
    }

    #[test]
    fn short_input_is_wire_eof() {
        let err = SplatDecoder::decode(vec![0, 1, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Wire(WireError::UnexpectedEof { offset: 4, needed: HEADER_SIZE })
        ));
    }

    #[test]
    fn missing_payload_bytes_are_truncated() {
        let mut payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .add_splats(&[splat(1), splat(2)])
            .encode()
            .unwrap();
        payload.truncate(payload.len() - 10);
        assert!(matches!(
            SplatDecoder::decode(payload),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn extra_bytes_are_trailing_data() {
        let mut payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .add_splats(&[splat(1)])
            .encode()
            .unwrap();
        payload.push(0);
        assert!(matches!(
            SplatDecoder::decode(payload),
            Err(DecodeError::TrailingData { extra_bytes: 1, .. })
        ));
    }

    #[test]
    fn version_zero_zero_is_rejected() {
        let mut payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .add_splats(&[splat(1)])
            .encode()
            .unwrap();
        payload[1] = 0;
        let err = SplatDecoder::decode(payload).unwrap_err();
        assert!(err.is_version_error());
        assert_eq!(
            err.to_string(),
            "ksplat version not supported: v0.0, minimum required: v0.1"
        );
    }
}
