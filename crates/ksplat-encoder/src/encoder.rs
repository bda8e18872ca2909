use ksplat_types::UncompressedSplat;
use ksplat_wire::header::{CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR};
use ksplat_wire::section::{section_data_base, write_section_header};
use ksplat_wire::{CompressionLevel, HEADER_SIZE, SectionHeader, ShDegree, SplatHeader};

use crate::error::EncodeError;

/// `.ksplat` encoder: lays out a header, a section-header table and the
/// section payloads.
///
/// Sections are appended in order with [`add_splats`](Self::add_splats)
/// (level-0 records built from [`UncompressedSplat`]s),
/// [`add_section`](Self::add_section) (any layout, deterministic filler
/// payload) or [`add_section_with_payload`](Self::add_section_with_payload).
/// Every `add_*` method returns `&mut Self` for chaining; validation is
/// deferred to [`encode`](Self::encode).
///
/// ```rust
/// use ksplat_encoder::SplatEncoder;
/// use ksplat_wire::{CompressionLevel, SectionHeader, ShDegree};
///
/// let payload = SplatEncoder::new(CompressionLevel::Quantized)
///     .add_section(SectionHeader {
///         max_splat_count: 100,
///         splat_count: 100,
///         sh_degree: ShDegree::Zero,
///         ..SectionHeader::default()
///     })
///     .encode()
///     .unwrap();
/// assert_eq!(payload.len(), 4096 + 1024 + 100 * 24);
/// ```
///
/// # Output layout
///
/// ```text
/// ┌────────────────────────┬──────────────────────────────────────┐
/// │ [4096 bytes]           │ File header                          │
/// │ [max_sections × 1024]  │ Section headers (reserved ones zero) │
/// │ [storage_size_bytes]   │ Section 0 payload (buckets, splats)  │
/// │ ...                    │                                      │
/// └────────────────────────┴──────────────────────────────────────┘
/// ```
pub struct SplatEncoder {
    level: CompressionLevel,
    version: (u8, u8),
    scene_center: [f32; 3],
    sh_coeff_range: (f32, f32),
    minimum_alpha: u8,
    reserved_sections: Option<u32>,
    sections: Vec<PendingSection>,
}

enum PendingSection {
    Splats(Vec<UncompressedSplat>),
    Filler(SectionHeader),
    Explicit(SectionHeader, Vec<u8>),
}

impl SplatEncoder {
    /// Create an encoder writing the current format version at `level`.
    #[must_use]
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            level,
            version: (CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR),
            scene_center: [0.0; 3],
            sh_coeff_range: (0.0, 0.0),
            minimum_alpha: 0,
            reserved_sections: None,
            sections: Vec::new(),
        }
    }

    // ── Header settings ─────────────────────────────────────────────────

    pub fn scene_center(&mut self, center: [f32; 3]) -> &mut Self {
        self.scene_center = center;
        self
    }

    /// Stored as-is. Readers substitute the default range when both are 0.
    pub fn sh_coeff_range(&mut self, min: f32, max: f32) -> &mut Self {
        self.sh_coeff_range = (min, max);
        self
    }

    /// Override the version bytes. Only useful for producing files other
    /// readers should reject.
    pub fn version(&mut self, major: u8, minor: u8) -> &mut Self {
        self.version = (major, minor);
        self
    }

    /// Splats passed to [`add_splats`](Self::add_splats) with an alpha
    /// below this value are dropped.
    pub fn minimum_alpha(&mut self, alpha: u8) -> &mut Self {
        self.minimum_alpha = alpha;
        self
    }

    /// Reserve `max` section-header slots. Slots past the added sections
    /// are written as empty records.
    pub fn reserve_sections(&mut self, max: u32) -> &mut Self {
        self.reserved_sections = Some(max);
        self
    }

    // ── Sections ────────────────────────────────────────────────────────

    /// Add a level-0, SH-degree-0 section holding `splats` in order.
    pub fn add_splats(&mut self, splats: &[UncompressedSplat]) -> &mut Self {
        self.sections.push(PendingSection::Splats(splats.to_vec()));
        self
    }

    /// Add a section with the given layout. `storage_size_bytes` is
    /// recomputed and the payload is filled with a fixed byte pattern.
    pub fn add_section(&mut self, section: SectionHeader) -> &mut Self {
        self.sections.push(PendingSection::Filler(section));
        self
    }

    /// Add a section with an explicit payload, which must be exactly the
    /// section's computed storage size.
    pub fn add_section_with_payload(&mut self, section: SectionHeader, payload: Vec<u8>) -> &mut Self {
        self.sections.push(PendingSection::Explicit(section, payload));
        self
    }

    // ── Encode ──────────────────────────────────────────────────────────

    /// Serialize the header, the section-header table and every payload.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::EmptyPayload`] if no section was added.
    /// - [`EncodeError::UncompressedRequiresLevel`] if
    ///   [`add_splats`](Self::add_splats) was used above level 0.
    /// - [`EncodeError::PayloadSizeMismatch`] for a wrong explicit payload.
    /// - [`EncodeError::TooManySections`] if more sections were added than
    ///   reserved.
    /// - [`EncodeError::CountOverflow`] if a count exceeds `u32::MAX`.
    /// - [`EncodeError::Wire`] if a record cannot be written.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.sections.is_empty() {
            return Err(EncodeError::EmptyPayload);
        }

        let mut headers = Vec::with_capacity(self.sections.len());
        let mut payloads = Vec::with_capacity(self.sections.len());
        for (index, pending) in self.sections.iter().enumerate() {
            let (header, payload) = self.build_section(index, pending)?;
            headers.push(header);
            payloads.push(payload);
        }

        let section_count = to_u32("section", headers.len())?;
        let max_section_count = self.reserved_sections.unwrap_or(section_count);
        if section_count > max_section_count {
            return Err(EncodeError::TooManySections {
                sections: headers.len(),
                max: max_section_count,
            });
        }

        let header = SplatHeader {
            version_major: self.version.0,
            version_minor: self.version.1,
            max_section_count,
            section_count,
            max_splat_count: sum_counts(&headers, |h| h.max_splat_count)?,
            splat_count: sum_counts(&headers, |h| h.splat_count)?,
            compression_level: self.level,
            scene_center: self.scene_center,
            min_sh_coeff: self.sh_coeff_range.0,
            max_sh_coeff: self.sh_coeff_range.1,
        };

        let data_base = section_data_base(max_section_count);
        let total = data_base + payloads.iter().map(Vec::len).sum::<usize>();
        let mut output = vec![0u8; total];

        header.write_to(&mut output, 0)?;
        for (index, section) in headers.iter().enumerate() {
            write_section_header(section, index, self.level, &mut output, HEADER_SIZE)?;
        }
        let mut cursor = data_base;
        for payload in &payloads {
            output[cursor..cursor + payload.len()].copy_from_slice(payload);
            cursor += payload.len();
        }

        Ok(output)
    }

    // ── Internal helpers ────────────────────────────────────────────────

    #[allow(clippy::cast_possible_truncation)]
    fn build_section(
        &self,
        index: usize,
        pending: &PendingSection,
    ) -> Result<(SectionHeader, Vec<u8>), EncodeError> {
        match pending {
            PendingSection::Splats(splats) => {
                if self.level != CompressionLevel::Uncompressed {
                    return Err(EncodeError::UncompressedRequiresLevel { level: self.level });
                }
                let kept: Vec<&UncompressedSplat> = splats
                    .iter()
                    .filter(|s| s.alpha() >= self.minimum_alpha)
                    .collect();
                let count = to_u32("splat", kept.len())?;
                let header = SectionHeader {
                    splat_count: count,
                    max_splat_count: count,
                    sh_degree: ShDegree::Zero,
                    ..SectionHeader::default()
                }
                .with_computed_storage(self.level);

                let record = UncompressedSplat::level0_size();
                let mut payload = vec![0u8; header.storage_size_bytes];
                for (slot, splat) in payload.chunks_exact_mut(record).zip(kept) {
                    splat.write_level0(slot);
                }
                Ok((header, payload))
            }
            PendingSection::Filler(section) => {
                let header = section.clone().with_computed_storage(self.level);
                let payload = (0..header.storage_size_bytes)
                    .map(|i| ((i + index) % 251) as u8)
                    .collect();
                Ok((header, payload))
            }
            PendingSection::Explicit(section, payload) => {
                let header = section.clone().with_computed_storage(self.level);
                if payload.len() != header.storage_size_bytes {
                    return Err(EncodeError::PayloadSizeMismatch {
                        section: index,
                        expected: header.storage_size_bytes,
                        actual: payload.len(),
                    });
                }
                Ok((header, payload.clone()))
            }
        }
    }
}

fn sum_counts(headers: &[SectionHeader], count: impl Fn(&SectionHeader) -> u32) -> Result<u32, EncodeError> {
    let total: u64 = headers.iter().map(|h| u64::from(count(h))).sum();
    u32::try_from(total).map_err(|_| EncodeError::CountOverflow {
        what: "splat",
        count: usize::try_from(total).unwrap_or(usize::MAX),
    })
}

fn to_u32(what: &'static str, count: usize) -> Result<u32, EncodeError> {
    u32::try_from(count).map_err(|_| EncodeError::CountOverflow { what, count })
}

impl Default for SplatEncoder {
    fn default() -> Self {
        Self::new(CompressionLevel::Uncompressed)
    }
}

#[cfg(test)]
mod tests {
    use ksplat_decoder::SplatDecoder;
    use ksplat_wire::SECTION_HEADER_SIZE;
    use ksplat_wire::header::check_raw_version;

    use super::*;

    fn splat(alpha: u8) -> UncompressedSplat {
        UncompressedSplat {
            center: [1.0, 2.0, 3.0],
            scale: [0.25; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
            color: [9, 8, 7, alpha],
        }
    }

    #[test]
    fn empty_encoder_returns_empty_payload_error() {
        assert!(matches!(
            SplatEncoder::default().encode(),
            Err(EncodeError::EmptyPayload)
        ));
    }

    #[test]
    fn payload_byte_length_matches_layout() {
        let payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .add_splats(&[splat(255), splat(255)])
            .add_splats(&[splat(255)])
            .encode()
            .unwrap();
        assert_eq!(payload.len(), HEADER_SIZE + 2 * SECTION_HEADER_SIZE + 3 * 44);
    }

    #[test]
    fn header_totals_sum_sections() {
        let payload = SplatEncoder::new(CompressionLevel::Half)
            .scene_center([1.0, 0.0, -1.0])
            .add_section(SectionHeader {
                max_splat_count: 10,
                splat_count: 7,
                ..SectionHeader::default()
            })
            .add_section(SectionHeader {
                max_splat_count: 5,
                splat_count: 5,
                sh_degree: ShDegree::Two,
                ..SectionHeader::default()
            })
            .encode()
            .unwrap();

        let header = SplatHeader::read_from(&payload).unwrap();
        assert_eq!(header.section_count, 2);
        assert_eq!(header.max_splat_count, 15);
        assert_eq!(header.splat_count, 12);
        assert_eq!(header.scene_center, [1.0, 0.0, -1.0]);
        assert_eq!(payload.len(), section_data_base(2) + 10 * 24 + 5 * 72);
    }

    #[test]
    fn minimum_alpha_drops_faint_splats() {
        let payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .minimum_alpha(10)
            .add_splats(&[splat(9), splat(10), splat(200)])
            .encode()
            .unwrap();
        let buffer = SplatDecoder::decode(payload).unwrap();
        assert_eq!(buffer.loaded_splat_count(), 2);
        assert_eq!(buffer.uncompressed_splat(0, 0).unwrap().alpha(), 10);
    }

    #[test]
    fn splats_need_level_zero() {
        let result = SplatEncoder::new(CompressionLevel::Quantized)
            .add_splats(&[splat(255)])
            .encode();
        assert!(matches!(
            result,
            Err(EncodeError::UncompressedRequiresLevel { level: CompressionLevel::Quantized })
        ));
    }

    #[test]
    fn reserved_slots_are_counted_in_layout() {
        let payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .reserve_sections(3)
            .add_splats(&[splat(255)])
            .encode()
            .unwrap();
        let header = SplatHeader::read_from(&payload).unwrap();
        assert_eq!(header.max_section_count, 3);
        assert_eq!(header.section_count, 1);
        assert_eq!(payload.len(), section_data_base(3) + 44);

        let too_few = SplatEncoder::new(CompressionLevel::Uncompressed)
            .reserve_sections(0)
            .add_splats(&[splat(255)])
            .encode();
        assert!(matches!(too_few, Err(EncodeError::TooManySections { sections: 1, max: 0 })));
    }

    #[test]
    fn explicit_payload_size_is_checked() {
        let section = SectionHeader {
            max_splat_count: 2,
            splat_count: 2,
            ..SectionHeader::default()
        };
        let result = SplatEncoder::new(CompressionLevel::Quantized)
            .add_section_with_payload(section.clone(), vec![0; 47])
            .encode();
        assert!(matches!(
            result,
            Err(EncodeError::PayloadSizeMismatch { section: 0, expected: 48, actual: 47 })
        ));

        let payload = SplatEncoder::new(CompressionLevel::Quantized)
            .add_section_with_payload(section, vec![0xEE; 48])
            .encode()
            .unwrap();
        assert!(payload.ends_with(&[0xEE; 48]));
    }

    #[test]
    fn version_override_is_written() {
        let payload = SplatEncoder::default()
            .version(0, 0)
            .add_splats(&[splat(255)])
            .encode()
            .unwrap();
        assert_eq!(&payload[..2], &[0, 0]);
        assert!(check_raw_version(&payload).unwrap_err().is_version_error());
    }
}
