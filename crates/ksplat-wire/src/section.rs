use crate::compression::{CompressionLevel, ShDegree, bytes_per_splat};
use crate::error::WireError;
use crate::header::{HEADER_SIZE, SplatHeader};
use crate::le::{read_f32, read_u16, read_u32, write_f32, write_u16, write_u32};

/// Size of one section header record (fixed).
pub const SECTION_HEADER_SIZE: usize = 1024;

/// Bytes of metadata stored per bucket at the compressed levels
/// (bucket center, 3 × f32).
pub const BUCKET_STORAGE_SIZE_BYTES: u16 = 12;

/// Bytes stored per partially filled bucket (its splat count as u32).
pub const PARTIAL_BUCKET_META_BYTES: usize = 4;

/// One section header. The file carries `max_section_count` of them directly
/// after the [`SplatHeader`].
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────┐
/// │ Offset │ Size    │ Description                      │
/// ├────────┼─────────┼──────────────────────────────────┤
/// │ 0x00   │ u32     │ Splat count                      │
/// │ 0x04   │ u32     │ Max splat count                  │
/// │ 0x08   │ u32     │ Bucket size           (level ≥ 1)│
/// │ 0x0C   │ u32     │ Bucket count          (level ≥ 1)│
/// │ 0x10   │ f32     │ Bucket block size     (level ≥ 1)│
/// │ 0x14   │ u16     │ Bucket storage bytes  (level ≥ 1)│
/// │ 0x18   │ u32     │ Compression scale range          │
/// │ 0x1C   │ u32     │ Storage size bytes               │
/// │ 0x20   │ u32     │ Full bucket count     (level ≥ 1)│
/// │ 0x24   │ u32     │ Partially filled buckets         │
/// │ 0x28   │ u16     │ Spherical harmonics degree       │
/// └────────┴─────────┴──────────────────────────────────┘
/// ```
///
/// Bucket fields are written and read as zero at
/// [`CompressionLevel::Uncompressed`]. `storage_size_bytes` is written but
/// recomputed from the other fields on read, so the value a reader sizes
/// its store from always matches the real payload layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionHeader {
    pub splat_count: u32,
    pub max_splat_count: u32,
    pub bucket_size: u32,
    pub bucket_count: u32,
    pub bucket_block_size: f32,
    pub bucket_storage_size_bytes: u16,
    pub compression_scale_range: u32,
    pub storage_size_bytes: usize,
    pub full_bucket_count: u32,
    pub partially_filled_bucket_count: u32,
    pub sh_degree: ShDegree,
}

impl SectionHeader {
    /// Bytes of bucket metadata that precede the splat records in the
    /// section payload.
    #[must_use]
    pub fn bucket_prefix_bytes(&self) -> usize {
        self.partially_filled_bucket_count as usize * PARTIAL_BUCKET_META_BYTES
            + self.bucket_count as usize * usize::from(self.bucket_storage_size_bytes)
    }

    #[must_use]
    pub fn bytes_per_splat(&self, level: CompressionLevel) -> usize {
        bytes_per_splat(level, self.sh_degree)
    }

    /// Payload size implied by the layout fields: bucket prefix plus
    /// `max_splat_count` records.
    #[must_use]
    pub fn computed_storage_size(&self, level: CompressionLevel) -> usize {
        self.bucket_prefix_bytes() + self.bytes_per_splat(level) * self.max_splat_count as usize
    }

    /// Return a copy whose `storage_size_bytes` matches the layout fields.
    #[must_use]
    pub fn with_computed_storage(mut self, level: CompressionLevel) -> Self {
        self.storage_size_bytes = self.computed_storage_size(level);
        self
    }

    /// Write the record into `buf` at `offset`.
    ///
    /// # Errors
    ///
    /// [`WireError::UnexpectedEof`] if fewer than [`SECTION_HEADER_SIZE`]
    /// bytes are available after `offset`.
    pub fn write_to(
        &self,
        level: CompressionLevel,
        buf: &mut [u8],
        offset: usize,
    ) -> Result<(), WireError> {
        let available = buf.len().saturating_sub(offset);
        if available < SECTION_HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: available,
                needed: SECTION_HEADER_SIZE,
            });
        }
        let rec = &mut buf[offset..offset + SECTION_HEADER_SIZE];
        let bucketed = level.is_bucketed();

        write_u32(rec, 0, self.splat_count);
        write_u32(rec, 4, self.max_splat_count);
        write_u32(rec, 8, if bucketed { self.bucket_size } else { 0 });
        write_u32(rec, 12, if bucketed { self.bucket_count } else { 0 });
        write_f32(rec, 16, if bucketed { self.bucket_block_size } else { 0.0 });
        write_u16(rec, 20, if bucketed { self.bucket_storage_size_bytes } else { 0 });
        write_u32(rec, 24, if bucketed { self.compression_scale_range } else { 0 });
        write_u32(
            rec,
            28,
            u32::try_from(self.storage_size_bytes).unwrap_or(u32::MAX),
        );
        write_u32(rec, 32, if bucketed { self.full_bucket_count } else { 0 });
        write_u32(
            rec,
            36,
            if bucketed { self.partially_filled_bucket_count } else { 0 },
        );
        write_u16(rec, 40, self.sh_degree.raw());

        Ok(())
    }

    /// Parse the record at the start of `buf`. `index` is only used for
    /// error context.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if the buffer is too short.
    /// - [`WireError::UnknownShDegree`] if the degree has no descriptor.
    pub fn read_from(
        level: CompressionLevel,
        index: usize,
        buf: &[u8],
    ) -> Result<Self, WireError> {
        if buf.len() < SECTION_HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: buf.len(),
                needed: SECTION_HEADER_SIZE,
            });
        }

        let raw_degree = read_u16(buf, 40);
        let sh_degree = ShDegree::from_raw(raw_degree).ok_or(WireError::UnknownShDegree {
            section: index,
            degree: raw_degree,
        })?;

        let bucketed = level.is_bucketed();
        let bucketed_u32 = |at: usize| if bucketed { read_u32(buf, at) } else { 0 };

        let stored_scale_range = bucketed_u32(24);
        let compression_scale_range = if bucketed && stored_scale_range == 0 {
            level.descriptor().scale_range
        } else {
            stored_scale_range
        };

        let header = Self {
            splat_count: read_u32(buf, 0),
            max_splat_count: read_u32(buf, 4),
            bucket_size: bucketed_u32(8),
            bucket_count: bucketed_u32(12),
            bucket_block_size: if bucketed { read_f32(buf, 16) } else { 0.0 },
            bucket_storage_size_bytes: if bucketed { read_u16(buf, 20) } else { 0 },
            compression_scale_range,
            storage_size_bytes: 0,
            full_bucket_count: bucketed_u32(32),
            partially_filled_bucket_count: bucketed_u32(36),
            sh_degree,
        };

        Ok(header.with_computed_storage(level))
    }
}

/// Byte offset of the first section payload: header plus the whole
/// section-header table.
#[must_use]
pub fn section_data_base(max_section_count: u32) -> usize {
    HEADER_SIZE + max_section_count as usize * SECTION_HEADER_SIZE
}

/// Parse all `header.max_section_count` section headers from `buf`,
/// starting at `offset`.
///
/// # Errors
///
/// Any error from [`SectionHeader::read_from`]; a short buffer reports the
/// bytes available from `offset` and the size of the whole table.
pub fn parse_section_headers(
    header: &SplatHeader,
    buf: &[u8],
    offset: usize,
) -> Result<Vec<SectionHeader>, WireError> {
    let count = header.max_section_count as usize;
    let needed = count * SECTION_HEADER_SIZE;
    let available = buf.len().saturating_sub(offset);
    if available < needed {
        return Err(WireError::UnexpectedEof {
            offset: available,
            needed,
        });
    }

    (0..count)
        .map(|i| {
            let at = offset + i * SECTION_HEADER_SIZE;
            SectionHeader::read_from(header.compression_level, i, &buf[at..])
        })
        .collect()
}

/// Write `section` as the `index`-th record of a table that begins at
/// `offset` in `buf`.
///
/// # Errors
///
/// [`WireError::UnexpectedEof`] if the record does not fit.
pub fn write_section_header(
    section: &SectionHeader,
    index: usize,
    level: CompressionLevel,
    buf: &mut [u8],
    offset: usize,
) -> Result<(), WireError> {
    section.write_to(level, buf, offset + index * SECTION_HEADER_SIZE)
}
