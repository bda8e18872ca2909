use ksplat_wire::section::{section_data_base, write_section_header};
use ksplat_wire::{CompressionLevel, HEADER_SIZE, SectionHeader, SplatHeader};

use crate::error::BufferError;
use crate::splat::UncompressedSplat;

/// The single contiguous byte region a decoded buffer reads from.
///
/// Allocated once at its exact final size (zero-filled) and never resized.
/// Writes past the end fail instead of growing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackingStore {
    bytes: Box<[u8]>,
}

impl BackingStore {
    /// A zero-filled store of exactly `len` bytes.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len].into_boxed_slice(),
        }
    }

    /// Wrap bytes that already hold a complete file.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Size fixed at allocation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Every byte of the store, written or not.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Direct write access, for filling fixed records in place.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Copy `data` into the store at `offset`.
    ///
    /// # Errors
    ///
    /// [`BufferError::Overflow`] if the write does not fit; nothing is
    /// written in that case.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), BufferError> {
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= self.bytes.len())
            .ok_or(BufferError::Overflow {
                offset,
                len: data.len(),
                capacity: self.bytes.len(),
            })?;
        self.bytes[offset..end].copy_from_slice(data);
        Ok(())
    }
}

/// Where a section's bytes live inside the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionLayout {
    /// Start of the section payload (its bucket metadata prefix).
    pub payload_offset: usize,
    /// Start of the first splat record, after the bucket prefix.
    pub splat_data_offset: usize,
    /// Size of one splat record in this section.
    pub bytes_per_splat: usize,
}

/// The "how much is safely readable" counters.
///
/// Every value only grows while a load is in flight.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadCounters {
    reached_section_count: usize,
    loaded_splat_count: usize,
    section_loaded_counts: Vec<usize>,
}

impl LoadCounters {
    /// Sections whose splat data the streamed mark has reached.
    #[must_use]
    pub fn reached_section_count(&self) -> usize {
        self.reached_section_count
    }

    /// Sum of the per-section loaded counts.
    #[must_use]
    pub fn loaded_splat_count(&self) -> usize {
        self.loaded_splat_count
    }

    /// One entry per section slot, reserved slots included.
    #[must_use]
    pub fn section_loaded_counts(&self) -> &[usize] {
        &self.section_loaded_counts
    }
}

/// A decoded `.ksplat` buffer: backing store, headers, and load counters.
///
/// Consumers only ever hold `&SplatBuffer`, which has no mutators. The
/// counters are advanced through the [`SplatBufferWriter`] that owns the
/// buffer while a load is in flight.
///
/// A reader may access splat `k` of section `i` whenever
/// `k < section_loaded_count(i)`; [`splat_bytes`](Self::splat_bytes) enforces
/// exactly that.
#[derive(Clone, Debug)]
pub struct SplatBuffer {
    store: BackingStore,
    header: SplatHeader,
    sections: Vec<SectionHeader>,
    layout: Vec<SectionLayout>,
    counters: LoadCounters,
}

impl SplatBuffer {
    #[must_use]
    pub fn header(&self) -> &SplatHeader {
        &self.header
    }

    /// Every slot of the section-header table, in file order.
    #[must_use]
    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Byte offsets of each section, parallel to
    /// [`section_headers`](Self::section_headers).
    #[must_use]
    pub fn section_layout(&self) -> &[SectionLayout] {
        &self.layout
    }

    #[must_use]
    pub fn compression_level(&self) -> CompressionLevel {
        self.header.compression_level
    }

    #[must_use]
    pub fn counters(&self) -> &LoadCounters {
        &self.counters
    }

    #[must_use]
    pub fn reached_section_count(&self) -> usize {
        self.counters.reached_section_count
    }

    #[must_use]
    pub fn loaded_splat_count(&self) -> usize {
        self.counters.loaded_splat_count
    }

    /// Loaded splats in section `index`; 0 for an index past the table.
    #[must_use]
    pub fn section_loaded_count(&self, index: usize) -> usize {
        self.counters
            .section_loaded_counts
            .get(index)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.store.as_slice()
    }

    /// Raw record bytes of splat `splat` in section `section`, or `None` if
    /// that splat has not been loaded yet.
    #[must_use]
    pub fn splat_bytes(&self, section: usize, splat: usize) -> Option<&[u8]> {
        if splat >= self.section_loaded_count(section) {
            return None;
        }
        let layout = self.layout.get(section)?;
        let start = layout.splat_data_offset + splat * layout.bytes_per_splat;
        self.store
            .as_slice()
            .get(start..start + layout.bytes_per_splat)
    }

    /// Decode a loaded splat from a level-0 buffer. Returns `None` for
    /// unloaded splats and for compressed buffers.
    #[must_use]
    pub fn uncompressed_splat(&self, section: usize, splat: usize) -> Option<UncompressedSplat> {
        if self.header.compression_level != CompressionLevel::Uncompressed {
            return None;
        }
        self.splat_bytes(section, splat)
            .map(UncompressedSplat::read_level0)
    }

    /// Iterate over every loaded level-0 splat, in section order.
    pub fn loaded_uncompressed_splats(&self) -> impl Iterator<Item = UncompressedSplat> + '_ {
        (0..self.sections.len()).flat_map(move |section| {
            (0..self.section_loaded_count(section))
                .filter_map(move |splat| self.uncompressed_splat(section, splat))
        })
    }
}

/// Exclusive write handle over a [`SplatBuffer`].
///
/// Owned by whichever assembler is loading the buffer. It is the only way
/// to change the counters or the store after construction.
#[derive(Debug)]
pub struct SplatBufferWriter {
    buffer: SplatBuffer,
}

impl SplatBufferWriter {
    /// Wrap a store with already-decoded headers. Counters start at zero.
    ///
    /// # Errors
    ///
    /// [`BufferError::StoreTooSmall`] if the store is shorter than the
    /// header, the section-header table and every section payload.
    pub fn new(
        store: BackingStore,
        header: SplatHeader,
        sections: Vec<SectionHeader>,
    ) -> Result<Self, BufferError> {
        let level = header.compression_level;
        let mut cursor = section_data_base(header.max_section_count);
        let mut layout = Vec::with_capacity(sections.len());
        for section in &sections {
            layout.push(SectionLayout {
                payload_offset: cursor,
                splat_data_offset: cursor + section.bucket_prefix_bytes(),
                bytes_per_splat: section.bytes_per_splat(level),
            });
            cursor += section.storage_size_bytes;
        }

        if store.len() < cursor {
            return Err(BufferError::StoreTooSmall {
                required: cursor,
                actual: store.len(),
            });
        }

        let counters = LoadCounters {
            section_loaded_counts: vec![0; sections.len()],
            ..LoadCounters::default()
        };

        Ok(Self {
            buffer: SplatBuffer {
                store,
                header,
                sections,
                layout,
                counters,
            },
        })
    }

    #[must_use]
    pub fn buffer(&self) -> &SplatBuffer {
        &self.buffer
    }

    /// Give up write access and return the final buffer.
    #[must_use]
    pub fn finish(self) -> SplatBuffer {
        self.buffer
    }

    pub fn store_mut(&mut self) -> &mut BackingStore {
        &mut self.buffer.store
    }

    /// Record how many sections have been reached and how many splats are
    /// loaded in total. Lower values than the current ones are ignored.
    pub fn update_loaded_counts(&mut self, reached_section_count: usize, loaded_splat_count: usize) {
        let counters = &mut self.buffer.counters;
        debug_assert!(reached_section_count >= counters.reached_section_count);
        debug_assert!(loaded_splat_count >= counters.loaded_splat_count);
        counters.reached_section_count = counters.reached_section_count.max(reached_section_count);
        counters.loaded_splat_count = counters.loaded_splat_count.max(loaded_splat_count);
    }

    /// Record the loaded splat count of one section. Lower values than the
    /// current one are ignored.
    ///
    /// # Errors
    ///
    /// [`BufferError::SectionOutOfRange`] for an index past the table.
    pub fn update_section_loaded_counts(
        &mut self,
        index: usize,
        count: usize,
    ) -> Result<(), BufferError> {
        let counts = &mut self.buffer.counters.section_loaded_counts;
        let len = counts.len();
        let slot = counts.get_mut(index).ok_or(BufferError::SectionOutOfRange {
            index,
            count: len,
        })?;
        debug_assert!(count >= *slot);
        *slot = (*slot).max(count);
        Ok(())
    }

    /// Raise the declared `splat_count` of one section, recompute the file
    /// header's total, and rewrite both records in the store.
    ///
    /// Used by assemblers that build sections as they go; the declared count
    /// never exceeds the section's `max_splat_count`.
    ///
    /// # Errors
    ///
    /// - [`BufferError::SectionOutOfRange`] for an index past the table.
    /// - [`BufferError::Wire`] if a record cannot be rewritten.
    pub fn update_section_splat_count(&mut self, index: usize, count: u32) -> Result<(), BufferError> {
        let buffer = &mut self.buffer;
        let len = buffer.sections.len();
        let section = buffer
            .sections
            .get_mut(index)
            .ok_or(BufferError::SectionOutOfRange { index, count: len })?;
        section.splat_count = section.splat_count.max(count).min(section.max_splat_count);

        buffer.header.splat_count = buffer.sections.iter().map(|s| s.splat_count).sum();
        let level = buffer.header.compression_level;
        let bytes = buffer.store.as_mut_slice();
        buffer.header.write_to(bytes, 0)?;
        write_section_header(&buffer.sections[index], index, level, bytes, HEADER_SIZE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ksplat_wire::{SECTION_HEADER_SIZE, ShDegree};

    use super::*;

    fn level0_writer(splats: u32) -> SplatBufferWriter {
        let header = SplatHeader {
            max_section_count: 1,
            section_count: 1,
            max_splat_count: splats,
            splat_count: splats,
            ..SplatHeader::default()
        };
        let section = SectionHeader {
            max_splat_count: splats,
            splat_count: splats,
            sh_degree: ShDegree::Zero,
            ..SectionHeader::default()
        }
        .with_computed_storage(CompressionLevel::Uncompressed);
        let len = HEADER_SIZE + SECTION_HEADER_SIZE + section.storage_size_bytes;
        SplatBufferWriter::new(BackingStore::with_len(len), header, vec![section]).unwrap()
    }

    #[test]
    fn store_write_past_end_fails() {
        let mut store = BackingStore::with_len(8);
        store.write_at(4, &[1, 2, 3, 4]).unwrap();
        assert!(matches!(
            store.write_at(6, &[0; 4]),
            Err(BufferError::Overflow { offset: 6, len: 4, capacity: 8 })
        ));
        assert_eq!(store.as_slice(), &[0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn layout_places_splats_after_tables() {
        let writer = level0_writer(4);
        let layout = writer.buffer().section_layout()[0];
        assert_eq!(layout.payload_offset, HEADER_SIZE + SECTION_HEADER_SIZE);
        assert_eq!(layout.splat_data_offset, layout.payload_offset);
        assert_eq!(layout.bytes_per_splat, 44);
    }

    #[test]
    fn short_store_is_rejected() {
        let header = SplatHeader {
            max_section_count: 1,
            ..SplatHeader::default()
        };
        let section = SectionHeader {
            max_splat_count: 2,
            ..SectionHeader::default()
        }
        .with_computed_storage(CompressionLevel::Uncompressed);
        let result = SplatBufferWriter::new(BackingStore::with_len(HEADER_SIZE), header, vec![section]);
        assert!(matches!(result, Err(BufferError::StoreTooSmall { .. })));
    }

    #[test]
    fn splats_are_gated_by_loaded_count() {
        let mut writer = level0_writer(3);
        let offset = writer.buffer().section_layout()[0].splat_data_offset;
        let splat = UncompressedSplat {
            center: [1.0, 1.0, 1.0],
            color: [1, 2, 3, 4],
            ..UncompressedSplat::default()
        };
        let mut rec = [0u8; 44];
        splat.write_level0(&mut rec);
        writer.store_mut().write_at(offset, &rec).unwrap();

        assert!(writer.buffer().uncompressed_splat(0, 0).is_none());
        writer.update_section_loaded_counts(0, 1).unwrap();
        writer.update_loaded_counts(1, 1);

        let buffer = writer.finish();
        assert_eq!(buffer.uncompressed_splat(0, 0), Some(splat));
        assert!(buffer.splat_bytes(0, 1).is_none());
        assert_eq!(buffer.loaded_uncompressed_splats().count(), 1);
    }

    #[test]
    fn splat_count_update_rewrites_headers() {
        let mut writer = level0_writer(3);
        writer.update_section_splat_count(0, 2).unwrap();
        writer.update_section_splat_count(0, 9).unwrap();

        let buffer = writer.finish();
        assert_eq!(buffer.section_headers()[0].splat_count, 3);
        assert_eq!(buffer.header().splat_count, 3);

        let bytes = buffer.as_bytes();
        assert_eq!(SplatHeader::read_from(bytes).unwrap().splat_count, 3);
        let section =
            SectionHeader::read_from(CompressionLevel::Uncompressed, 0, &bytes[HEADER_SIZE..]).unwrap();
        assert_eq!(section.splat_count, 3);
    }

    #[test]
    fn section_update_out_of_range() {
        let mut writer = level0_writer(3);
        assert!(matches!(
            writer.update_section_loaded_counts(1, 1),
            Err(BufferError::SectionOutOfRange { index: 1, count: 1 })
        ));
    }
}
