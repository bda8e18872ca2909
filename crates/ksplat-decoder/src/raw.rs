use bytes::Bytes;
use ksplat_types::{BackingStore, RAW_ROW_SIZE, SplatBuffer, SplatBufferWriter, UncompressedSplat};
use ksplat_wire::section::section_data_base;
use ksplat_wire::{CompressionLevel, HEADER_SIZE, SectionHeader, ShDegree, SplatHeader};
use tracing::{debug, trace};

use crate::assembler::DEFAULT_MAX_STORE_BYTES;
use crate::error::DecodeError;

/// Decode every row of a complete raw `.splat` payload, in file order.
///
/// # Errors
///
/// [`DecodeError::Truncated`] if the payload ends in a partial row.
pub fn parse_raw_splats(payload: &[u8]) -> Result<Vec<UncompressedSplat>, DecodeError> {
    let rows = payload.chunks_exact(RAW_ROW_SIZE);
    if !rows.remainder().is_empty() {
        return Err(DecodeError::Truncated {
            expected: payload.len().next_multiple_of(RAW_ROW_SIZE),
            received: payload.len(),
        });
    }
    Ok(rows.map(decode_row).collect())
}

fn decode_row(row: &[u8]) -> UncompressedSplat {
    let mut fixed = [0u8; RAW_ROW_SIZE];
    fixed.copy_from_slice(row);
    UncompressedSplat::from_raw_row(&fixed)
}

/// Result of a conversion pass in [`RawSplatAssembler`].
#[derive(Clone, Debug, PartialEq)]
pub struct RawTick {
    /// Splats converted so far.
    pub splat_count: usize,
    pub bytes_loaded: usize,
    pub total_bytes: usize,
    pub percent: f64,
}

/// Streaming converter from raw `.splat` rows to a single level-0 section.
///
/// The total size hint fixes the maximum splat count, so the store can be
/// allocated once. Incoming bytes are converted a granularity at a time;
/// only whole rows are converted, a partial row waits for the next chunk.
///
/// ```text
///   hint = N × 32 bytes  →  store = header + 1 section header + N × 44
///   push_chunk           →  convert whole rows once > granularity pending
///   finish               →  convert the rest, load complete
/// ```
#[derive(Debug)]
pub struct RawSplatAssembler {
    granularity: usize,
    total_size_hint: usize,
    max_splat_count: u32,
    pending: Vec<u8>,
    bytes_loaded: usize,
    splats: Vec<UncompressedSplat>,
    header: SplatHeader,
    writer: Option<SplatBufferWriter>,
}

impl RawSplatAssembler {
    /// # Errors
    ///
    /// - [`DecodeError::Truncated`] if the hint cannot describe whole rows
    ///   representable in a `.ksplat` header.
    /// - [`DecodeError::TooLarge`] if the converted store would exceed
    ///   [`DEFAULT_MAX_STORE_BYTES`].
    pub fn new(total_size_hint: usize, granularity: usize) -> Result<Self, DecodeError> {
        let max_splat_count = u32::try_from(total_size_hint / RAW_ROW_SIZE).map_err(|_| {
            DecodeError::Truncated {
                expected: u32::MAX as usize * RAW_ROW_SIZE,
                received: total_size_hint,
            }
        })?;
        let declared = section_data_base(1)
            + max_splat_count as usize * UncompressedSplat::level0_size();
        if declared > DEFAULT_MAX_STORE_BYTES {
            return Err(DecodeError::TooLarge {
                declared,
                limit: DEFAULT_MAX_STORE_BYTES,
            });
        }

        let header = SplatHeader {
            max_section_count: 1,
            section_count: 1,
            max_splat_count,
            splat_count: 0,
            compression_level: CompressionLevel::Uncompressed,
            ..SplatHeader::default()
        };
        debug!(max_splat_count, "raw splat header prepared");

        Ok(Self {
            granularity: granularity.max(1),
            total_size_hint,
            max_splat_count,
            pending: Vec::new(),
            bytes_loaded: 0,
            splats: Vec::with_capacity(max_splat_count as usize),
            header,
            writer: None,
        })
    }

    #[must_use]
    pub fn bytes_loaded(&self) -> usize {
        self.bytes_loaded
    }

    #[must_use]
    pub fn splat_count(&self) -> usize {
        self.splats.len()
    }

    /// Every splat converted so far, in row order.
    #[must_use]
    pub fn splats(&self) -> &[UncompressedSplat] {
        &self.splats
    }

    /// `None` until the first conversion pass.
    #[must_use]
    pub fn view(&self) -> Option<&SplatBuffer> {
        self.writer.as_ref().map(SplatBufferWriter::buffer)
    }

    /// Feed the next chunk. Returns a report when the chunk pushed the
    /// pending bytes past the granularity and rows were converted.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TrailingData`] if more rows arrive than the size hint
    /// announced.
    pub fn push_chunk(&mut self, chunk: &Bytes) -> Result<Option<RawTick>, DecodeError> {
        self.bytes_loaded += chunk.len();
        self.pending.extend_from_slice(chunk);
        if self.pending.len() <= self.granularity {
            return Ok(None);
        }
        self.convert_pending()?;
        Ok(Some(self.report()))
    }

    /// Convert whatever is still pending and hand over the completed
    /// buffer together with every converted splat in row order, e.g. for
    /// an optimization pass.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Truncated`] if the input ends in a partial row.
    /// - [`DecodeError::TrailingData`] if more rows arrived than announced.
    pub fn finish(mut self) -> Result<(SplatBuffer, Vec<UncompressedSplat>), DecodeError> {
        self.convert_pending()?;
        if !self.pending.is_empty() {
            return Err(DecodeError::Truncated {
                expected: self.bytes_loaded.next_multiple_of(RAW_ROW_SIZE),
                received: self.bytes_loaded,
            });
        }
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.build_writer()?,
        };
        debug!(splats = self.splats.len(), "raw splat load complete");
        Ok((writer.finish(), self.splats))
    }

    fn report(&self) -> RawTick {
        #[allow(clippy::cast_precision_loss)]
        let percent = if self.total_size_hint == 0 {
            100.0
        } else {
            (self.bytes_loaded as f64 / self.total_size_hint as f64 * 100.0).min(100.0)
        };
        RawTick {
            splat_count: self.splats.len(),
            bytes_loaded: self.bytes_loaded,
            total_bytes: self.total_size_hint,
            percent,
        }
    }

    /// The section header is only synthesized on the first pass.
    fn ensure_writer(&mut self) -> Result<&mut SplatBufferWriter, DecodeError> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.build_writer()?,
        };
        Ok(self.writer.insert(writer))
    }

    fn build_writer(&self) -> Result<SplatBufferWriter, DecodeError> {
        let section = SectionHeader {
            splat_count: 0,
            max_splat_count: self.max_splat_count,
            sh_degree: ShDegree::Zero,
            ..SectionHeader::default()
        }
        .with_computed_storage(CompressionLevel::Uncompressed);
        let total = section_data_base(1) + section.storage_size_bytes;

        let mut store = BackingStore::with_len(total);
        self.header.write_to(store.as_mut_slice(), 0)?;
        section.write_to(CompressionLevel::Uncompressed, store.as_mut_slice(), HEADER_SIZE)?;

        let mut writer = SplatBufferWriter::new(store, self.header.clone(), vec![section])?;
        writer.update_loaded_counts(1, 0);
        Ok(writer)
    }

    fn convert_pending(&mut self) -> Result<(), DecodeError> {
        let whole = self.pending.len() / RAW_ROW_SIZE * RAW_ROW_SIZE;
        if whole == 0 {
            return Ok(());
        }

        let first = self.splats.len();
        let rows = whole / RAW_ROW_SIZE;
        if first + rows > self.max_splat_count as usize {
            return Err(DecodeError::TrailingData {
                expected: self.total_size_hint,
                extra_bytes: self.bytes_loaded.saturating_sub(self.total_size_hint),
            });
        }

        let converted: Vec<UncompressedSplat> =
            self.pending[..whole].chunks_exact(RAW_ROW_SIZE).map(decode_row).collect();
        self.pending.drain(..whole);

        let writer = self.ensure_writer()?;
        let base = writer.buffer().section_layout()[0].splat_data_offset;
        let mut record = [0u8; UncompressedSplat::level0_size()];
        for (i, splat) in converted.iter().enumerate() {
            splat.write_level0(&mut record);
            writer
                .store_mut()
                .write_at(base + (first + i) * record.len(), &record)?;
        }

        let count = first + rows;
        let declared = u32::try_from(count).unwrap_or(u32::MAX);
        writer.update_section_splat_count(0, declared)?;
        writer.update_section_loaded_counts(0, count)?;
        writer.update_loaded_counts(1, count);
        trace!(splats = count, "raw rows converted");

        self.splats.extend(converted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn rows(n: usize) -> Vec<u8> {
        (0..n)
            .flat_map(|i| {
                UncompressedSplat {
                    center: [i as f32, 0.0, 0.0],
                    scale: [1.0; 3],
                    rotation: [1.0, 0.0, 0.0, 0.0],
                    color: [1, 2, 3, i as u8],
                }
                .to_raw_row()
            })
            .collect()
    }

    #[test]
    fn parse_rejects_partial_row() {
        assert_eq!(parse_raw_splats(&rows(3)).unwrap().len(), 3);
        let mut bytes = rows(2);
        bytes.pop();
        assert!(matches!(
            parse_raw_splats(&bytes),
            Err(DecodeError::Truncated { expected: 64, received: 63 })
        ));
    }

    #[test]
    fn splat_count_grows_by_whole_rows() {
        let data = rows(10);
        let mut asm = RawSplatAssembler::new(data.len(), 50).unwrap();
        let mut last = 0;
        for chunk in data.chunks(45) {
            if let Some(tick) = asm.push_chunk(&Bytes::copy_from_slice(chunk)).unwrap() {
                assert!(tick.splat_count >= last);
                assert_eq!(tick.splat_count, tick.bytes_loaded / RAW_ROW_SIZE);
                last = tick.splat_count;
                let view = asm.view().unwrap();
                assert_eq!(view.section_loaded_count(0), tick.splat_count);
                assert_eq!(
                    view.section_headers()[0].splat_count as usize,
                    tick.splat_count
                );
            }
        }
        let (buffer, splats) = asm.finish().unwrap();
        assert_eq!(splats.len(), 10);
        assert_eq!(buffer.loaded_splat_count(), 10);
        assert_eq!(buffer.header().splat_count, 10);
        assert_eq!(buffer.uncompressed_splat(0, 7).unwrap().center[0], 7.0);
    }

    #[test]
    fn rows_past_hint_are_trailing() {
        let data = rows(4);
        let mut asm = RawSplatAssembler::new(2 * RAW_ROW_SIZE, 1).unwrap();
        let err = asm.push_chunk(&Bytes::from(data)).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingData { .. }));
    }

    #[test]
    fn partial_final_row_is_truncated() {
        let mut data = rows(2);
        data.truncate(50);
        let mut asm = RawSplatAssembler::new(64, 1000).unwrap();
        assert!(asm.push_chunk(&Bytes::from(data)).unwrap().is_none());
        assert!(matches!(asm.finish(), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn oversized_hint_is_refused_before_allocation() {
        let err = RawSplatAssembler::new(200_000_000 * RAW_ROW_SIZE, 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TooLarge { limit: DEFAULT_MAX_STORE_BYTES, .. }
        ));
    }
}
