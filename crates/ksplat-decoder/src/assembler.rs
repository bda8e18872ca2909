use bytes::Bytes;
use ksplat_types::{BufferError, SplatBuffer, SplatBufferWriter};
use ksplat_wire::header::check_raw_version;
use ksplat_wire::section::section_data_base;
use ksplat_wire::{HEADER_SIZE, SectionHeader, SplatHeader, parse_section_headers};
use tracing::{debug, trace};

use crate::error::DecodeError;
use crate::ingest::StreamIngestBuffer;

/// Bytes that must accumulate past the streamed mark before a tick does
/// any work.
pub const DEFAULT_STREAMING_GRANULARITY: usize = 262_144;

/// Largest backing store the assembler allocates unless told otherwise.
pub const DEFAULT_MAX_STORE_BYTES: usize = 1 << 32;

/// Progress of the assembler. States only move forward:
///
/// ```text
///   AwaitingHeader → AwaitingSectionHeaders → StreamingSections → Complete
///          └──────────────────┴────────────────────┴──→ Truncated
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssemblerState {
    AwaitingHeader,
    AwaitingSectionHeaders,
    StreamingSections,
    Complete,
    /// The download ended short of what the headers declare. Terminal:
    /// ticks stay idle and [`ProgressiveAssembler::finish`] fails.
    Truncated,
}

/// Result of one firing tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Streamed mark after this tick; never past the bytes received.
    pub bytes_streamed: usize,
    /// Header, section-header table and every section payload.
    pub total_bytes: usize,
    /// `bytes_streamed / total_bytes * 100`; exactly 100 on the completing tick.
    pub percent: f64,
    pub load_complete: bool,
}

impl TickReport {
    /// `percent` with two decimals, e.g. `"37.43%"`.
    #[must_use]
    pub fn percent_label(&self) -> String {
        format!("{:.2}%", self.percent)
    }
}

/// Outcome of [`ProgressiveAssembler::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum Tick {
    /// Not enough new bytes since the last emission (or not streaming yet).
    Idle,
    /// Counters were advanced; the buffer view should be re-read.
    Emitted(TickReport),
}

/// Progressive `.ksplat` assembler: turns arbitrarily-chunked bytes into a
/// growing [`SplatBuffer`].
///
/// The assembler does no I/O and owns no timer. Callers feed it chunks with
/// [`push_chunk`](Self::push_chunk) as they arrive and call
/// [`tick`](Self::tick) on their own cadence; a tick only does work once
/// more than `granularity` new bytes are available or the download is
/// complete. That keeps the number of emissions proportional to the file
/// size no matter how the transport chunks it.
///
/// Header and section-header detection happen on chunk arrival:
///
/// ```text
///   AwaitingHeader          loaded ≥ HEADER_SIZE         → decode, version check
///   AwaitingSectionHeaders  loaded ≥ HEADER_SIZE
///                                  + max_sections × 1024 → decode table,
///                                                          allocate exact store
///   StreamingSections       tick                         → account loaded splats
///   Complete                streamed == total
/// ```
///
/// A version failure is returned before any store is allocated, and a
/// declared size above the store limit is refused before allocating.
#[derive(Debug)]
pub struct ProgressiveAssembler {
    granularity: usize,
    max_store_bytes: usize,
    state: AssemblerState,
    ingest: StreamIngestBuffer,
    header: Option<SplatHeader>,
    writer: Option<SplatBufferWriter>,
    num_bytes_streamed: usize,
    total_bytes_to_download: usize,
    download_complete: bool,
}

impl Default for ProgressiveAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_STREAMING_GRANULARITY)
    }
}

impl ProgressiveAssembler {
    /// Create an assembler that emits at most once per `granularity` bytes.
    /// A granularity of 0 is treated as 1.
    #[must_use]
    pub fn new(granularity: usize) -> Self {
        Self {
            granularity: granularity.max(1),
            max_store_bytes: DEFAULT_MAX_STORE_BYTES,
            state: AssemblerState::AwaitingHeader,
            ingest: StreamIngestBuffer::new(),
            header: None,
            writer: None,
            num_bytes_streamed: 0,
            total_bytes_to_download: 0,
            download_complete: false,
        }
    }

    /// Cap the backing store at `bytes`. Headers declaring a larger file
    /// fail with [`DecodeError::TooLarge`].
    #[must_use]
    pub fn with_max_store_bytes(mut self, bytes: usize) -> Self {
        self.max_store_bytes = bytes;
        self
    }

    #[must_use]
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// `true` once the store exists and ticks can advance the counters.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state == AssemblerState::StreamingSections
    }

    /// Every byte pushed so far, queued or already in the store.
    #[must_use]
    pub fn num_bytes_loaded(&self) -> usize {
        self.ingest.num_bytes_loaded()
    }

    /// Bytes the counters have been advanced over.
    #[must_use]
    pub fn num_bytes_streamed(&self) -> usize {
        self.num_bytes_streamed
    }

    /// Zero until the section headers have been decoded.
    #[must_use]
    pub fn total_bytes_to_download(&self) -> usize {
        self.total_bytes_to_download
    }

    /// `false` until the section headers have been decoded.
    #[must_use]
    pub fn has_backing_store(&self) -> bool {
        self.writer.is_some()
    }

    /// The file header, once decoded and version-checked.
    #[must_use]
    pub fn header(&self) -> Option<&SplatHeader> {
        self.header
            .as_ref()
            .or_else(|| self.writer.as_ref().map(|w| w.buffer().header()))
    }

    /// The buffer view, once the section headers have been decoded.
    #[must_use]
    pub fn view(&self) -> Option<&SplatBuffer> {
        self.writer.as_ref().map(SplatBufferWriter::buffer)
    }

    /// Release the buffer. The counters stop changing from here on.
    #[must_use]
    pub fn into_buffer(self) -> Option<SplatBuffer> {
        self.writer.map(SplatBufferWriter::finish)
    }

    /// Release the buffer of a load whose every declared byte arrived.
    ///
    /// Counters not yet ticked up are brought to the full count first, so
    /// the result matches a one-shot decode of the same bytes.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] if the download ended short, or no buffer
    /// was ever built.
    pub fn finish(self) -> Result<SplatBuffer, DecodeError> {
        let received = self.num_bytes_loaded();
        let expected = self.total_bytes_to_download.max(HEADER_SIZE);
        let truncated = DecodeError::Truncated { expected, received };
        if self.state == AssemblerState::Truncated || received < self.total_bytes_to_download {
            return Err(truncated);
        }
        let mut writer = self.writer.ok_or(truncated)?;
        if self.state != AssemblerState::Complete {
            account_loaded_splats(&mut writer, self.total_bytes_to_download)?;
        }
        Ok(writer.finish())
    }

    /// Feed the next chunk in arrival order.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Wire`] if the header fails the version rule or a
    ///   record cannot be decoded. No store has been allocated then.
    /// - [`DecodeError::TrailingData`] if bytes arrive past the declared
    ///   size.
    /// - [`DecodeError::TooLarge`] if the section headers declare more
    ///   than the store limit.
    pub fn push_chunk(&mut self, chunk: Bytes) -> Result<(), DecodeError> {
        let store = self.writer.as_mut().map(SplatBufferWriter::store_mut);
        self.ingest.append(chunk, store)?;
        self.advance_headers()
    }

    /// Tell the assembler the transport has delivered everything it will.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] if fewer bytes arrived than the current
    /// stage needs. The assembler is then in
    /// [`AssemblerState::Truncated`] for good.
    pub fn mark_download_complete(&mut self) -> Result<(), DecodeError> {
        let received = self.num_bytes_loaded();
        let expected = match self.state {
            AssemblerState::AwaitingHeader => HEADER_SIZE,
            AssemblerState::AwaitingSectionHeaders => self
                .header
                .as_ref()
                .map_or(HEADER_SIZE, |h| section_data_base(h.max_section_count)),
            AssemblerState::StreamingSections
            | AssemblerState::Complete
            | AssemblerState::Truncated => self.total_bytes_to_download,
        };
        if self.state == AssemblerState::Truncated || received < expected {
            debug!(expected, received, "download ended early");
            self.state = AssemblerState::Truncated;
            return Err(DecodeError::Truncated { expected, received });
        }
        self.download_complete = true;
        Ok(())
    }

    fn advance_headers(&mut self) -> Result<(), DecodeError> {
        let loaded = self.num_bytes_loaded();

        if self.state == AssemblerState::AwaitingHeader && loaded >= HEADER_SIZE {
            if let Some(raw) = self.ingest.prefix(HEADER_SIZE) {
                check_raw_version(&raw)?;
                let header = SplatHeader::read_from(&raw)?;
                header.check_version()?;
                debug!(
                    version = %format!("{}.{}", header.version_major, header.version_minor),
                    max_sections = header.max_section_count,
                    level = ?header.compression_level,
                    "ksplat header decoded"
                );
                self.header = Some(header);
                self.state = AssemblerState::AwaitingSectionHeaders;
            }
        }

        if self.state == AssemblerState::AwaitingSectionHeaders {
            let Some(header) = self.header.clone() else {
                return Ok(());
            };
            let table_end = section_data_base(header.max_section_count);
            if loaded < table_end {
                return Ok(());
            }
            let Some(raw) = self.ingest.prefix(table_end) else {
                return Ok(());
            };
            let sections = parse_section_headers(&header, &raw, HEADER_SIZE)?;
            let total = total_storage_size(header.max_section_count, &sections);
            if total > self.max_store_bytes {
                return Err(DecodeError::TooLarge {
                    declared: total,
                    limit: self.max_store_bytes,
                });
            }

            let store = self.ingest.flush_into(total)?;
            debug!(
                sections = sections.len(),
                total_bytes = total,
                "section headers decoded, backing store allocated"
            );
            self.writer = Some(SplatBufferWriter::new(store, header, sections)?);
            self.header = None;
            self.total_bytes_to_download = total;
            self.state = AssemblerState::StreamingSections;
        }

        Ok(())
    }

    /// Run one throttled step.
    ///
    /// Does nothing unless more than `granularity` bytes have arrived since
    /// the last emission or the download is complete. Otherwise advances the
    /// streamed mark by one granularity unit (clamped to the total), walks
    /// the sections in order and raises their loaded counts, and reports
    /// progress.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Buffer`] if the counters cannot be updated; this
    /// indicates a corrupted layout rather than bad input.
    pub fn tick(&mut self) -> Result<Tick, DecodeError> {
        if self.state != AssemblerState::StreamingSections {
            return Ok(Tick::Idle);
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(Tick::Idle);
        };

        let loaded = self.ingest.num_bytes_loaded();
        let total = self.total_bytes_to_download;
        let download_complete = self.download_complete || loaded >= total;
        let pending = loaded.saturating_sub(self.num_bytes_streamed);
        if pending <= self.granularity && !download_complete {
            return Ok(Tick::Idle);
        }

        self.num_bytes_streamed = (self.num_bytes_streamed + self.granularity).min(total);
        let load_complete = self.num_bytes_streamed >= total;

        account_loaded_splats(writer, self.num_bytes_streamed)?;

        #[allow(clippy::cast_precision_loss)]
        let percent = if total == 0 {
            100.0
        } else {
            self.num_bytes_streamed as f64 / total as f64 * 100.0
        };

        trace!(
            streamed = self.num_bytes_streamed,
            total,
            reached = writer.buffer().reached_section_count(),
            splats = writer.buffer().loaded_splat_count(),
            "section tick"
        );

        if load_complete {
            self.state = AssemblerState::Complete;
            debug!(
                splats = writer.buffer().loaded_splat_count(),
                "progressive load complete"
            );
        }

        Ok(Tick::Emitted(TickReport {
            bytes_streamed: self.num_bytes_streamed,
            total_bytes: total,
            percent,
            load_complete,
        }))
    }
}

/// Header, section-header table and every section payload.
fn total_storage_size(max_section_count: u32, sections: &[SectionHeader]) -> usize {
    section_data_base(max_section_count)
        + sections
            .iter()
            .take(max_section_count as usize)
            .map(|s| s.storage_size_bytes)
            .sum::<usize>()
}

/// Raise the writer's counters to what `bytes_streamed` bytes cover.
///
/// Sections are walked in index order. A section is reached once the
/// streamed mark passes the end of its bucket prefix; its loaded count is
/// the number of whole records past that point, capped at
/// `max_splat_count`. The walk stops at the first unreached section, since
/// sections are laid out back to back.
///
/// # Errors
///
/// [`BufferError::SectionOutOfRange`] only if the writer's layout and
/// section table disagree.
pub fn account_loaded_splats(
    writer: &mut SplatBufferWriter,
    bytes_streamed: usize,
) -> Result<(), BufferError> {
    let mut reached = 0;
    let mut loaded_total = 0;

    for index in 0..writer.buffer().section_layout().len() {
        let layout = writer.buffer().section_layout()[index];
        let max_splats = writer.buffer().section_headers()[index].max_splat_count as usize;

        if bytes_streamed < layout.splat_data_offset {
            break;
        }
        reached += 1;

        let past_start = bytes_streamed - layout.splat_data_offset;
        let loaded = (past_start / layout.bytes_per_splat).min(max_splats);
        loaded_total += loaded;

        writer.update_section_loaded_counts(index, loaded)?;
        writer.update_loaded_counts(reached, loaded_total);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ksplat_encoder::SplatEncoder;
    use ksplat_types::UncompressedSplat;
    use ksplat_wire::{CompressionLevel, SECTION_HEADER_SIZE, ShDegree, WireError};

    use super::*;

    fn splats(n: usize) -> Vec<UncompressedSplat> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f32;
                UncompressedSplat {
                    center: [x, 0.0, 0.0],
                    scale: [1.0; 3],
                    rotation: [1.0, 0.0, 0.0, 0.0],
                    color: [255, 0, 0, 255],
                }
            })
            .collect()
    }

    fn level0_payload(counts: &[usize]) -> Vec<u8> {
        let mut enc = SplatEncoder::new(CompressionLevel::Uncompressed);
        for &n in counts {
            enc.add_splats(&splats(n));
        }
        enc.encode().unwrap()
    }

    fn drain(asm: &mut ProgressiveAssembler) -> Vec<TickReport> {
        let mut reports = Vec::new();
        loop {
            match asm.tick().unwrap() {
                Tick::Idle => break,
                Tick::Emitted(r) => {
                    let done = r.load_complete;
                    reports.push(r);
                    if done {
                        break;
                    }
                }
            }
        }
        reports
    }

    #[test]
    fn states_advance_as_bytes_arrive() {
        let payload = level0_payload(&[10]);
        let mut asm = ProgressiveAssembler::new(64);
        assert_eq!(asm.state(), AssemblerState::AwaitingHeader);

        asm.push_chunk(Bytes::copy_from_slice(&payload[..100])).unwrap();
        assert_eq!(asm.state(), AssemblerState::AwaitingHeader);

        asm.push_chunk(Bytes::copy_from_slice(&payload[100..HEADER_SIZE + 10]))
            .unwrap();
        assert_eq!(asm.state(), AssemblerState::AwaitingSectionHeaders);
        assert!(!asm.has_backing_store());

        asm.push_chunk(Bytes::copy_from_slice(
            &payload[HEADER_SIZE + 10..HEADER_SIZE + SECTION_HEADER_SIZE],
        ))
        .unwrap();
        assert_eq!(asm.state(), AssemblerState::StreamingSections);
        assert!(asm.has_backing_store());
        assert_eq!(asm.total_bytes_to_download(), payload.len());
    }

    #[test]
    fn tick_waits_for_granularity() {
        let payload = level0_payload(&[100]);
        let table_end = HEADER_SIZE + SECTION_HEADER_SIZE;
        let mut asm = ProgressiveAssembler::new(1000);
        asm.push_chunk(Bytes::copy_from_slice(&payload[..table_end])).unwrap();

        // table_end bytes pending > 1000, so the first tick fires.
        assert!(matches!(asm.tick().unwrap(), Tick::Emitted(_)));
        assert_eq!(asm.num_bytes_streamed(), 1000);
        // The rest of the table is still pending, but no splat bytes yet.
        assert!(matches!(asm.tick().unwrap(), Tick::Emitted(_)));
        assert!(matches!(asm.tick().unwrap(), Tick::Emitted(_)));
        assert!(matches!(asm.tick().unwrap(), Tick::Emitted(_)));
        assert!(matches!(asm.tick().unwrap(), Tick::Emitted(_)));
        assert_eq!(asm.num_bytes_streamed(), 5000);
        assert_eq!(asm.tick().unwrap(), Tick::Idle);
        assert_eq!(asm.view().unwrap().loaded_splat_count(), 0);
    }

    #[test]
    fn completing_tick_is_exact() {
        let payload = level0_payload(&[37, 5]);
        let mut asm = ProgressiveAssembler::new(500);
        asm.push_chunk(Bytes::from(payload.clone())).unwrap();
        asm.mark_download_complete().unwrap();

        let reports = drain(&mut asm);
        let last = reports.last().unwrap();
        assert!(last.load_complete);
        assert_eq!(last.bytes_streamed, payload.len());
        assert!((last.percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(last.percent_label(), "100.00%");
        assert_eq!(asm.state(), AssemblerState::Complete);
        assert_eq!(asm.tick().unwrap(), Tick::Idle);

        let view = asm.into_buffer().unwrap();
        assert_eq!(view.section_loaded_count(0), 37);
        assert_eq!(view.section_loaded_count(1), 5);
        assert_eq!(view.loaded_splat_count(), 42);
        assert_eq!(view.reached_section_count(), 2);
    }

    #[test]
    fn counters_never_decrease() {
        let payload = level0_payload(&[64, 64, 64]);
        let mut asm = ProgressiveAssembler::new(300);
        let mut last = (0, 0, vec![0usize; 3]);
        for chunk in payload.chunks(777) {
            asm.push_chunk(Bytes::copy_from_slice(chunk)).unwrap();
            while let Tick::Emitted(_) = asm.tick().unwrap() {
                let v = asm.view().unwrap();
                let now = (
                    v.reached_section_count(),
                    v.loaded_splat_count(),
                    v.counters().section_loaded_counts().to_vec(),
                );
                assert!(now.0 >= last.0 && now.1 >= last.1);
                assert!(now.2.iter().zip(&last.2).all(|(a, b)| a >= b));
                last = now;
                if asm.state() == AssemblerState::Complete {
                    break;
                }
            }
        }
        asm.mark_download_complete().unwrap();
        drain(&mut asm);
        assert_eq!(asm.view().unwrap().loaded_splat_count(), 192);
    }

    #[test]
    fn old_version_fails_before_allocation() {
        let mut payload = level0_payload(&[4]);
        payload[0] = 0;
        payload[1] = 0;
        let mut asm = ProgressiveAssembler::new(64);
        let err = asm.push_chunk(Bytes::from(payload)).unwrap_err();
        assert!(err.is_version_error());
        assert!(matches!(
            err,
            DecodeError::Wire(WireError::UnsupportedVersion {
                major: 0,
                minor: 0,
                min_major: 0,
                min_minor: 1
            })
        ));
        assert!(!asm.has_backing_store());
        assert_eq!(asm.state(), AssemblerState::AwaitingHeader);
    }

    #[test]
    fn truncated_stream_is_reported() {
        let payload = level0_payload(&[10]);
        let mut asm = ProgressiveAssembler::new(64);
        asm.push_chunk(Bytes::copy_from_slice(&payload[..payload.len() - 1]))
            .unwrap();
        let err = asm.mark_download_complete().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated { expected, received } if expected == payload.len() && received == payload.len() - 1
        ));

        let mut short = ProgressiveAssembler::new(64);
        short.push_chunk(Bytes::from_static(&[0, 1, 0])).unwrap();
        assert!(matches!(
            short.mark_download_complete(),
            Err(DecodeError::Truncated { expected: HEADER_SIZE, received: 3 })
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut payload = level0_payload(&[2]);
        payload.extend_from_slice(&[0xAB; 5]);
        let mut asm = ProgressiveAssembler::new(64);
        let err = asm.push_chunk(Bytes::from(payload)).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingData { extra_bytes: 5, .. }));
    }

    #[test]
    fn bucket_prefix_delays_reach() {
        let level = CompressionLevel::Quantized;
        let section = SectionHeader {
            max_splat_count: 10,
            splat_count: 10,
            bucket_size: 256,
            bucket_count: 2,
            bucket_storage_size_bytes: 12,
            partially_filled_bucket_count: 1,
            sh_degree: ShDegree::Zero,
            ..SectionHeader::default()
        };
        let mut enc = SplatEncoder::new(level);
        enc.add_section(section);
        let payload = enc.encode().unwrap();

        let mut asm = ProgressiveAssembler::new(1);
        asm.push_chunk(Bytes::from(payload)).unwrap();
        let prefix_end = HEADER_SIZE + SECTION_HEADER_SIZE + 4 + 2 * 12;

        let mut writer_view_counts = Vec::new();
        while let Tick::Emitted(r) = asm.tick().unwrap() {
            let v = asm.view().unwrap();
            writer_view_counts.push((
                r.bytes_streamed,
                v.reached_section_count(),
                v.section_loaded_count(0),
            ));
            if r.load_complete {
                break;
            }
        }
        for (streamed, reached, loaded) in writer_view_counts {
            if streamed < prefix_end {
                assert_eq!(reached, 0);
            } else {
                assert_eq!(reached, 1);
                assert_eq!(loaded, ((streamed - prefix_end) / 24).min(10));
            }
        }
    }

    #[test]
    fn empty_section_completes() {
        let payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .add_section(SectionHeader::default())
            .encode()
            .unwrap();
        let mut asm = ProgressiveAssembler::new(64);
        asm.push_chunk(Bytes::from(payload)).unwrap();
        assert!(asm.is_streaming());
        let reports = drain(&mut asm);
        assert!(reports.last().unwrap().load_complete);
        assert_eq!(asm.view().unwrap().loaded_splat_count(), 0);
    }

    #[test]
    fn truncation_is_terminal() {
        let payload = level0_payload(&[100]);
        assert_eq!(payload.len(), 9520);
        let mut asm = ProgressiveAssembler::new(1000);
        asm.push_chunk(Bytes::copy_from_slice(&payload[..7320])).unwrap();
        drain(&mut asm);
        let streamed = asm.num_bytes_streamed();
        assert!(streamed <= 7320);

        let err = asm.mark_download_complete().unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { expected: 9520, received: 7320 }));
        assert_eq!(asm.state(), AssemblerState::Truncated);

        // Nothing past the received bytes is ever accounted.
        assert_eq!(asm.tick().unwrap(), Tick::Idle);
        assert_eq!(asm.num_bytes_streamed(), streamed);
        assert!(asm.view().unwrap().loaded_splat_count() <= (7320 - 5120) / 44);
        assert!(matches!(
            asm.mark_download_complete(),
            Err(DecodeError::Truncated { .. })
        ));
        assert!(matches!(
            asm.finish(),
            Err(DecodeError::Truncated { expected: 9520, received: 7320 })
        ));
    }

    #[test]
    fn finish_accounts_unticked_bytes() {
        let payload = level0_payload(&[20, 3]);
        let expected = crate::SplatDecoder::decode(payload.clone()).unwrap();
        let mut asm = ProgressiveAssembler::new(1 << 20);
        asm.push_chunk(Bytes::from(payload)).unwrap();
        let buffer = asm.finish().unwrap();
        assert_eq!(buffer.counters(), expected.counters());
    }

    #[test]
    fn store_limit_is_checked_before_allocation() {
        let payload = level0_payload(&[10]);
        let mut capped = ProgressiveAssembler::new(64).with_max_store_bytes(5000);
        let err = capped.push_chunk(Bytes::from(payload.clone())).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { declared: 5560, limit: 5000 }));
        assert!(!capped.has_backing_store());

        // One level-0 section claiming u32::MAX splats.
        let mut table = payload[..HEADER_SIZE + SECTION_HEADER_SIZE].to_vec();
        table[HEADER_SIZE + 4..HEADER_SIZE + 8].copy_from_slice(&u32::MAX.to_le_bytes());
        let mut asm = ProgressiveAssembler::new(64);
        let err = asm.push_chunk(Bytes::from(table)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TooLarge { limit: DEFAULT_MAX_STORE_BYTES, .. }
        ));
        assert!(!asm.has_backing_store());
    }
}
