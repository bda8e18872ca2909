//! Shared fixtures for the integration suites, benches and the fixture
//! generator.
//!
//! Every payload is built with [`SplatEncoder`], so the suites never depend
//! on committed binaries.

use bytes::Bytes;
use ksplat_decoder::{AssemblerState, DecodeError, ProgressiveAssembler, Tick};
use ksplat_encoder::SplatEncoder;
use ksplat_types::{SplatBuffer, UncompressedSplat};
use ksplat_wire::{CompressionLevel, SectionHeader, ShDegree};

// ── Payloads ──────────────────────────────────────────────────────────────────

/// A splat whose x coordinate and alpha identify it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn splat(i: usize, alpha: u8) -> UncompressedSplat {
    UncompressedSplat {
        center: [i as f32, -(i as f32), 0.5],
        scale: [0.25, 0.5, 1.0],
        rotation: [1.0, 0.0, 0.0, 0.0],
        color: [200, 100, 50, alpha],
    }
}

#[must_use]
pub fn opaque_splats(n: usize) -> Vec<UncompressedSplat> {
    (0..n).map(|i| splat(i, 255)).collect()
}

/// Level-0 payload with one section per entry of `sections`.
#[must_use]
pub fn level0_scene(sections: &[usize]) -> Vec<u8> {
    let mut encoder = SplatEncoder::new(CompressionLevel::Uncompressed);
    let mut next = 0;
    for &count in sections {
        let splats: Vec<_> = (next..next + count).map(|i| splat(i, 255)).collect();
        encoder.add_splats(&splats);
        next += count;
    }
    encoder.encode().expect("fixture encodes")
}

/// Level-2 scene: 100 SH-degree-0 splats (24 bytes each) followed by 50
/// SH-degree-2 splats (48 bytes each). 10944 bytes in total.
#[must_use]
pub fn two_section_scene() -> Vec<u8> {
    SplatEncoder::new(CompressionLevel::Quantized)
        .add_section(SectionHeader {
            splat_count: 100,
            max_splat_count: 100,
            sh_degree: ShDegree::Zero,
            ..SectionHeader::default()
        })
        .add_section(SectionHeader {
            splat_count: 50,
            max_splat_count: 50,
            sh_degree: ShDegree::Two,
            ..SectionHeader::default()
        })
        .encode()
        .expect("fixture encodes")
}

/// Raw `.splat` rows for `splats`.
#[must_use]
pub fn raw_rows(splats: &[UncompressedSplat]) -> Vec<u8> {
    splats.iter().flat_map(UncompressedSplat::to_raw_row).collect()
}

// ── Sans-io driving ───────────────────────────────────────────────────────────

/// Counters captured at one emitted tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickTrace {
    pub bytes_streamed: usize,
    pub percent_label: String,
    /// Loaded count of every reached section.
    pub counts: Vec<usize>,
    pub load_complete: bool,
}

impl TickTrace {
    fn capture(view: &SplatBuffer, bytes_streamed: usize, label: String, complete: bool) -> Self {
        let reached = view.reached_section_count();
        Self {
            bytes_streamed,
            percent_label: label,
            counts: view.counters().section_loaded_counts()[..reached].to_vec(),
            load_complete: complete,
        }
    }
}

/// Split `len` bytes into the given chunk sizes plus one chunk holding the
/// rest.
#[must_use]
pub fn chunk_plan(len: usize, sizes: &[usize]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut at = 0;
    for &size in sizes {
        if at >= len {
            break;
        }
        let end = (at + size).min(len);
        ranges.push((at, end));
        at = end;
    }
    if at < len {
        ranges.push((at, len));
    }
    ranges
}

/// Feed `payload` to a [`ProgressiveAssembler`] in the planned chunks,
/// ticking after every chunk until the tick goes idle, then mark the
/// download complete and tick to the end.
///
/// # Errors
///
/// Whatever the assembler reports.
pub fn assemble(
    payload: &[u8],
    chunk_sizes: &[usize],
    granularity: usize,
) -> Result<(SplatBuffer, Vec<TickTrace>), DecodeError> {
    let bytes = Bytes::copy_from_slice(payload);
    let mut assembler = ProgressiveAssembler::new(granularity);
    let mut traces = Vec::new();

    for (start, end) in chunk_plan(bytes.len(), chunk_sizes) {
        assembler.push_chunk(bytes.slice(start..end))?;
        drain_ticks(&mut assembler, &mut traces)?;
    }
    assembler.mark_download_complete()?;
    drain_ticks(&mut assembler, &mut traces)?;

    Ok((assembler.finish()?, traces))
}

fn drain_ticks(
    assembler: &mut ProgressiveAssembler,
    traces: &mut Vec<TickTrace>,
) -> Result<(), DecodeError> {
    while assembler.state() == AssemblerState::StreamingSections {
        let Tick::Emitted(report) = assembler.tick()? else {
            break;
        };
        if let Some(view) = assembler.view() {
            traces.push(TickTrace::capture(
                view,
                report.bytes_streamed,
                report.percent_label(),
                report.load_complete,
            ));
        }
    }
    Ok(())
}
