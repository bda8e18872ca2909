#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use ksplat_decoder::{AssemblerState, ProgressiveAssembler, SplatDecoder, Tick};
use ksplat_encoder::SplatEncoder;
use ksplat_wire::{CompressionLevel, SectionHeader, ShDegree};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    level: u8,
    sections: Vec<(u8, u8, u8)>,
    reserved: u8,
    cuts: Vec<u16>,
    granularity: u16,
}

// Fuzz target: progressive assembly of a valid payload, cut at arbitrary
// points, ends in the same buffer and counters as a one-shot decode, and
// no counter ever decreases along the way.
fuzz_target!(|input: Input| {
    if input.sections.is_empty() || input.sections.len() > 16 {
        return;
    }
    let level = CompressionLevel::from_raw(u16::from(input.level % 3)).unwrap();
    let mut encoder = SplatEncoder::new(level);
    for &(count, degree, buckets) in &input.sections {
        let bucketed = level.is_bucketed();
        encoder.add_section(SectionHeader {
            splat_count: u32::from(count),
            max_splat_count: u32::from(count),
            sh_degree: ShDegree::from_raw(u16::from(degree % 3)).unwrap(),
            bucket_count: if bucketed { u32::from(buckets % 8) } else { 0 },
            bucket_storage_size_bytes: if bucketed { 12 } else { 0 },
            partially_filled_bucket_count: if bucketed { u32::from(buckets % 2) } else { 0 },
            ..SectionHeader::default()
        });
    }
    let reserve = input.sections.len() as u32 + u32::from(input.reserved % 4);
    encoder.reserve_sections(reserve);
    let payload = encoder.encode().unwrap();
    let expected = SplatDecoder::decode(payload.clone()).unwrap();

    let bytes = Bytes::from(payload);
    let mut assembler = ProgressiveAssembler::new(usize::from(input.granularity));
    let mut last_loaded = 0;
    let mut tick_all = |assembler: &mut ProgressiveAssembler| {
        while assembler.state() == AssemblerState::StreamingSections {
            match assembler.tick().unwrap() {
                Tick::Idle => break,
                Tick::Emitted(_) => {
                    let loaded = assembler.view().unwrap().loaded_splat_count();
                    assert!(loaded >= last_loaded);
                    last_loaded = loaded;
                }
            }
        }
    };

    let mut at = 0;
    for cut in input.cuts.iter().map(|&c| usize::from(c) + 1) {
        if at >= bytes.len() {
            break;
        }
        let end = (at + cut).min(bytes.len());
        assembler.push_chunk(bytes.slice(at..end)).unwrap();
        tick_all(&mut assembler);
        at = end;
    }
    if at < bytes.len() {
        assembler.push_chunk(bytes.slice(at..)).unwrap();
    }
    assembler.mark_download_complete().unwrap();
    tick_all(&mut assembler);

    let buffer = assembler.finish().unwrap();
    assert_eq!(buffer.as_bytes(), expected.as_bytes());
    assert_eq!(buffer.counters(), expected.counters());
});
