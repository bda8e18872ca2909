#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use ksplat_decoder::{RawSplatAssembler, parse_raw_splats};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    rows: Vec<u8>,
    cuts: Vec<u8>,
    granularity: u8,
}

// Fuzz target: streamed raw rows agree with a whole-buffer parse.
fuzz_target!(|input: Input| {
    let whole = parse_raw_splats(&input.rows);
    let Ok(mut assembler) = RawSplatAssembler::new(input.rows.len(), usize::from(input.granularity))
    else {
        return;
    };

    let mut at = 0;
    for cut in input.cuts.iter().map(|&c| usize::from(c) + 1) {
        if at >= input.rows.len() {
            break;
        }
        let end = (at + cut).min(input.rows.len());
        let tick = assembler
            .push_chunk(&Bytes::copy_from_slice(&input.rows[at..end]))
            .unwrap();
        if let Some(tick) = tick {
            assert_eq!(tick.splat_count, tick.bytes_loaded / 32);
        }
        at = end;
    }
    if at < input.rows.len() {
        assembler
            .push_chunk(&Bytes::copy_from_slice(&input.rows[at..]))
            .unwrap();
    }

    match (assembler.finish(), whole) {
        (Ok((_, streamed)), Ok(parsed)) => assert_eq!(streamed.len(), parsed.len()),
        (Err(_), Err(_)) => {}
        (streamed, parsed) => panic!("streamed {:?} vs parsed {:?}", streamed.is_ok(), parsed.is_ok()),
    }
});
