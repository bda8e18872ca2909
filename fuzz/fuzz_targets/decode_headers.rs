#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: header and section-table decoding on arbitrary bytes.
//
// Catches bugs in:
// - Version checking on the raw bytes
// - Unknown compression levels and SH degrees
// - Section-table bounds (huge max_section_count)
fuzz_target!(|data: &[u8]| {
    let _ = ksplat_decoder::SplatDecoder::decode_headers(data);
});
