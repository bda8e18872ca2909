#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: one-shot decode.
//
// The declared size is checked against the input before the store is
// built, so arbitrary headers cannot force a large allocation here.
fuzz_target!(|data: &[u8]| {
    if let Ok(buffer) = ksplat_decoder::SplatDecoder::decode(data.to_vec()) {
        assert_eq!(buffer.as_bytes().len(), data.len());
        assert_eq!(
            buffer.loaded_splat_count(),
            buffer.counters().section_loaded_counts().iter().sum::<usize>()
        );
    }
});
