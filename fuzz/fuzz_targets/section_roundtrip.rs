#![no_main]

use arbitrary::Arbitrary;
use ksplat_wire::{CompressionLevel, SectionHeader, ShDegree, SECTION_HEADER_SIZE};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    level: u8,
    degree: u8,
    splat_count: u32,
    max_splat_count: u32,
    bucket_size: u32,
    bucket_count: u32,
    bucket_block_size: f32,
    bucket_storage_size_bytes: u16,
    compression_scale_range: u32,
    full_bucket_count: u32,
    partially_filled_bucket_count: u32,
}

// Fuzz target: SectionHeader write->read roundtrip at every level.
//
// Bucket fields only survive at the bucketed levels, and a zero scale
// range reads back as the level default.
fuzz_target!(|input: Input| {
    let level = CompressionLevel::from_raw(u16::from(input.level % 3)).unwrap();
    let sh_degree = ShDegree::from_raw(u16::from(input.degree % 3)).unwrap();
    let section = SectionHeader {
        splat_count: input.splat_count,
        max_splat_count: input.max_splat_count,
        bucket_size: input.bucket_size,
        bucket_count: input.bucket_count,
        bucket_block_size: input.bucket_block_size,
        bucket_storage_size_bytes: input.bucket_storage_size_bytes,
        compression_scale_range: input.compression_scale_range,
        storage_size_bytes: 0,
        full_bucket_count: input.full_bucket_count,
        partially_filled_bucket_count: input.partially_filled_bucket_count,
        sh_degree,
    };

    let mut buf = [0u8; SECTION_HEADER_SIZE];
    section.write_to(level, &mut buf, 0).unwrap();
    let parsed = SectionHeader::read_from(level, 0, &buf).unwrap();

    assert_eq!(parsed.splat_count, section.splat_count);
    assert_eq!(parsed.max_splat_count, section.max_splat_count);
    assert_eq!(parsed.sh_degree, section.sh_degree);
    if level.is_bucketed() {
        assert_eq!(parsed.bucket_count, section.bucket_count);
        assert_eq!(parsed.partially_filled_bucket_count, section.partially_filled_bucket_count);
        assert_eq!(parsed.bucket_block_size.to_bits(), section.bucket_block_size.to_bits());
        if section.compression_scale_range != 0 {
            assert_eq!(parsed.compression_scale_range, section.compression_scale_range);
        }
    } else {
        assert_eq!(parsed.bucket_count, 0);
        assert_eq!(parsed.bucket_prefix_bytes(), 0);
    }
    assert_eq!(parsed.storage_size_bytes, parsed.computed_storage_size(level));
});
