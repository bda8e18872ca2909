/// Implementation of `ksplat convert`.
///
/// Reads raw `.splat` rows, drops rows below `--min-alpha`, and writes a
/// level-0 `.ksplat` file with one section per `--section-size` splats.
use std::fs;

use anyhow::{Context, Result};
use ksplat_decoder::parse_raw_splats;
use ksplat_encoder::SplatEncoder;
use ksplat_types::UncompressedSplat;
use ksplat_wire::CompressionLevel;
use tracing::debug;

use crate::ConvertArgs;

/// Run the `ksplat convert` command.
///
/// # Errors
///
/// Returns an error if the input cannot be read, ends in a partial row,
/// or the output cannot be written.
pub fn run(args: &ConvertArgs) -> Result<()> {
    let raw =
        fs::read(&args.input).with_context(|| format!("cannot read {}", args.input.display()))?;
    let splats = parse_raw_splats(&raw)
        .with_context(|| format!("{} is not a raw splat file", args.input.display()))?;

    let kept = splats.iter().filter(|s| s.alpha() >= args.min_alpha).count();
    let payload = encode(&splats, args.min_alpha, args.section_size)?;
    debug!(rows = splats.len(), kept, bytes = payload.len(), "encoded");

    fs::write(&args.output, &payload)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!(
        "converted {kept} splats ({} dropped) into {} ({} bytes)",
        splats.len() - kept,
        args.output.display(),
        payload.len()
    );
    Ok(())
}

fn encode(splats: &[UncompressedSplat], min_alpha: u8, section_size: usize) -> Result<Vec<u8>> {
    let kept: Vec<UncompressedSplat> = splats
        .iter()
        .filter(|s| s.alpha() >= min_alpha)
        .cloned()
        .collect();

    let mut encoder = SplatEncoder::new(CompressionLevel::Uncompressed);
    if kept.is_empty() {
        encoder.add_splats(&[]);
    }
    let per_section = if section_size == 0 { kept.len().max(1) } else { section_size };
    for section in kept.chunks(per_section) {
        encoder.add_splats(section);
    }
    encoder.encode().context("failed to encode splats")
}

#[cfg(test)]
mod tests {
    use ksplat_decoder::SplatDecoder;

    use super::*;

    fn splat(alpha: u8) -> UncompressedSplat {
        UncompressedSplat {
            color: [255, 255, 255, alpha],
            scale: [1.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
            ..UncompressedSplat::default()
        }
    }

    #[test]
    fn sections_and_alpha_filter() {
        let splats: Vec<_> = [0, 10, 20, 30, 0, 50].into_iter().map(splat).collect();
        let buffer = SplatDecoder::decode(encode(&splats, 1, 3).unwrap()).unwrap();
        assert_eq!(buffer.section_headers().len(), 2);
        assert_eq!(buffer.section_loaded_count(0), 3);
        assert_eq!(buffer.section_loaded_count(1), 1);
    }

    #[test]
    fn all_dropped_still_encodes() {
        let buffer = SplatDecoder::decode(encode(&[splat(0)], 1, 0).unwrap()).unwrap();
        assert_eq!(buffer.loaded_splat_count(), 0);
        assert_eq!(buffer.section_headers().len(), 1);
    }
}
