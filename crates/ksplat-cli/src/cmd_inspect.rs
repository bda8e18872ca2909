/// Implementation of `ksplat inspect`.
///
/// Decodes the file header and the section-header table only, then prints
/// one line per section slot. The payload itself is not read.
///
/// # Output format
///
/// ```text
/// Header: ksplat v0.1, level 2 (quantized), 2/2 sections, 150/150 splats
/// Scene center: (0.000, 0.000, 0.000)
/// SH range: [-1.500, 1.500]
/// Section 0: 100/100 splats, sh degree 0, 2400 bytes
/// Section 1: 50/50 splats, sh degree 2, 2400 bytes, 4 buckets (1 partial)
/// ---
/// Payload starts at 6144, expected size 10944, file size 10944
/// ```
use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result};
use ksplat_decoder::SplatDecoder;
use ksplat_wire::section::section_data_base;
use ksplat_wire::{CompressionLevel, SectionHeader, SplatHeader};
use serde::Serialize;

use crate::InspectArgs;

/// Run the `ksplat inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, its version is not
/// supported, or the header table is malformed.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let (header, sections) = SplatDecoder::decode_headers(&bytes)
        .with_context(|| format!("failed to decode headers of {}", args.file.display()))?;

    if args.json {
        let report = Report::new(&header, &sections, bytes.len());
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&header, &sections, bytes.len()));
    }
    Ok(())
}

// ── Text output ───────────────────────────────────────────────────────────────

pub(crate) fn level_label(level: CompressionLevel) -> &'static str {
    match level {
        CompressionLevel::Uncompressed => "uncompressed",
        CompressionLevel::Half => "half",
        CompressionLevel::Quantized => "quantized",
    }
}

fn render(header: &SplatHeader, sections: &[SectionHeader], file_len: usize) -> String {
    let mut out = String::new();
    let level = header.compression_level;
    let _ = writeln!(
        out,
        "Header: ksplat v{}.{}, level {} ({}), {}/{} sections, {}/{} splats",
        header.version_major,
        header.version_minor,
        level.raw(),
        level_label(level),
        header.section_count,
        header.max_section_count,
        header.splat_count,
        header.max_splat_count,
    );
    let [x, y, z] = header.scene_center;
    let _ = writeln!(out, "Scene center: ({x:.3}, {y:.3}, {z:.3})");
    let (min, max) = header.sh_coeff_range();
    let _ = writeln!(out, "SH range: [{min:.3}, {max:.3}]");

    for (idx, section) in sections.iter().enumerate() {
        let _ = write!(
            out,
            "Section {idx}: {}/{} splats, sh degree {}, {} bytes",
            section.splat_count,
            section.max_splat_count,
            section.sh_degree.raw(),
            section.storage_size_bytes,
        );
        if level.is_bucketed() && section.bucket_count > 0 {
            let _ = write!(
                out,
                ", {} buckets ({} partial)",
                section.bucket_count, section.partially_filled_bucket_count
            );
        }
        out.push('\n');
    }

    let base = section_data_base(header.max_section_count);
    let expected = base + sections.iter().map(|s| s.storage_size_bytes).sum::<usize>();
    out.push_str("---\n");
    let _ = writeln!(
        out,
        "Payload starts at {base}, expected size {expected}, file size {file_len}"
    );
    out
}

// ── JSON output ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report {
    version: String,
    compression_level: u16,
    section_count: u32,
    max_section_count: u32,
    splat_count: u32,
    max_splat_count: u32,
    scene_center: [f32; 3],
    sh_coeff_range: [f32; 2],
    expected_size: usize,
    file_size: usize,
    sections: Vec<SectionReport>,
}

#[derive(Serialize)]
struct SectionReport {
    splat_count: u32,
    max_splat_count: u32,
    sh_degree: u16,
    storage_size_bytes: usize,
    bucket_count: u32,
    partially_filled_bucket_count: u32,
}

impl Report {
    fn new(header: &SplatHeader, sections: &[SectionHeader], file_size: usize) -> Self {
        let (min, max) = header.sh_coeff_range();
        let expected_size = section_data_base(header.max_section_count)
            + sections.iter().map(|s| s.storage_size_bytes).sum::<usize>();
        Self {
            version: format!("{}.{}", header.version_major, header.version_minor),
            compression_level: header.compression_level.raw(),
            section_count: header.section_count,
            max_section_count: header.max_section_count,
            splat_count: header.splat_count,
            max_splat_count: header.max_splat_count,
            scene_center: header.scene_center,
            sh_coeff_range: [min, max],
            expected_size,
            file_size,
            sections: sections
                .iter()
                .map(|s| SectionReport {
                    splat_count: s.splat_count,
                    max_splat_count: s.max_splat_count,
                    sh_degree: s.sh_degree.raw(),
                    storage_size_bytes: s.storage_size_bytes,
                    bucket_count: s.bucket_count,
                    partially_filled_bucket_count: s.partially_filled_bucket_count,
                })
                .collect(),
        }
    }
}
