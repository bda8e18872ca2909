/// Implementation of `ksplat validate`.
///
/// Runs a one-shot [`SplatDecoder::decode`] and reports either a series of
/// success checkmarks (`✓`) or a diagnostic failure line (`✗`).
///
/// # Success output
///
/// ```text
/// ✓ Header: valid (ksplat v0.1, level 0)
/// ✓ Sections: 2 of 2 slots used
/// ✓ Payload: 10944 bytes, exactly the declared size
/// ✓ Splats: 150 readable
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Error: ksplat version not supported: v0.0, minimum required: v0.1
/// ```
use std::fs;

use anyhow::{Context, Result, anyhow};
use ksplat_decoder::{DecodeError, SplatDecoder};

use crate::ValidateArgs;
use crate::cmd_inspect::level_label;

/// Run the `ksplat validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to decode.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let len = bytes.len();

    match SplatDecoder::decode(bytes) {
        Ok(buffer) => {
            let header = buffer.header();
            println!(
                "✓ Header: valid (ksplat v{}.{}, level {} {})",
                header.version_major,
                header.version_minor,
                header.compression_level.raw(),
                level_label(header.compression_level),
            );
            println!(
                "✓ Sections: {} of {} slots used",
                header.section_count, header.max_section_count
            );
            println!("✓ Payload: {len} bytes, exactly the declared size");
            println!("✓ Splats: {} readable", buffer.loaded_splat_count());
            Ok(())
        }
        Err(e) => {
            println!("✗ Error: {}", diagnostic(&e));
            Err(anyhow!("validation failed"))
        }
    }
}

/// ```text
/// ┌──────────────┬───────────────────────────────────────────┐
/// │ DecodeError  │ Diagnostic                                │
/// ├──────────────┼───────────────────────────────────────────┤
/// │ Truncated    │ "file truncated: {received} of {expected}"│
/// │ TrailingData │ "{extra} bytes past the declared size"    │
/// │ Wire / other │ error Display                             │
/// └──────────────┴───────────────────────────────────────────┘
/// ```
fn diagnostic(e: &DecodeError) -> String {
    match e {
        DecodeError::Truncated { expected, received } => {
            format!("file truncated: {received} of {expected} bytes present")
        }
        DecodeError::TrailingData {
            expected,
            extra_bytes,
        } => format!("{extra_bytes} bytes past the declared size of {expected}"),
        other => other.to_string(),
    }
}
