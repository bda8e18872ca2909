/// Errors raised while reading or writing the fixed `.ksplat` records.
///
/// ```text
///   WireError
///   ├── UnexpectedEof            ← not enough bytes for a fixed record
///   ├── UnsupportedVersion       ← file older than the minimum reader version
///   ├── UnknownCompressionLevel  ← header names a level outside the table
///   ├── UnknownShDegree          ← section names an SH degree outside the table
///   └── Io(std::io::Error)
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Input ended before a complete header or section header could be read.
    ///
    /// `offset` is the number of bytes that were available, `needed` the
    /// number of bytes the record requires.
    #[error("unexpected end of input at offset {offset} (needed {needed} bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// The file's version is older than the oldest version this reader accepts.
    #[error(
        "ksplat version not supported: v{major}.{minor}, minimum required: v{min_major}.{min_minor}"
    )]
    UnsupportedVersion {
        major: u8,
        minor: u8,
        min_major: u8,
        min_minor: u8,
    },

    /// The header's compression level has no entry in the descriptor table.
    #[error("unknown compression level {level}")]
    UnknownCompressionLevel { level: u16 },

    /// A section header's spherical-harmonics degree has no entry in the
    /// descriptor table.
    #[error("unknown spherical harmonics degree {degree} in section {section}")]
    UnknownShDegree { section: usize, degree: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// `true` for the version-compatibility failure, which callers treat as
    /// fatal before anything else in the header is trusted.
    #[must_use]
    pub fn is_version_error(&self) -> bool {
        matches!(self, Self::UnsupportedVersion { .. })
    }
}
