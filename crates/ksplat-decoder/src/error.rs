use ksplat_types::BufferError;
use ksplat_wire::WireError;

/// Errors that can occur while decoding a `.ksplat` payload, either in one
/// piece or progressively.
///
/// ```text
///   DecodeError
///   ├── Wire(WireError)      ← short record, old version, unknown level/degree
///   ├── Buffer(BufferError)  ← store/counter misuse from ksplat-types
///   ├── TrailingData         ← bytes past the size declared by the headers
///   ├── Truncated            ← input ended before the declared size
///   └── TooLarge             ← declared size above the store limit
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// More bytes arrived than the headers declare. The backing store is
    /// sized exactly and is never grown.
    #[error("unexpected data past the declared size of {expected} bytes ({extra_bytes} bytes)")]
    TrailingData { expected: usize, extra_bytes: usize },

    /// The input finished before the bytes the current stage needs.
    #[error("input ended after {received} bytes, expected {expected}")]
    Truncated { expected: usize, received: usize },

    /// The headers declare a file larger than the assembler may allocate.
    #[error("declared size of {declared} bytes exceeds the {limit}-byte store limit")]
    TooLarge { declared: usize, limit: usize },
}

impl DecodeError {
    /// `true` when the payload was rejected by the version rule.
    #[must_use]
    pub fn is_version_error(&self) -> bool {
        matches!(self, Self::Wire(e) if e.is_version_error())
    }
}
