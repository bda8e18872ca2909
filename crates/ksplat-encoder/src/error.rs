use ksplat_wire::{CompressionLevel, WireError};

/// Errors that can occur while building a `.ksplat` payload.
///
/// ```text
///   EncodeError
///   ├── EmptyPayload              ← no sections were added before .encode()
///   ├── UncompressedRequiresLevel ← add_splats on a compressed encoder
///   ├── PayloadSizeMismatch       ← explicit payload disagrees with its header
///   ├── TooManySections           ← more sections than reserved
///   ├── CountOverflow             ← a count does not fit its u32 field
///   └── Wire(WireError)           ← from ksplat-wire serialization
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("no sections have been added to the encoder")]
    EmptyPayload,

    #[error("uncompressed splats can only be written at level 0, encoder is at {level:?}")]
    UncompressedRequiresLevel { level: CompressionLevel },

    #[error("section {section} payload is {actual} bytes, its header declares {expected}")]
    PayloadSizeMismatch {
        section: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{sections} sections added but only {max} reserved")]
    TooManySections { sections: usize, max: u32 },

    #[error("{what} count {count} does not fit in a u32")]
    CountOverflow { what: &'static str, count: usize },

    #[error(transparent)]
    Wire(#[from] WireError),
}
