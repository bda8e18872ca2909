use ksplat_decoder::DecodeError;
use ksplat_encoder::EncodeError;

/// Failures reported by a [`Transport`](crate::Transport).
///
/// ```text
/// ┌───────────────┬──────────────────────────────────────────────┐
/// │ Variant       │ Cause                                        │
/// ├───────────────┼──────────────────────────────────────────────┤
/// │ Io            │ Reading the source failed                    │
/// │ Closed        │ The loader stopped listening for chunks      │
/// │ MissingBuffer │ Full buffer requested but none was returned  │
/// └───────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk receiver closed")]
    Closed,

    #[error("transport returned no buffer for a one-shot load of {source_name}")]
    MissingBuffer { source_name: String },
}

/// Failure of an optimization pass.
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("optimizer cannot produce compression level {level}")]
    UnsupportedLevel { level: u16 },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors that end a load.
///
/// ```text
///   LoadError
///   ├── Decode(DecodeError)       ← version, malformed or truncated payload
///   ├── Transport(TransportError) ← the byte source failed
///   ├── Canceled                  ← the CancelToken fired
///   ├── Optimize(OptimizeError)   ← the optimization pass failed
///   └── Encode(EncodeError)       ← building the fallback level-0 buffer
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("load canceled")]
    Canceled,

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl LoadError {
    #[must_use]
    pub fn is_version_error(&self) -> bool {
        matches!(self, Self::Decode(e) if e.is_version_error())
    }
}
