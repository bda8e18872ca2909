#![warn(clippy::pedantic)]

pub mod assembler;
pub mod decoder;
pub mod error;
pub mod ingest;
pub mod raw;

pub use assembler::{
    AssemblerState, DEFAULT_MAX_STORE_BYTES, DEFAULT_STREAMING_GRANULARITY, ProgressiveAssembler, Tick, TickReport,
    account_loaded_splats,
};
pub use decoder::SplatDecoder;
pub use error::DecodeError;
pub use ingest::StreamIngestBuffer;
pub use raw::{RawSplatAssembler, RawTick, parse_raw_splats};
