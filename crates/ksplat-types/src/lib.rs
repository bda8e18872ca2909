#![warn(clippy::pedantic)]

pub mod buffer;
pub mod error;
pub mod splat;

pub use buffer::{BackingStore, LoadCounters, SectionLayout, SplatBuffer, SplatBufferWriter};
pub use error::BufferError;
pub use splat::{RAW_ROW_SIZE, UncompressedSplat};
