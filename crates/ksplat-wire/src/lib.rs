#![warn(clippy::pedantic)]

pub mod compression;
pub mod error;
pub mod header;
pub mod le;
pub mod section;

pub use compression::{CompressionLevel, ShDegree, bytes_per_splat};
pub use error::WireError;
pub use header::{HEADER_SIZE, SplatHeader};
pub use section::{SECTION_HEADER_SIZE, SectionHeader, parse_section_headers};
