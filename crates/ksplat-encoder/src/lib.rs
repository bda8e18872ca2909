#![warn(clippy::pedantic)]

pub mod encoder;
pub mod error;

pub use encoder::SplatEncoder;
pub use error::EncodeError;
