#![warn(clippy::pedantic)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod ksplat_loader;
pub mod optimizer;
pub mod progress;
pub mod scheduler;
pub mod splat_loader;
pub mod transport;

pub use cancel::CancelToken;
pub use config::{LoaderConfig, OptimizeOptions};
pub use error::{LoadError, OptimizeError, TransportError};
pub use ksplat_loader::KsplatLoader;
pub use optimizer::{BaselineOptimizer, SplatOptimizer};
pub use progress::{LoadEvent, LoadObserver, LoadSnapshot, LoaderStatus, ProgressChannel, ProgressUpdate};
pub use scheduler::{IntervalScheduler, ManualScheduler, TickFuture, TickScheduler};
pub use splat_loader::SplatLoader;
pub use transport::{ChunkSink, FileTransport, MemoryTransport, Transport, TransportEvent};
