use ksplat_decoder::{RawSplatAssembler, SplatDecoder, parse_raw_splats};
use ksplat_encoder::SplatEncoder;
use ksplat_types::{SplatBuffer, UncompressedSplat};
use ksplat_wire::CompressionLevel;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::ksplat_loader::{fetch_whole, join_fetch};
use crate::optimizer::SplatOptimizer;
use crate::progress::{LoadObserver, LoaderStatus, ProgressUpdate};
use crate::transport::{ChunkSink, Transport, TransportEvent};

/// Loads raw `.splat` row files.
///
/// Streaming converts whole rows into a single level-0 section as they
/// arrive, which needs the transport's size hint to size the store. Without
/// a hint, or with streaming off, the rows are parsed once the download is
/// done.
///
/// ```text
///   stream + hint   → RawSplatAssembler, one view per granularity
///                     └─ finish → optimizer (if configured) → Done
///   otherwise       → parse rows → optimizer, or level-0 encode → Done
/// ```
pub struct SplatLoader {
    config: LoaderConfig,
    optimizer: Option<Box<dyn SplatOptimizer>>,
}

impl SplatLoader {
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            optimizer: None,
        }
    }

    #[must_use]
    pub fn with_optimizer(mut self, optimizer: impl SplatOptimizer + 'static) -> Self {
        self.optimizer = Some(Box::new(optimizer));
        self
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load `source` through `transport`.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Decode`] for a partial final row or more rows than
    ///   the size hint announced.
    /// - [`LoadError::Transport`] if the transport fails.
    /// - [`LoadError::Canceled`] if `cancel` fires first.
    /// - [`LoadError::Optimize`] / [`LoadError::Encode`] if building the
    ///   final buffer fails.
    pub async fn load<T, O>(
        &self,
        source: &str,
        transport: &mut T,
        observer: &mut O,
        cancel: &CancelToken,
    ) -> Result<SplatBuffer, LoadError>
    where
        T: Transport,
        O: LoadObserver + ?Sized,
    {
        info!(source, stream = self.config.stream, "loading splat");
        let buffer = if self.config.stream {
            let (sink, mut events) = ChunkSink::channel();
            join_fetch(
                transport.fetch(source, sink, false),
                self.drive(&mut events, observer, cancel),
            )
            .await?
        } else {
            let full = fetch_whole(source, transport, observer, cancel).await?;
            observer.on_progress(&ProgressUpdate::new(100.0, LoaderStatus::Processing));
            self.build(parse_raw_splats(&full)?)?
        };

        observer.on_section_built(&buffer, true);
        observer.on_progress(&ProgressUpdate::new(100.0, LoaderStatus::Done));
        info!(splats = buffer.loaded_splat_count(), "splat loaded");
        Ok(buffer)
    }

    async fn drive<O>(
        &self,
        events: &mut UnboundedReceiver<TransportEvent>,
        observer: &mut O,
        cancel: &CancelToken,
    ) -> Result<SplatBuffer, LoadError>
    where
        O: LoadObserver + ?Sized,
    {
        let mut assembler: Option<RawSplatAssembler> = None;
        let mut buffered: Vec<u8> = Vec::new();
        let mut first_chunk = true;

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => return Err(LoadError::Canceled),

                event = events.recv() => match event {
                    Some(TransportEvent::Chunk { percent, bytes, total_size_hint }) => {
                        if cancel.is_cancelled() {
                            return Err(LoadError::Canceled);
                        }
                        if first_chunk {
                            first_chunk = false;
                            match total_size_hint {
                                Some(hint) => {
                                    assembler = Some(RawSplatAssembler::new(
                                        hint,
                                        self.config.granularity_bytes,
                                    )?);
                                }
                                None => debug!("no size hint, buffering the whole download"),
                            }
                        }
                        match assembler.as_mut() {
                            Some(asm) => {
                                if asm.push_chunk(&bytes)?.is_some() {
                                    if let Some(view) = asm.view() {
                                        observer.on_section_built(view, false);
                                    }
                                }
                            }
                            None => buffered.extend_from_slice(&bytes),
                        }
                        observer.on_progress(&ProgressUpdate::new(percent, LoaderStatus::Downloading));
                    }
                    Some(TransportEvent::Complete) | None => break,
                },
            }
        }

        match assembler {
            Some(asm) => {
                let (streamed, splats) = asm.finish()?;
                match (&self.optimizer, &self.config.optimize) {
                    (Some(optimizer), Some(options)) => {
                        debug!(splats = splats.len(), "optimizing streamed splats");
                        Ok(optimizer.optimize(splats, options)?)
                    }
                    _ => Ok(streamed),
                }
            }
            None => self.build(parse_raw_splats(&buffered)?),
        }
    }

    /// Final buffer for a list of rows that was never streamed.
    fn build(&self, splats: Vec<UncompressedSplat>) -> Result<SplatBuffer, LoadError> {
        if let Some(optimizer) = &self.optimizer {
            let options = self.config.optimize.clone().unwrap_or_default();
            debug!(splats = splats.len(), "optimizing splats");
            return Ok(optimizer.optimize(splats, &options)?);
        }

        let payload = SplatEncoder::new(CompressionLevel::Uncompressed)
            .minimum_alpha(self.config.minimum_alpha())
            .add_splats(&splats)
            .encode()?;
        Ok(SplatDecoder::decode(payload)?)
    }
}
