use bytes::Bytes;
use ksplat_decoder::{ProgressiveAssembler, SplatDecoder, Tick};
use ksplat_types::SplatBuffer;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::LoaderConfig;
use crate::error::{LoadError, TransportError};
use crate::progress::{LoadObserver, LoaderStatus, ProgressUpdate};
use crate::scheduler::{IntervalScheduler, TickFuture, TickScheduler};
use crate::transport::{ChunkSink, Transport, TransportEvent};

/// Loads `.ksplat` payloads, progressively or in one shot.
///
/// A progressive load runs the transport and the assembler on the current
/// task. Chunks are fed to a [`ProgressiveAssembler`] as they arrive;
/// throttled ticks from the [`TickScheduler`] advance the loaded counters,
/// and every emitting tick is reported to the observer:
///
/// ```text
///   transport ──chunks──▶ assembler ◀──ticks── scheduler
///                             │
///                             ▼
///              observer.on_section_built(view, complete)
///              observer.on_progress(percent, label, status)
/// ```
///
/// A progressive load reports progress only from ticks, as the streamed
/// share of the file, so the percentages never go down. The transport's
/// own download percentage is reported by one-shot loads.
///
/// Cancellation is checked before every chunk and every tick.
pub struct KsplatLoader {
    config: LoaderConfig,
    scheduler: Box<dyn TickScheduler>,
}

impl KsplatLoader {
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            scheduler: Box::new(IntervalScheduler),
        }
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: impl TickScheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
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
    /// - [`LoadError::Decode`] for a rejected version, a malformed header,
    ///   trailing bytes or a truncated download.
    /// - [`LoadError::Transport`] if the transport fails.
    /// - [`LoadError::Canceled`] if `cancel` fires first.
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
        info!(source, stream = self.config.stream, "loading ksplat");
        if self.config.stream {
            self.load_progressive(source, transport, observer, cancel).await
        } else {
            self.load_whole(source, transport, observer, cancel).await
        }
    }

    async fn load_progressive<T, O>(
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
        let (sink, mut events) = ChunkSink::channel();
        join_fetch(
            transport.fetch(source, sink, false),
            self.drive(&mut events, observer, cancel),
        )
        .await
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
        let mut assembler = ProgressiveAssembler::new(self.config.granularity_bytes)
            .with_max_store_bytes(self.config.max_store_bytes);
        let mut transport_open = true;
        let mut tick: Option<TickFuture> = None;

        loop {
            if tick.is_none() && assembler.is_streaming() {
                tick = Some(self.scheduler.schedule(self.config.tick_delay));
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => return Err(LoadError::Canceled),

                event = events.recv(), if transport_open => match event {
                    Some(TransportEvent::Chunk { bytes, .. }) => {
                        if cancel.is_cancelled() {
                            return Err(LoadError::Canceled);
                        }
                        assembler.push_chunk(bytes)?;
                    }
                    Some(TransportEvent::Complete) | None => {
                        transport_open = false;
                        debug!(bytes = assembler.num_bytes_loaded(), "download complete");
                        assembler.mark_download_complete()?;
                    }
                },

                () = wait_tick(&mut tick), if tick.is_some() => {
                    tick = None;
                    if cancel.is_cancelled() {
                        return Err(LoadError::Canceled);
                    }
                    if let Tick::Emitted(report) = assembler.tick()? {
                        if let Some(view) = assembler.view() {
                            observer.on_section_built(view, report.load_complete);
                        }
                        if report.load_complete {
                            observer.on_progress(&ProgressUpdate::new(100.0, LoaderStatus::Done));
                            return finished(assembler);
                        }
                        observer.on_progress(&ProgressUpdate::new(report.percent, LoaderStatus::Downloading));
                    }
                }
            }
        }
    }

    async fn load_whole<T, O>(
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
        let full = fetch_whole(source, transport, observer, cancel).await?;
        observer.on_progress(&ProgressUpdate::new(100.0, LoaderStatus::Processing));
        let buffer = SplatDecoder::decode(full.to_vec())?;
        observer.on_section_built(&buffer, true);
        observer.on_progress(&ProgressUpdate::new(100.0, LoaderStatus::Done));
        info!(splats = buffer.loaded_splat_count(), "ksplat loaded");
        Ok(buffer)
    }
}

/// Run a transport fetch alongside the future consuming its chunks.
///
/// A failed fetch ends the load at once; a successful one leaves `drive`
/// to drain the remaining events.
pub(crate) async fn join_fetch<F, D>(fetch: F, drive: D) -> Result<SplatBuffer, LoadError>
where
    F: Future<Output = Result<Option<Bytes>, TransportError>>,
    D: Future<Output = Result<SplatBuffer, LoadError>>,
{
    tokio::pin!(fetch);
    tokio::pin!(drive);
    let mut fetching = true;
    loop {
        tokio::select! {
            res = &mut fetch, if fetching => {
                fetching = false;
                res?;
            }
            res = &mut drive => return res,
        }
    }
}

/// Fetch the whole payload while forwarding download progress.
pub(crate) async fn fetch_whole<T, O>(
    source: &str,
    transport: &mut T,
    observer: &mut O,
    cancel: &CancelToken,
) -> Result<Bytes, LoadError>
where
    T: Transport,
    O: LoadObserver + ?Sized,
{
    let (sink, mut events) = ChunkSink::channel();
    let fetch = transport.fetch(source, sink, true);
    tokio::pin!(fetch);

    let full = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LoadError::Canceled),
            Some(event) = events.recv() => {
                if let TransportEvent::Chunk { percent, .. } = event {
                    observer.on_progress(&ProgressUpdate::new(percent, LoaderStatus::Downloading));
                }
            }
            res = &mut fetch => break res?,
        }
    };
    full.ok_or_else(|| {
        TransportError::MissingBuffer {
            source_name: source.to_string(),
        }
        .into()
    })
}

async fn wait_tick(tick: &mut Option<TickFuture>) {
    match tick {
        Some(tick) => tick.await,
        None => std::future::pending().await,
    }
}

fn finished(assembler: ProgressiveAssembler) -> Result<SplatBuffer, LoadError> {
    let buffer = assembler.finish()?;
    info!(
        sections = buffer.reached_section_count(),
        splats = buffer.loaded_splat_count(),
        "ksplat loaded"
    );
    Ok(buffer)
}
