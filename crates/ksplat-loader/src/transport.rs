use std::future::Future;
use std::path::Path;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// One message from a transport to the loader.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Chunk {
        /// Download progress as reported by the transport.
        percent: f64,
        bytes: Bytes,
        /// Total size of the source, when the transport knows it.
        total_size_hint: Option<usize>,
    },
    /// No more chunks will follow.
    Complete,
}

/// Sending half handed to [`Transport::fetch`].
#[derive(Clone, Debug)]
pub struct ChunkSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ChunkSink {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// # Errors
    ///
    /// [`TransportError::Closed`] once the loader has stopped listening.
    pub fn chunk(
        &self,
        percent: f64,
        bytes: Bytes,
        total_size_hint: Option<usize>,
    ) -> Result<(), TransportError> {
        self.tx
            .send(TransportEvent::Chunk {
                percent,
                bytes,
                total_size_hint,
            })
            .map_err(|_| TransportError::Closed)
    }

    /// # Errors
    ///
    /// [`TransportError::Closed`] once the loader has stopped listening.
    pub fn complete(&self) -> Result<(), TransportError> {
        self.tx
            .send(TransportEvent::Complete)
            .map_err(|_| TransportError::Closed)
    }
}

/// A byte source the loaders pull from.
///
/// `fetch` pushes every chunk into `sink` in order, signals completion,
/// and returns the whole payload when `want_full_buffer` is set. Dropping
/// the sink also counts as completion.
pub trait Transport: Send {
    fn fetch(
        &mut self,
        source: &str,
        sink: ChunkSink,
        want_full_buffer: bool,
    ) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;
}

#[allow(clippy::cast_precision_loss)]
fn percent_of(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

/// Serves an in-memory payload split according to a chunk plan.
///
/// The source name is ignored. Between chunks the transport yields to the
/// runtime so a loader on the same task can interleave its ticks.
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    payload: Bytes,
    chunk_sizes: Vec<usize>,
    report_size: bool,
}

impl MemoryTransport {
    /// Deliver the whole payload as one chunk.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            chunk_sizes: Vec::new(),
            report_size: true,
        }
    }

    /// Split into fixed-size chunks; the last one may be shorter.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        let size = size.max(1);
        let len = self.payload.len();
        self.chunk_sizes = (0..len).step_by(size).map(|at| size.min(len - at)).collect();
        self
    }

    /// Split into the given sizes, followed by one chunk holding the rest.
    #[must_use]
    pub fn with_chunk_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.chunk_sizes = sizes;
        self
    }

    /// Send chunks without a total size hint.
    #[must_use]
    pub fn without_size_hint(mut self) -> Self {
        self.report_size = false;
        self
    }

    fn plan(&self) -> Vec<(usize, usize)> {
        let len = self.payload.len();
        let mut ranges = Vec::with_capacity(self.chunk_sizes.len() + 1);
        let mut at = 0;
        for &size in &self.chunk_sizes {
            if at >= len {
                break;
            }
            let end = (at + size).min(len);
            ranges.push((at, end));
            at = end;
        }
        if at < len {
            ranges.push((at, len));
        }
        ranges
    }
}

impl Transport for MemoryTransport {
    async fn fetch(
        &mut self,
        _source: &str,
        sink: ChunkSink,
        want_full_buffer: bool,
    ) -> Result<Option<Bytes>, TransportError> {
        let len = self.payload.len();
        let hint = self.report_size.then_some(len);
        for (start, end) in self.plan() {
            sink.chunk(percent_of(end, len), self.payload.slice(start..end), hint)?;
            tokio::task::yield_now().await;
        }
        sink.complete()?;
        Ok(want_full_buffer.then(|| self.payload.clone()))
    }
}

/// Reads a file from disk in fixed-size chunks. The source is the path.
#[derive(Clone, Copy, Debug)]
pub struct FileTransport {
    chunk_size: usize,
}

impl Default for FileTransport {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}

impl FileTransport {
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Transport for FileTransport {
    async fn fetch(
        &mut self,
        source: &str,
        sink: ChunkSink,
        want_full_buffer: bool,
    ) -> Result<Option<Bytes>, TransportError> {
        let mut file = tokio::fs::File::open(Path::new(source)).await?;
        let len = usize::try_from(file.metadata().await?.len()).ok();

        let mut full = want_full_buffer.then(|| Vec::with_capacity(len.unwrap_or(0)));
        let mut buf = vec![0u8; self.chunk_size];
        let mut read_total = 0;
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            read_total += n;
            let percent = len.map_or(0.0, |total| percent_of(read_total, total));
            sink.chunk(percent, Bytes::copy_from_slice(&buf[..n]), len)?;
            if let Some(full) = full.as_mut() {
                full.extend_from_slice(&buf[..n]);
            }
        }
        sink.complete()?;
        Ok(full.map(Bytes::from))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    async fn collect(
        transport: &mut impl Transport,
        source: &str,
    ) -> (Vec<TransportEvent>, Option<Bytes>) {
        let (sink, mut rx) = ChunkSink::channel();
        let full = transport.fetch(source, sink, true).await.unwrap();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (events, full)
    }

    #[tokio::test]
    async fn memory_plan_adds_remainder_chunk() {
        let mut transport = MemoryTransport::new(vec![7u8; 10]).with_chunk_sizes(vec![4, 4]);
        let (events, full) = collect(&mut transport, "mem").await;
        let sizes: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Chunk { bytes, .. } => Some(bytes.len()),
                TransportEvent::Complete => None,
            })
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(events.last(), Some(&TransportEvent::Complete));
        assert_eq!(full.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn memory_without_hint() {
        let mut transport = MemoryTransport::new(vec![1u8; 5])
            .with_chunk_size(2)
            .without_size_hint();
        let (events, _) = collect(&mut transport, "mem").await;
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[2],
            TransportEvent::Chunk { total_size_hint: None, percent, .. } if (*percent - 100.0).abs() < f64::EPSILON
        ));
    }

    #[tokio::test]
    async fn file_reads_in_chunks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[3u8; 25]).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let mut transport = FileTransport::new(10);
        let (events, full) = collect(&mut transport, &path).await;
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[0],
            TransportEvent::Chunk { total_size_hint: Some(25), .. }
        ));
        assert_eq!(full.unwrap().as_ref(), &[3u8; 25]);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let (sink, _rx) = ChunkSink::channel();
        let result = FileTransport::default()
            .fetch("/definitely/not/here.ksplat", sink, false)
            .await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
