use bytes::Bytes;
use ksplat_types::BackingStore;

use crate::error::DecodeError;

/// Accumulates byte chunks in arrival order.
///
/// Until the final size is known the chunks are kept in an ordered queue.
/// [`flush_into`](Self::flush_into) then allocates the exact-size
/// [`BackingStore`] and copies every queued chunk to its cumulative offset;
/// from that point on each chunk is written straight into the store at the
/// current write offset.
///
/// ```text
///   queued:   [c0][c1][c2]            (num_bytes_loaded = |c0|+|c1|+|c2|)
///                  │ flush_into(total)
///                  ▼
///   store:    [c0 c1 c2 ............] (exactly `total` bytes)
///   append:   [c0 c1 c2 c3 ........]  (c3 written at the write offset)
/// ```
#[derive(Debug, Default)]
pub struct StreamIngestBuffer {
    queue: Vec<Bytes>,
    num_bytes_loaded: usize,
    flushed: bool,
}

impl StreamIngestBuffer {
    /// An empty buffer with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes appended so far, queued or flushed.
    #[must_use]
    pub fn num_bytes_loaded(&self) -> usize {
        self.num_bytes_loaded
    }

    /// `true` once [`flush_into`](Self::flush_into) has handed out the
    /// store. Later chunks must be appended with it.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Chunks waiting for the flush. Zero after it.
    #[must_use]
    pub fn queued_chunks(&self) -> usize {
        self.queue.len()
    }

    /// Append one chunk. Before the flush pass `None` and the chunk is
    /// queued; afterwards pass the store returned by
    /// [`flush_into`](Self::flush_into).
    ///
    /// `num_bytes_loaded` always grows by the chunk length.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TrailingData`] if the chunk runs past the end of the
    /// store. The bytes that fit are still written.
    pub fn append(
        &mut self,
        chunk: Bytes,
        store: Option<&mut BackingStore>,
    ) -> Result<(), DecodeError> {
        let offset = self.num_bytes_loaded;
        self.num_bytes_loaded += chunk.len();

        let Some(store) = store else {
            debug_assert!(!self.flushed, "append after flush needs the store");
            self.queue.push(chunk);
            return Ok(());
        };

        let capacity = store.len();
        let fits = capacity.saturating_sub(offset).min(chunk.len());
        store.write_at(offset, &chunk[..fits])?;
        if fits < chunk.len() {
            return Err(DecodeError::TrailingData {
                expected: capacity,
                extra_bytes: self.num_bytes_loaded - capacity,
            });
        }
        Ok(())
    }

    /// Assemble the first `len` queued bytes into one contiguous buffer.
    /// Returns `None` if fewer than `len` bytes have been queued.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Option<Vec<u8>> {
        if self.flushed || self.num_bytes_loaded < len {
            return None;
        }
        let mut out = Vec::with_capacity(len);
        for chunk in &self.queue {
            let take = (len - out.len()).min(chunk.len());
            out.extend_from_slice(&chunk[..take]);
            if out.len() == len {
                break;
            }
        }
        Some(out)
    }

    /// Allocate the exact-size store and copy every queued chunk into it at
    /// its cumulative offset, in arrival order. The queue is emptied.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TrailingData`] if more than `total_len` bytes have
    /// already been queued.
    pub fn flush_into(&mut self, total_len: usize) -> Result<BackingStore, DecodeError> {
        if self.num_bytes_loaded > total_len {
            return Err(DecodeError::TrailingData {
                expected: total_len,
                extra_bytes: self.num_bytes_loaded - total_len,
            });
        }

        let mut store = BackingStore::with_len(total_len);
        let mut offset = 0;
        for chunk in self.queue.drain(..) {
            store.write_at(offset, &chunk)?;
            offset += chunk.len();
        }
        self.flushed = true;
        Ok(store)
    }
}
