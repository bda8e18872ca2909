use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

/// A pending tick. Resolves when the next throttled step may run.
pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Source of tick timing for the progressive loader.
///
/// ```text
///   IntervalScheduler   tokio sleep of the configured delay
///   ManualScheduler     one tick per permit handed out with advance()
/// ```
pub trait TickScheduler: Send + Sync {
    fn schedule(&self, delay: Duration) -> TickFuture;
}

/// Wall-clock scheduling with `tokio::time::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntervalScheduler;

impl TickScheduler for IntervalScheduler {
    fn schedule(&self, delay: Duration) -> TickFuture {
        Box::pin(tokio::time::sleep(delay))
    }
}

/// Ticks fire only when released by [`advance`](Self::advance). The delay
/// is ignored.
#[derive(Clone, Debug)]
pub struct ManualScheduler {
    permits: Arc<Semaphore>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `ticks` more ticks fire.
    pub fn advance(&self, ticks: usize) {
        self.permits.add_permits(ticks);
    }

    /// Ticks released but not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.permits.available_permits()
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&self, _delay: Duration) -> TickFuture {
        let permits = Arc::clone(&self.permits);
        Box::pin(async move {
            if let Ok(permit) = permits.acquire_owned().await {
                permit.forget();
            }
        })
    }
}
