use ksplat_types::SplatBuffer;
use tokio::sync::mpsc;

/// Phase reported with each progress update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderStatus {
    Downloading,
    Processing,
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    pub percent: f64,
    /// `percent` formatted as `"12.34%"`.
    pub label: String,
    pub status: LoaderStatus,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(percent: f64, status: LoaderStatus) -> Self {
        Self {
            percent,
            label: format!("{percent:.2}%"),
            status,
        }
    }
}

/// Callbacks fired while a load is in flight. Both default to no-ops.
///
/// `on_section_built` receives the buffer after every emitting tick. It is
/// safe to read any splat `k < view.section_loaded_count(i)` there.
pub trait LoadObserver {
    fn on_progress(&mut self, _update: &ProgressUpdate) {}

    fn on_section_built(&mut self, _view: &SplatBuffer, _load_complete: bool) {}
}

impl LoadObserver for () {}

/// Counters copied out of a [`SplatBuffer`] at one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadSnapshot {
    pub reached_section_count: usize,
    pub loaded_splat_count: usize,
    pub section_loaded_counts: Vec<usize>,
    pub load_complete: bool,
}

impl LoadSnapshot {
    #[must_use]
    pub fn capture(view: &SplatBuffer, load_complete: bool) -> Self {
        Self {
            reached_section_count: view.reached_section_count(),
            loaded_splat_count: view.loaded_splat_count(),
            section_loaded_counts: view.counters().section_loaded_counts().to_vec(),
            load_complete,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadEvent {
    Progress(ProgressUpdate),
    SectionBuilt(LoadSnapshot),
}

/// [`LoadObserver`] that forwards every callback into an unbounded channel.
///
/// Sends to a dropped receiver are ignored; the load keeps going.
#[derive(Clone, Debug)]
pub struct ProgressChannel {
    tx: mpsc::UnboundedSender<LoadEvent>,
}

impl ProgressChannel {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LoadObserver for ProgressChannel {
    fn on_progress(&mut self, update: &ProgressUpdate) {
        let _ = self.tx.send(LoadEvent::Progress(update.clone()));
    }

    fn on_section_built(&mut self, view: &SplatBuffer, load_complete: bool) {
        let _ = self
            .tx
            .send(LoadEvent::SectionBuilt(LoadSnapshot::capture(view, load_complete)));
    }
}
