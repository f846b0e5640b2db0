use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Shared handle to the period of one scheduling loop.
///
/// The loop holds the only timer and re-arms it whenever the value changes,
/// so replacing the period supersedes any deadline computed from the old one.
#[derive(Clone, Debug)]
pub struct IntervalHandle {
    tx: Arc<watch::Sender<Duration>>,
}

impl IntervalHandle {
    pub fn new(initial: Duration) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the period. Takes effect for the next scheduling decision.
    pub fn set(&self, interval: Duration) {
        self.tx.send_replace(interval);
    }

    pub fn get(&self) -> Duration {
        *self.tx.borrow()
    }

    /// Receiver observing every future change.
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.tx.subscribe()
    }
}
