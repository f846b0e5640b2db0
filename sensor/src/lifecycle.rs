//! Plumbing shared by the audio and vision loops.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::{Channel, ChannelError, DetectionEvent, IntervalHandle};

/// Start/stop bookkeeping for one channel's loop task.
pub(crate) struct Lifecycle {
    channel: Channel,
    interval: IntervalHandle,
    cycles: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

struct Running {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Everything a loop needs from its owner.
pub(crate) struct LoopContext {
    pub channel: Channel,
    pub shutdown: Shutdown,
    pub interval: watch::Receiver<Duration>,
    pub cycles: Arc<AtomicU64>,
}

impl Lifecycle {
    pub fn new(channel: Channel, initial: Duration) -> Self {
        Self {
            channel,
            interval: IntervalHandle::new(initial),
            cycles: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn interval(&self) -> &IntervalHandle {
        &self.interval
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Spawn the loop built by `make` unless one is already alive.
    pub fn start<F, Fut>(&self, make: F) -> Result<(), ChannelError>
    where
        F: FnOnce(LoopContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return Ok(());
        }
        let rt = Handle::try_current().map_err(|_| ChannelError::NoRuntime(self.channel))?;
        let (stop, rx) = watch::channel(false);
        let ctx = LoopContext {
            channel: self.channel,
            shutdown: Shutdown(rx),
            interval: self.interval.subscribe(),
            cycles: self.cycles.clone(),
        };
        let task = rt.spawn(make(ctx));
        *running = Some(Running { stop, task });
        debug!(channel = %self.channel, "channel started");
        Ok(())
    }

    /// Signal the loop and wait for its task to finish.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Running { stop, task }) = running else {
            return;
        };
        let _ = stop.send(true);
        if let Err(e) = task.await {
            warn!(channel = %self.channel, "channel task ended abnormally: {e}");
        }
        debug!(channel = %self.channel, "channel stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }
}

/// Stop signal observed by a loop.
pub(crate) struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    /// Resolve once stop is requested or the owner is gone.
    pub async fn wait(&mut self) {
        loop {
            let stopped = *self.0.borrow_and_update();
            if stopped || self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Wait until `since + period`, re-reading the period whenever it changes.
///
/// Returns `false` when shutdown wins.
pub(crate) async fn wait_period(
    since: Instant,
    interval: &mut watch::Receiver<Duration>,
    shutdown: &mut Shutdown,
) -> bool {
    loop {
        let deadline = since + *interval.borrow_and_update();
        tokio::select! {
            biased;
            _ = shutdown.wait() => return false,
            changed = interval.changed() => {
                if changed.is_err() {
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => return false,
                        _ = time::sleep_until(deadline) => return true,
                    }
                }
            }
            _ = time::sleep_until(deadline) => return true,
        }
    }
}

/// How a single inference attempt ended.
pub(crate) enum Cycle<T> {
    Done(T),
    Failed,
    Stopped,
}

/// Run one blocking inference, mapping errors and panics to
/// [`Cycle::Failed`].
///
/// If shutdown is requested while waiting the blocking call is abandoned and
/// its result discarded.
pub(crate) async fn run_blocking<T, F>(
    channel: Channel,
    shutdown: &mut Shutdown,
    job: F,
) -> Cycle<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(job);
    let joined = tokio::select! {
        biased;
        _ = shutdown.wait() => return Cycle::Stopped,
        joined = handle => joined,
    };
    match joined {
        Ok(Ok(out)) => Cycle::Done(out),
        Ok(Err(e)) => {
            warn!(%channel, "inference failed: {e:#}");
            Cycle::Failed
        }
        Err(e) => {
            warn!(%channel, "inference panicked: {e}");
            Cycle::Failed
        }
    }
}

/// Hand an event to the reporter. Returns `false` if the loop should end.
pub(crate) async fn deliver(
    reporter: &mpsc::Sender<DetectionEvent>,
    event: DetectionEvent,
    shutdown: &mut Shutdown,
    cycles: &AtomicU64,
) -> bool {
    let channel = event.channel;
    tokio::select! {
        biased;
        _ = shutdown.wait() => false,
        sent = reporter.send(event) => {
            if sent.is_err() {
                warn!(%channel, "reporter closed; stopping channel");
                return false;
            }
            cycles.fetch_add(1, Ordering::Relaxed);
            true
        }
    }
}
