use chrono::{DateTime, Utc};
use sensor::{Channel, DetectionEvent};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Latest presence reported by one channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelFlag {
    pub channel: Channel,
    pub presence: bool,
    /// `None` until the channel reports for the first time
    pub last_updated: Option<DateTime<Utc>>,
}

impl ChannelFlag {
    fn empty(channel: Channel) -> Self {
        Self {
            channel,
            presence: false,
            last_updated: None,
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>, window: Option<chrono::Duration>) -> bool {
        match (window, self.last_updated) {
            (None, _) => true,
            (Some(window), Some(at)) => now - at <= window,
            (Some(_), None) => false,
        }
    }
}

/// Composite "hungry" signal plus the flags it was derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeState {
    pub hungry: bool,
    pub vision: bool,
    pub audio: bool,
}

impl CompositeState {
    fn of(vision: bool, audio: bool) -> Self {
        Self {
            hungry: vision && audio,
            vision,
            audio,
        }
    }
}

struct Flags {
    vision: ChannelFlag,
    audio: ChannelFlag,
    published: bool,
}

impl Flags {
    fn slot(&mut self, channel: Channel) -> &mut ChannelFlag {
        match channel {
            Channel::Vision => &mut self.vision,
            Channel::Audio => &mut self.audio,
        }
    }

    fn composite(&self, now: DateTime<Utc>, window: Option<chrono::Duration>) -> CompositeState {
        let effective = |f: &ChannelFlag| f.presence && f.is_fresh(now, window);
        CompositeState::of(effective(&self.vision), effective(&self.audio))
    }

    /// Recompute and remember; `Some` only when `hungry` flipped.
    fn publish(
        &mut self,
        now: DateTime<Utc>,
        window: Option<chrono::Duration>,
    ) -> Option<CompositeState> {
        let state = self.composite(now, window);
        if state.hungry == self.published {
            return None;
        }
        self.published = state.hungry;
        Some(state)
    }
}

/// Holds one flag per channel and derives [`CompositeState`] from them.
///
/// Both flags and the last published state sit behind one lock, so every
/// update reads and writes a consistent pair no matter which thread calls.
pub struct FusionEngine {
    flags: Mutex<Flags>,
    stale_after: Option<Duration>,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FusionEngine {
    /// `stale_after: None` keeps a flag until its channel reports again.
    /// With a window, a flag older than it counts as absent.
    pub fn new(stale_after: Option<Duration>) -> Self {
        Self {
            flags: Mutex::new(Flags {
                vision: ChannelFlag::empty(Channel::Vision),
                audio: ChannelFlag::empty(Channel::Audio),
                published: false,
            }),
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after
    }

    fn window(&self) -> Option<chrono::Duration> {
        // windows beyond chrono's range never expire
        self.stale_after
            .and_then(|d| chrono::Duration::from_std(d).ok())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the flag of `event.channel` and recompute.
    ///
    /// Returns the new state only when `hungry` changed.
    pub fn update(&self, event: &DetectionEvent) -> Option<CompositeState> {
        self.update_at(event, Utc::now())
    }

    /// [`update`](Self::update) evaluated at `now`.
    pub fn update_at(&self, event: &DetectionEvent, now: DateTime<Utc>) -> Option<CompositeState> {
        let window = self.window();
        let mut flags = self.lock();
        *flags.slot(event.channel) = ChannelFlag {
            channel: event.channel,
            presence: event.presence,
            last_updated: Some(event.timestamp),
        };
        flags.publish(now, window)
    }

    /// Re-evaluate freshness at `now`; returns a transition caused by expiry.
    pub fn expire(&self, now: DateTime<Utc>) -> Option<CompositeState> {
        let window = self.window()?;
        self.lock().publish(now, Some(window))
    }

    /// Current composite state.
    pub fn snapshot(&self) -> CompositeState {
        self.lock().composite(Utc::now(), self.window())
    }

    pub fn flag(&self, channel: Channel) -> ChannelFlag {
        *self.lock().slot(channel)
    }
}
