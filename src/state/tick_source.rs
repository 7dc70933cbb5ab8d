//! Tick source abstraction
//!
//! A tick source produces one [`Tick`] per second while a subscription is
//! held. Dropping the subscription stops the ticks.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// One second of countdown, tagged with the subscription that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub epoch: u64,
}

/// Periodic signal the timer session attaches to while running
pub trait TickSource {
    /// Live subscription; released when dropped
    type Subscription;

    /// Start delivering ticks tagged with `epoch`
    fn attach(&mut self, epoch: u64) -> Self::Subscription;
}

/// Tick source driven by hand, for tests and embedding in foreign loops
///
/// Nothing is scheduled: callers feed `Tick { epoch }` to the session
/// themselves. The source only tracks how many subscriptions are alive.
#[derive(Debug, Clone, Default)]
pub struct ManualTickSource {
    active: Arc<AtomicUsize>,
    attached: Arc<AtomicUsize>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions currently alive
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Total number of attaches over the source's lifetime
    pub fn total_attaches(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }
}

impl TickSource for ManualTickSource {
    type Subscription = ManualSubscription;

    fn attach(&mut self, _epoch: u64) -> ManualSubscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.attached.fetch_add(1, Ordering::SeqCst);
        ManualSubscription {
            active: Arc::clone(&self.active),
        }
    }
}

/// Subscription handed out by [`ManualTickSource`]
#[derive(Debug)]
pub struct ManualSubscription {
    active: Arc<AtomicUsize>,
}

impl Drop for ManualSubscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
