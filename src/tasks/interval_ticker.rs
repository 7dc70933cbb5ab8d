//! Tokio interval tick source

use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::state::{Tick, TickSource};

/// Real tick period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Tick source backed by a spawned `tokio::time::interval`
///
/// Ticks are pushed into an unbounded channel; the receiving half belongs to
/// the tick driver task. Attaching must happen inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct IntervalTickSource {
    tx: mpsc::UnboundedSender<Tick>,
    period: Duration,
}

impl IntervalTickSource {
    /// Create a source and the receiver its ticks arrive on
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, period }, rx)
    }
}

impl TickSource for IntervalTickSource {
    type Subscription = IntervalSubscription;

    fn attach(&mut self, epoch: u64) -> IntervalSubscription {
        let tx = self.tx.clone();
        let period = self.period;

        let handle = tokio::spawn(async move {
            // First tick one full period after attaching, not immediately
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if tx.send(Tick { epoch }).is_err() {
                    debug!("Tick receiver closed, stopping interval (epoch {})", epoch);
                    break;
                }
            }
        });

        IntervalSubscription { handle }
    }
}

/// Running interval task; aborted on drop
#[derive(Debug)]
pub struct IntervalSubscription {
    handle: JoinHandle<()>,
}

impl Drop for IntervalSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
