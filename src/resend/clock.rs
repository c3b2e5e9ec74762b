//! Tick sources for the resend countdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Subscription to a periodic signal. Dropping it unsubscribes.
#[async_trait]
pub trait Ticker: Send {
    /// Resolves once per period.
    async fn tick(&mut self);
}

/// External periodic signal the resend countdown subscribes to while running.
pub trait Clock: Send + Sync + 'static {
    /// Opens a new subscription. Must be called from within a Tokio runtime.
    fn subscribe(&self) -> Box<dyn Ticker>;
}

/// Real-time clock emitting one tick per fixed period.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    period: Duration,
}

impl TokioClock {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Clock for TokioClock {
    fn subscribe(&self) -> Box<dyn Ticker> {
        // interval() fires immediately; the first tick must land one period out.
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Box::new(IntervalTicker(interval))
    }
}

struct IntervalTicker(Interval);

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.0.tick().await;
    }
}

/// Clock that only ticks when told to.
///
/// Each call to [`advance`](ManualClock::advance) delivers the ticks to every
/// live subscription.
#[derive(Clone, Default)]
pub struct ManualClock {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<()>>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `ticks` ticks to every subscriber.
    pub fn advance(&self, ticks: u32) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        for tx in subscribers.iter() {
            for _ in 0..ticks {
                let _ = tx.send(());
            }
        }
    }

    /// Number of subscriptions that have not been dropped.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl Clock for ManualClock {
    fn subscribe(&self) -> Box<dyn Ticker> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Box::new(ChannelTicker(rx))
    }
}

struct ChannelTicker(mpsc::UnboundedReceiver<()>);

#[async_trait]
impl Ticker for ChannelTicker {
    async fn tick(&mut self) {
        if self.0.recv().await.is_none() {
            // Clock dropped: no tick will ever come.
            std::future::pending::<()>().await;
        }
    }
}
