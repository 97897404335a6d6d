// Scheduled-task primitives - cancellable timers polled from a select! loop
use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior, Sleep};

/// A fixed-period timer with explicit start/stop.
/// A stopped ticker never fires, so it can sit in a `select!` arm unconditionally.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Returns `false` if the ticker was already running.
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }
        // First tick one period from now, like setInterval.
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        true
    }

    /// Returns `false` if the ticker was not running.
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending::<()>().await,
        }
    }
}

/// A one-shot delay that can be rescheduled or cancelled.
#[derive(Debug, Default)]
pub struct Backoff {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Backoff {
    pub fn schedule(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(tokio::time::sleep(delay)));
    }

    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    /// Resolves once when the delay elapses, then disarms itself.
    pub async fn elapsed(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending::<()>().await,
        }
    }
}
