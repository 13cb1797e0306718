use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Elapsed recording time, advanced by a periodic tick.
///
/// The tick only runs while recording; pausing drops it and resuming
/// starts a fresh period from the current count.
pub struct SessionClock {
    period: Duration,
    elapsed_secs: u64,
    interval: Option<Interval>,
    active: Duration,
    running_since: Option<Instant>,
}

impl SessionClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            elapsed_secs: 0,
            interval: None,
            active: Duration::ZERO,
            running_since: None,
        }
    }

    /// Reset to zero and start ticking
    pub fn start(&mut self) {
        self.elapsed_secs = 0;
        self.active = Duration::ZERO;
        self.run();
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.active += since.elapsed();
        }
        self.interval = None;
    }

    pub fn resume(&mut self) {
        if self.interval.is_none() {
            self.run();
        }
    }

    pub fn stop(&mut self) {
        self.pause();
    }

    /// Stop and clear the count
    pub fn reset(&mut self) {
        self.stop();
        self.elapsed_secs = 0;
        self.active = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Unpaused time since `start`
    pub fn active_duration(&self) -> Duration {
        self.active + self.running_since.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Wait for the next tick and count it. Never resolves while stopped.
    pub async fn tick(&mut self) -> u64 {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
                self.elapsed_secs += 1;
                self.elapsed_secs
            }
            None => std::future::pending().await,
        }
    }

    fn run(&mut self) {
        let now = Instant::now();
        let mut interval = tokio::time::interval_at(now + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self.running_since = Some(now);
    }
}
