//! Periodic re-fetch timer.
//!
//! A thin start/stop wrapper around `tokio::time::Interval`. The interval is
//! re-created on every `start`, so the cadence always comes from the policy
//! active right now, never from one captured at mount time. While stopped,
//! `tick` is pending forever, which lets it sit in a `tokio::select!` arm
//! without firing.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Default)]
pub struct Scheduler {
    interval: Option<Interval>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { interval: None }
    }

    /// (Re)start with a new cadence. The first tick fires one full cadence
    /// from now; the fetch issued alongside `start` already covers "now".
    pub fn start(&mut self, cadence: Duration) {
        let mut interval = interval_at(Instant::now() + cadence, cadence);
        // A slow fetch must not cause a burst of catch-up ticks faster than
        // the policy cadence.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Completes at the next cadence boundary, or never while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => futures::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_full_cadence() {
        let mut scheduler = Scheduler::new();
        scheduler.start(Duration::from_secs(5));

        let before = Instant::now();
        scheduler.tick().await;
        assert!(Instant::now() - before >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_never_ticks() {
        let mut scheduler = Scheduler::new();
        assert!(!scheduler.is_running());

        let result =
            tokio::time::timeout(Duration::from_secs(60), scheduler.tick()).await;
        assert!(result.is_err(), "tick must stay pending while stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_cadence() {
        let mut scheduler = Scheduler::new();
        scheduler.start(Duration::from_secs(60));
        scheduler.start(Duration::from_secs(1));

        let before = Instant::now();
        scheduler.tick().await;
        let elapsed = Instant::now() - before;
        assert!(elapsed < Duration::from_secs(2), "old cadence leaked: {elapsed:?}");
    }
}
