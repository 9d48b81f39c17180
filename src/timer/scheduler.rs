//! Periodic sampling of a running timer.
//!
//! A scheduler hands out a new *generation* every time it is armed or
//! cancelled. Samples are tagged with the generation that produced them, and
//! the engine drops any sample whose generation is no longer current, so a
//! sample already queued when the timer was paused can never mutate state.

use std::time::Duration;

use async_channel::{Sender, WeakSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::runtime::Command;

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

pub trait Scheduler: Send {
    /// Starts sampling every `period`, replacing any previous schedule.
    /// Returns the generation the samples will carry.
    fn arm(&mut self, period: Duration) -> u64;

    /// Stops sampling. Takes effect before this call returns.
    fn cancel(&mut self);

    fn generation(&self) -> u64;

    fn is_armed(&self) -> bool;
}

pub(crate) struct SampleClock {
    inner: Interval,
}

impl SampleClock {
    pub(crate) fn new(period: Duration) -> Self {
        let mut inner = interval_at(Instant::now() + period, period);
        inner.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { inner }
    }

    pub(crate) async fn tick(&mut self) {
        self.inner.tick().await;
    }
}

/// Samples on a tokio task that posts `Command::Sample` into the engine's
/// command queue. Holds the queue weakly so it never keeps it open.
pub struct TokioScheduler {
    commands: WeakSender<Command>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl TokioScheduler {
    pub fn new(commands: &Sender<Command>) -> Self {
        Self {
            commands: commands.downgrade(),
            task: None,
            generation: 0,
        }
    }
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, period: Duration) -> u64 {
        self.cancel();
        let generation = self.generation;
        let commands = self.commands.clone();

        self.task = Some(tokio::spawn(async move {
            let mut clock = SampleClock::new(period);
            loop {
                clock.tick().await;
                let Some(sender) = commands.upgrade() else {
                    break;
                };
                if sender.send(Command::Sample { generation }).await.is_err() {
                    tracing::debug!(generation, "command queue closed, sampler exiting");
                    break;
                }
            }
        }));
        generation
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Scheduler that never fires on its own; the caller drives samples.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    armed: Option<Duration>,
    generation: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(&self) -> Option<Duration> {
        self.armed
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, period: Duration) -> u64 {
        self.cancel();
        self.armed = Some(period);
        self.generation
    }

    fn cancel(&mut self) {
        self.armed = None;
        self.generation += 1;
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_generations() {
        let mut s = ManualScheduler::new();
        let first = s.arm(DEFAULT_SAMPLE_INTERVAL);
        assert!(s.is_armed());
        assert_eq!(s.period(), Some(DEFAULT_SAMPLE_INTERVAL));

        s.cancel();
        assert!(!s.is_armed());
        let second = s.arm(DEFAULT_SAMPLE_INTERVAL);
        assert_ne!(first, second);
        assert_eq!(s.generation(), second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_posts_samples() {
        let (tx, rx) = async_channel::bounded(16);
        let mut s = TokioScheduler::new(&tx);
        let generation = s.arm(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(35)).await;
        let mut seen = 0;
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                Command::Sample { generation: g } => assert_eq!(g, generation),
                _ => panic!("unexpected command"),
            }
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel_stops_samples() {
        let (tx, rx) = async_channel::bounded(16);
        let mut s = TokioScheduler::new(&tx);
        let generation = s.arm(Duration::from_millis(10));
        s.cancel();
        assert!(!s.is_armed());
        assert_ne!(s.generation(), generation);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
