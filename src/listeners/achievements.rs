use async_channel::Receiver;

use crate::timer::{Mode, TimerEvent};

const ONE_HOUR_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Achievement {
    FirstLap,
    TenLaps,
    FiftyLaps,
    OneHour,
}

impl Achievement {
    pub fn text(&self) -> &'static str {
        match self {
            Achievement::FirstLap => "First lap!",
            Achievement::TenLaps => "10 laps!",
            Achievement::FiftyLaps => "50 laps!",
            Achievement::OneHour => "1 hour!",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Achievement::FirstLap => "🎉",
            Achievement::TenLaps => "🏅",
            Achievement::FiftyLaps => "🥇",
            Achievement::OneHour => "⏰",
        }
    }
}

/// Watches laps for milestones.
#[derive(Debug, Default)]
pub struct AchievementNotifier {
    hour_announced: bool,
}

impl AchievementNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &TimerEvent) -> Vec<Achievement> {
        let mut unlocked = Vec::new();
        match event {
            TimerEvent::LapRecorded {
                mode,
                record,
                lap_count,
            } => {
                match *lap_count {
                    1 => unlocked.push(Achievement::FirstLap),
                    10 => unlocked.push(Achievement::TenLaps),
                    50 => unlocked.push(Achievement::FiftyLaps),
                    _ => {}
                }
                if *mode == Mode::Stopwatch
                    && record.value_ms >= ONE_HOUR_MS
                    && !self.hour_announced
                {
                    self.hour_announced = true;
                    unlocked.push(Achievement::OneHour);
                }
            }
            TimerEvent::Reset => self.hour_announced = false,
            _ => {}
        }
        unlocked
    }

    pub async fn run(
        mut self,
        events: Receiver<TimerEvent>,
        mut notify: impl FnMut(Achievement) + Send,
    ) {
        while let Ok(event) = events.recv().await {
            for achievement in self.handle(&event) {
                tracing::debug!(?achievement, "achievement unlocked");
                notify(achievement);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LapRecord;

    fn lap(lap_count: usize, value_ms: u64) -> TimerEvent {
        TimerEvent::LapRecorded {
            mode: Mode::Stopwatch,
            record: LapRecord {
                index: lap_count,
                value_ms,
                split_ms: 0,
            },
            lap_count,
        }
    }

    #[test]
    fn test_lap_count_milestones() {
        let mut notifier = AchievementNotifier::new();
        let unlocked: Vec<Achievement> = (1..=60)
            .flat_map(|n| notifier.handle(&lap(n, n as u64 * 1_000)))
            .collect();
        assert_eq!(
            unlocked,
            [Achievement::FirstLap, Achievement::TenLaps, Achievement::FiftyLaps]
        );
    }

    #[test]
    fn test_one_hour_once_per_run() {
        let mut notifier = AchievementNotifier::new();
        assert_eq!(notifier.handle(&lap(2, ONE_HOUR_MS)), [Achievement::OneHour]);
        assert!(notifier.handle(&lap(3, ONE_HOUR_MS + 5_000)).is_empty());

        notifier.handle(&TimerEvent::Reset);
        assert_eq!(notifier.handle(&lap(2, ONE_HOUR_MS)), [Achievement::OneHour]);
    }

    #[test]
    fn test_countdown_values_never_count_as_an_hour() {
        let mut notifier = AchievementNotifier::new();
        let event = TimerEvent::LapRecorded {
            mode: Mode::Countdown,
            record: LapRecord {
                index: 2,
                value_ms: 2 * ONE_HOUR_MS,
                split_ms: 0,
            },
            lap_count: 2,
        };
        assert!(notifier.handle(&event).is_empty());
    }
}
