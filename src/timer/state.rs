//! The timer state machine over wall-clock milliseconds.
//!
//! `TimerCore` knows nothing about displays, ledgers or scheduling. Every
//! operation takes the current reading of the wall clock so it can be driven
//! deterministically.

use std::fmt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Stopwatch,
    Countdown,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Stopwatch => "stopwatch",
            Mode::Countdown => "countdown",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stopwatch" | "sw" => Ok(Mode::Stopwatch),
            "countdown" | "cd" => Ok(Mode::Countdown),
            other => Err(format!("unknown mode {other:?}")),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Running,
    Paused,
    Expired,
}

impl Status {
    /// Expired behaves like Idle for every control.
    pub fn is_idle(&self) -> bool {
        matches!(self, Status::Idle | Status::Expired)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Paused => "paused",
            Status::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Result of sampling a running timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// Not running; nothing changed.
    Stopped,
    Running(u64),
    /// The countdown reached zero on this sample.
    Expired,
}

#[derive(Debug, Default, Clone)]
pub struct TimerCore {
    mode: Mode,
    status: Status,
    /// Wall-clock reading of the last start.
    reference_ms: u64,
    /// Elapsed (stopwatch) or remaining (countdown) at `reference_ms`.
    accumulated_ms: u64,
}

impl TimerCore {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Changes mode and resets. Only allowed when idle or expired.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if !self.status.is_idle() {
            return false;
        }
        self.mode = mode;
        self.reset();
        true
    }

    /// Starts or resumes. `countdown_ms` is only consulted for a fresh
    /// countdown, i.e. one that is not resuming from a pause.
    pub fn start(
        &mut self,
        now_ms: u64,
        countdown_ms: impl FnOnce() -> Option<u64>,
    ) -> StartOutcome {
        match self.status {
            Status::Running => return StartOutcome::AlreadyRunning,
            Status::Paused => {}
            Status::Idle | Status::Expired => {
                if self.mode == Mode::Countdown {
                    match countdown_ms() {
                        Some(ms) if ms > 0 => self.accumulated_ms = ms,
                        _ => return StartOutcome::MissingDuration,
                    }
                } else {
                    self.accumulated_ms = 0;
                }
            }
        }
        self.reference_ms = now_ms;
        self.status = Status::Running;
        StartOutcome::Started
    }

    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.status != Status::Running {
            return false;
        }
        self.accumulated_ms = self.displayed_ms(now_ms);
        self.reference_ms = 0;
        self.status = Status::Paused;
        true
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
        self.reference_ms = 0;
        self.status = Status::Idle;
    }

    pub fn sample(&mut self, now_ms: u64) -> Sample {
        if self.status != Status::Running {
            return Sample::Stopped;
        }
        let displayed = self.displayed_ms(now_ms);
        if self.mode == Mode::Countdown && displayed == 0 {
            self.accumulated_ms = 0;
            self.reference_ms = 0;
            self.status = Status::Expired;
            return Sample::Expired;
        }
        Sample::Running(displayed)
    }

    /// Elapsed or remaining milliseconds as they should be shown at `now_ms`.
    pub fn displayed_ms(&self, now_ms: u64) -> u64 {
        if self.status != Status::Running {
            return self.accumulated_ms;
        }
        let segment = now_ms.saturating_sub(self.reference_ms);
        match self.mode {
            Mode::Stopwatch => self.accumulated_ms.saturating_add(segment),
            Mode::Countdown => self.accumulated_ms.saturating_sub(segment),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// Fresh countdown without a usable duration.
    MissingDuration,
}
