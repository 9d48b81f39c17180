use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};

use crate::{
    config::Config,
    display::{DisplaySink, NullDisplay},
    error::EngineError,
    export::{CsvLayout, parse_csv, to_csv},
    format::{Readout, format_time, format_time_text},
    ledger::{LapLedger, LapRecord},
    storage::{KeyValueStore, MemoryStore},
    timer::{
        Mode, Status, TimerEvent,
        clock::{SystemClock, WallClock},
        scheduler::{DEFAULT_SAMPLE_INTERVAL, ManualScheduler, Scheduler},
        state::{Sample, StartOutcome, TimerCore},
    },
};

/// Parses a countdown input the way a form field is read: leading whitespace
/// and an optional sign, then the leading run of digits. Anything after the
/// digits is ignored. The result must be a positive number of seconds.
pub fn parse_countdown_seconds(input: &str) -> Result<u64, EngineError> {
    let invalid = || EngineError::InvalidCountdown(input.to_string());
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let seconds: u64 = rest[..digits_end].parse().map_err(|_| invalid())?;

    if negative || seconds == 0 {
        return Err(invalid());
    }
    Ok(seconds)
}

/// The stopwatch/countdown engine.
///
/// All mutation goes through `&mut self`; the owner decides how calls are
/// serialized. Every mutation pushes a readout to the display sink and
/// publishes a `TimerEvent` to each subscriber.
pub struct TimerEngine {
    core: TimerCore,
    ledger: LapLedger,
    display: Box<dyn DisplaySink>,
    clock: Arc<dyn WallClock>,
    scheduler: Box<dyn Scheduler>,
    subscribers: Vec<Sender<TimerEvent>>,
    countdown_input: String,
    sample_interval: Duration,
    /// Value of the previous lap captured in the current run.
    previous_lap_ms: Option<u64>,
}

pub struct EngineBuilder {
    mode: Mode,
    countdown_input: String,
    sample_interval: Duration,
    display: Box<dyn DisplaySink>,
    clock: Arc<dyn WallClock>,
    scheduler: Box<dyn Scheduler>,
    store: Arc<dyn KeyValueStore>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            mode: Mode::Stopwatch,
            countdown_input: String::new(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            display: Box::new(NullDisplay),
            clock: Arc::new(SystemClock),
            scheduler: Box::new(ManualScheduler::new()),
            store: Arc::new(MemoryStore::new()),
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_mode(config.mode())
            .with_countdown_input(config.countdown_input())
            .with_sample_interval(config.sample_interval())
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_countdown_input(mut self, input: impl Into<String>) -> Self {
        self.countdown_input = input.into();
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_display(mut self, display: impl DisplaySink + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn with_clock(mut self, clock: impl WallClock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    pub fn build(self) -> TimerEngine {
        let mut display = self.display;
        display.show_readout(&Readout::zero());

        TimerEngine {
            core: TimerCore::new(self.mode),
            ledger: LapLedger::load(self.store),
            display,
            clock: self.clock,
            scheduler: self.scheduler,
            subscribers: Vec::new(),
            countdown_input: self.countdown_input,
            sample_interval: self.sample_interval,
            previous_lap_ms: None,
        }
    }
}

impl TimerEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn mode(&self) -> Mode {
        self.core.mode()
    }

    pub fn status(&self) -> Status {
        self.core.status()
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn is_sampling(&self) -> bool {
        self.scheduler.is_armed()
    }

    pub fn sampling_generation(&self) -> u64 {
        self.scheduler.generation()
    }

    pub fn countdown_input(&self) -> &str {
        &self.countdown_input
    }

    pub fn set_countdown_input(&mut self, input: impl Into<String>) {
        self.countdown_input = input.into();
    }

    pub fn displayed_ms(&self) -> u64 {
        self.core.displayed_ms(self.clock.now_ms())
    }

    pub fn readout(&self) -> Readout {
        format_time(self.displayed_ms())
    }

    /// `MM:SS:HH` of the value shown right now.
    pub fn current_time_text(&self) -> String {
        format_time_text(self.displayed_ms())
    }

    pub fn laps(&self) -> &[LapRecord] {
        self.ledger.records()
    }

    pub fn lap_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn ledger(&self) -> &LapLedger {
        &self.ledger
    }

    /// A new event stream. Each subscriber receives every event.
    pub fn subscribe(&mut self) -> Receiver<TimerEvent> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Starts or resumes. Returns `Ok(false)` when already running.
    pub fn start(&mut self) -> Result<bool, EngineError> {
        let fresh_countdown = self.core.mode() == Mode::Countdown && self.core.status().is_idle();
        let duration_ms = if fresh_countdown {
            match parse_countdown_seconds(&self.countdown_input) {
                Ok(seconds) => Some(seconds.saturating_mul(1_000)),
                Err(err) => {
                    tracing::warn!(%err, "countdown not started");
                    return Err(err);
                }
            }
        } else {
            None
        };

        let now = self.clock.now_ms();
        match self.core.start(now, || duration_ms) {
            StartOutcome::AlreadyRunning => return Ok(false),
            StartOutcome::MissingDuration => {
                return Err(EngineError::InvalidCountdown(self.countdown_input.clone()));
            }
            StartOutcome::Started => {}
        }

        let generation = self.scheduler.arm(self.sample_interval);
        let value_ms = self.core.displayed_ms(now);
        tracing::info!(mode = %self.core.mode(), value_ms, generation, "timer started");
        self.display.show_readout(&format_time(value_ms));
        self.publish(TimerEvent::Started {
            mode: self.core.mode(),
            value_ms,
        });
        Ok(true)
    }

    /// Freezes the displayed value. Returns `false` unless running.
    pub fn pause(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !self.core.pause(now) {
            return false;
        }
        self.scheduler.cancel();

        let value_ms = self.core.displayed_ms(now);
        tracing::info!(value_ms, "timer paused");
        self.display.show_readout(&format_time(value_ms));
        self.publish(TimerEvent::Paused { value_ms });
        true
    }

    /// Space-bar behaviour: pause when running, start otherwise.
    pub fn toggle(&mut self) -> Result<bool, EngineError> {
        if self.is_running() {
            Ok(self.pause())
        } else {
            self.start()
        }
    }

    /// Back to Idle from any state; also clears the laps and the pending
    /// countdown input.
    pub fn reset(&mut self) {
        self.scheduler.cancel();
        self.core.reset();
        self.countdown_input.clear();
        self.previous_lap_ms = None;
        self.ledger.clear();

        tracing::info!("timer reset");
        self.display.show_readout(&Readout::zero());
        self.publish(TimerEvent::Reset);
    }

    /// Applies a sample posted by the scheduler. Samples from a cancelled or
    /// replaced schedule are dropped.
    pub fn sample(&mut self, generation: u64) -> bool {
        if generation != self.scheduler.generation() || !self.scheduler.is_armed() {
            tracing::trace!(
                generation,
                current = self.scheduler.generation(),
                "stale sample dropped"
            );
            return false;
        }
        self.tick()
    }

    /// Recomputes the displayed value. Returns `false` when nothing ran.
    pub fn tick(&mut self) -> bool {
        match self.core.sample(self.clock.now_ms()) {
            Sample::Stopped => false,
            Sample::Running(value_ms) => {
                self.display.show_readout(&format_time(value_ms));
                self.publish(TimerEvent::Tick {
                    mode: self.core.mode(),
                    value_ms,
                });
                true
            }
            Sample::Expired => {
                self.scheduler.cancel();
                tracing::info!("countdown expired");
                self.display.show_readout(&Readout::zero());
                self.publish(TimerEvent::Expired);
                true
            }
        }
    }

    /// Captures the current value as a lap. Only while running.
    pub fn record_lap(&mut self) -> Option<LapRecord> {
        if !self.core.is_running() {
            return None;
        }
        let mode = self.core.mode();
        let value_ms = self.core.displayed_ms(self.clock.now_ms());
        let split_ms = match (mode, self.previous_lap_ms) {
            (Mode::Stopwatch, Some(previous)) => value_ms.saturating_sub(previous),
            (Mode::Stopwatch, None) => value_ms,
            (Mode::Countdown, Some(previous)) => previous.saturating_sub(value_ms),
            (Mode::Countdown, None) => 0,
        };
        self.previous_lap_ms = Some(value_ms);

        let record = self.ledger.push(value_ms, split_ms);
        tracing::debug!(index = record.index, value_ms, split_ms, "lap recorded");
        self.publish(TimerEvent::LapRecorded {
            mode,
            record,
            lap_count: self.ledger.len(),
        });
        Some(record)
    }

    pub fn clear_laps(&mut self) {
        self.ledger.clear();
        self.previous_lap_ms = None;
        self.publish(TimerEvent::LapsCleared);
    }

    /// Switches mode, which resets the timer. Refused while running or paused.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), EngineError> {
        let status = self.core.status();
        if !status.is_idle() {
            return Err(EngineError::ModeLocked {
                requested: mode,
                status,
            });
        }
        self.core.set_mode(mode);
        self.reset();
        tracing::info!(%mode, "mode switched");
        self.publish(TimerEvent::ModeChanged(mode));
        Ok(())
    }

    /// Chronological lap sheet.
    pub fn export_csv(&self, layout: CsvLayout) -> String {
        to_csv(self.ledger.records(), layout)
    }

    /// Replaces the ledger with the well-formed rows of `text`. Returns how
    /// many laps were imported.
    pub fn import_csv(&mut self, text: &str) -> usize {
        let rows = parse_csv(text);
        self.ledger.clear();
        self.previous_lap_ms = None;
        for row in &rows {
            self.ledger.push(row.value_ms, row.split_ms);
        }

        tracing::info!(count = rows.len(), "laps imported");
        self.publish(TimerEvent::LapsImported { count: rows.len() });
        rows.len()
    }

    fn publish(&mut self, event: TimerEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.try_send(event.clone()).is_ok());
    }
}
