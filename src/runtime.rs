//! Runs a `TimerEngine` on its own tokio task.
//!
//! Every user action and every scheduler sample arrives as a `Command` on one
//! queue and is applied to completion before the next is taken, so the engine
//! never sees interleaved mutations.

use std::path::PathBuf;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{
    controls::{Action, Key, action_for_key},
    error::{EngineError, ExportError},
    export::{Clipboard, ShareOutcome, download_laps, share_laps},
    format::Readout,
    ledger::LapRecord,
    timer::{EngineBuilder, Mode, Status, TimerEngine, TimerEvent, TokioScheduler},
};

const COMMAND_QUEUE: usize = 64;

pub enum Command {
    Action {
        action: Action,
        reply: Option<oneshot::Sender<Outcome>>,
    },
    Key {
        key: Key,
        reply: Option<oneshot::Sender<Outcome>>,
    },
    /// Posted by the sampler.
    Sample { generation: u64 },
    Snapshot(oneshot::Sender<Snapshot>),
    Subscribe(oneshot::Sender<Receiver<TimerEvent>>),
    Shutdown,
}

#[derive(Debug)]
pub enum Outcome {
    Applied,
    /// The action does not apply in the current state.
    Ignored,
    Lap(LapRecord),
    Rejected(EngineError),
    Shared(ShareOutcome),
    Downloaded(PathBuf),
    Imported(usize),
    Failed(ExportError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub mode: Mode,
    pub status: Status,
    pub readout: Readout,
    pub countdown_input: String,
    /// Chronological.
    pub laps: Vec<LapRecord>,
}

#[derive(Clone)]
pub struct EngineHandle {
    commands: Sender<Command>,
}

impl EngineHandle {
    pub async fn apply(&self, action: Action) -> Option<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Action {
            action,
            reply: Some(reply),
        })
        .await?;
        rx.await.ok()
    }

    pub async fn press(&self, key: Key) -> Option<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Key {
            key,
            reply: Some(reply),
        })
        .await?;
        rx.await.ok()
    }

    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.ok()
    }

    pub async fn subscribe(&self) -> Option<Receiver<TimerEvent>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe(reply)).await?;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        self.send(Command::Shutdown).await;
    }

    async fn send(&self, command: Command) -> Option<()> {
        self.commands.send(command).await.ok()
    }
}

pub struct EngineRuntime {
    engine: TimerEngine,
    commands: Receiver<Command>,
    clipboard: Option<Arc<dyn Clipboard>>,
}

impl EngineRuntime {
    /// Builds the engine with a tokio sampler and starts serving commands.
    /// The task ends on `Shutdown` or once every handle is dropped.
    pub fn spawn(
        builder: EngineBuilder,
        clipboard: Option<Arc<dyn Clipboard>>,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (tx, rx) = async_channel::bounded(COMMAND_QUEUE);
        let engine = builder.with_scheduler(TokioScheduler::new(&tx)).build();
        let runtime = Self {
            engine,
            commands: rx,
            clipboard,
        };
        let task = tokio::spawn(runtime.run());
        (EngineHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        while let Ok(command) = self.commands.recv().await {
            match command {
                Command::Sample { generation } => {
                    self.engine.sample(generation);
                }
                Command::Action { action, reply } => {
                    let outcome = self.apply(action).await;
                    respond(reply, outcome);
                }
                Command::Key { key, reply } => {
                    let outcome = match action_for_key(key, self.engine.is_running()) {
                        Some(action) => self.apply(action).await,
                        None => Outcome::Ignored,
                    };
                    respond(reply, outcome);
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Command::Subscribe(reply) => {
                    let _ = reply.send(self.engine.subscribe());
                }
                Command::Shutdown => break,
            }
        }
        tracing::debug!("engine runtime stopped");
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.engine.mode(),
            status: self.engine.status(),
            readout: self.engine.readout(),
            countdown_input: self.engine.countdown_input().to_string(),
            laps: self.engine.laps().to_vec(),
        }
    }

    async fn apply(&mut self, action: Action) -> Outcome {
        match action {
            Action::Start => started(self.engine.start()),
            Action::Toggle => started(self.engine.toggle()),
            Action::Pause => applied(self.engine.pause()),
            Action::Reset => {
                self.engine.reset();
                Outcome::Applied
            }
            Action::Lap => self.engine.record_lap().map_or(Outcome::Ignored, Outcome::Lap),
            Action::ClearLaps => {
                self.engine.clear_laps();
                Outcome::Applied
            }
            Action::Share => {
                Outcome::Shared(share_laps(self.engine.laps(), self.clipboard.as_deref()).await)
            }
            Action::Download { target, layout } => {
                match download_laps(self.engine.laps(), &target, layout).await {
                    Ok(path) => Outcome::Downloaded(path),
                    Err(err) => Outcome::Failed(err),
                }
            }
            Action::Import { source } => match tokio::fs::read_to_string(&source).await {
                Ok(text) => Outcome::Imported(self.engine.import_csv(&text)),
                Err(err) => {
                    tracing::warn!(%err, path = %source.display(), "import failed");
                    Outcome::Failed(err.into())
                }
            },
            Action::SetMode(mode) => match self.engine.set_mode(mode) {
                Ok(()) => Outcome::Applied,
                Err(err) => Outcome::Rejected(err),
            },
            Action::SetCountdown(input) => {
                self.engine.set_countdown_input(input);
                Outcome::Applied
            }
        }
    }
}

fn respond(reply: Option<oneshot::Sender<Outcome>>, outcome: Outcome) {
    if let Some(reply) = reply {
        let _ = reply.send(outcome);
    }
}

fn applied(changed: bool) -> Outcome {
    if changed { Outcome::Applied } else { Outcome::Ignored }
}

fn started(result: Result<bool, EngineError>) -> Outcome {
    match result {
        Ok(changed) => applied(changed),
        Err(err) => Outcome::Rejected(err),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::controls::KeyCode;
    use crate::timer::WallClock;

    /// Reads tokio's clock so paused-time tests advance it.
    struct TokioClock {
        origin: Instant,
    }

    impl WallClock for TokioClock {
        fn now_ms(&self) -> u64 {
            // offset keeps readings away from zero
            1_000_000 + self.origin.elapsed().as_millis() as u64
        }
    }

    fn spawn(mode: Mode) -> (EngineHandle, JoinHandle<()>) {
        let builder = TimerEngine::builder()
            .with_mode(mode)
            .with_clock(TokioClock {
                origin: Instant::now(),
            });
        EngineRuntime::spawn(builder, None)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_wait_pause() {
        let (handle, _task) = spawn(Mode::Stopwatch);
        assert!(matches!(handle.apply(Action::Start).await, Some(Outcome::Applied)));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(matches!(handle.apply(Action::Pause).await, Some(Outcome::Applied)));
        assert!(matches!(handle.apply(Action::Pause).await, Some(Outcome::Ignored)));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, Status::Paused);
        let shown = crate::format::parse_time(&snapshot.readout.to_string()).unwrap();
        assert!((490..=530).contains(&shown), "shown {shown}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_drive_the_display_events() {
        let (handle, _task) = spawn(Mode::Stopwatch);
        let events = handle.subscribe().await.unwrap();
        handle.apply(Action::Start).await;
        tokio::time::sleep(Duration::from_millis(105)).await;
        handle.apply(Action::Pause).await;

        let mut ticks = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TimerEvent::Tick { .. }) {
                ticks += 1;
            }
        }
        assert!((9..=11).contains(&ticks), "ticks {ticks}");

        // nothing arrives once paused
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.snapshot().await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_expires_on_its_own() {
        let (handle, _task) = spawn(Mode::Countdown);
        let events = handle.subscribe().await.unwrap();
        handle.apply(Action::SetCountdown("1".into())).await;
        assert!(matches!(handle.apply(Action::Start).await, Some(Outcome::Applied)));

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, Status::Expired);
        assert_eq!(snapshot.readout.to_string(), "00:00:00");

        let expired = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| *e == TimerEvent::Expired)
            .count();
        assert_eq!(expired, 1);

        // start is enabled again and needs a fresh duration
        assert!(matches!(
            handle.apply(Action::Start).await,
            Some(Outcome::Applied)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_countdown_is_reported() {
        let (handle, _task) = spawn(Mode::Countdown);
        handle.apply(Action::SetCountdown("abc".into())).await;
        assert!(matches!(
            handle.apply(Action::Start).await,
            Some(Outcome::Rejected(EngineError::InvalidCountdown(_)))
        ));
        assert_eq!(handle.snapshot().await.unwrap().status, Status::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_bindings_drive_engine() {
        let (handle, _task) = spawn(Mode::Stopwatch);
        let space = Key::plain(KeyCode::Space);
        let lap = Key::plain(KeyCode::Char('l'));

        assert!(matches!(handle.press(lap).await, Some(Outcome::Ignored)));
        handle.press(space).await;
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(matches!(handle.press(lap).await, Some(Outcome::Lap(_))));
        handle.press(space).await;
        assert_eq!(handle.snapshot().await.unwrap().status, Status::Paused);

        handle.press(Key::ctrl(KeyCode::Char('r'))).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.status, Status::Idle);
        assert!(snapshot.laps.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_without_clipboard_is_unsupported() {
        let (handle, _task) = spawn(Mode::Stopwatch);
        assert!(matches!(
            handle.apply(Action::Share).await,
            Some(Outcome::Shared(ShareOutcome::NothingToShare))
        ));
        handle.apply(Action::Start).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.apply(Action::Lap).await;
        assert!(matches!(
            handle.apply(Action::Share).await,
            Some(Outcome::Shared(ShareOutcome::Unsupported))
        ));
    }

    #[tokio::test]
    async fn test_download_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, _task) = spawn(Mode::Stopwatch);
        handle.apply(Action::Start).await;
        handle.apply(Action::Lap).await;
        handle.apply(Action::Lap).await;

        let target = dir.path().to_path_buf();
        let Some(Outcome::Downloaded(path)) = handle
            .apply(Action::Download { target, layout: Default::default() })
            .await
        else {
            panic!("download failed");
        };

        handle.apply(Action::Reset).await;
        assert!(handle.snapshot().await.unwrap().laps.is_empty());
        assert!(matches!(
            handle.apply(Action::Import { source: path }).await,
            Some(Outcome::Imported(2))
        ));
        assert_eq!(handle.snapshot().await.unwrap().laps.len(), 2);

        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            handle.apply(Action::Import { source: missing }).await,
            Some(Outcome::Failed(ExportError::Io(_)))
        ));
    }

    #[tokio::test]
    async fn test_runtime_stops_when_handles_drop() {
        let (handle, task) = spawn(Mode::Stopwatch);
        handle.apply(Action::Start).await;
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("runtime kept running")
            .unwrap();
    }
}
