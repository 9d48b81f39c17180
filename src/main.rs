use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_channel::Receiver;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use lapwatch::{
    Config, EngineHandle, EngineRuntime, Mode, Outcome, TimerEvent,
    controls::{Action, Key},
    display::DisplaySink,
    export::{Clipboard, CommandClipboard, CsvLayout, ShareOutcome},
    format::{ClockFace, Readout},
    listeners::{AchievementNotifier, AnalogueRenderer},
    logging,
    storage::{JsonFileStore, KeyValueStore, MemoryStore},
    timer::EngineBuilder,
};

#[derive(Parser)]
#[command(version, about = "Stopwatch and countdown timer with lap times")]
struct Args {
    /// stopwatch or countdown
    #[arg(long)]
    mode: Option<Mode>,
    /// Countdown duration in seconds
    #[arg(long)]
    countdown: Option<String>,
    /// JSON file the laps are kept in
    #[arg(long)]
    store: Option<PathBuf>,
    /// Program that receives shared laps on stdin, e.g. "wl-copy"
    #[arg(long)]
    clipboard: Option<String>,
    #[arg(long)]
    sample_ms: Option<u64>,
    /// Redraw the readout continuously
    #[arg(long)]
    live: bool,
}

impl Args {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config = config.with_mode(mode);
        }
        if let Some(countdown) = &self.countdown {
            config = config.with_countdown_input(countdown.clone());
        }
        if let Some(store) = &self.store {
            config = config.with_store_path(store.clone());
        }
        if let Some(clipboard) = &self.clipboard {
            config = config.with_clipboard_command(clipboard.clone());
        }
        if let Some(ms) = self.sample_ms.filter(|ms| *ms > 0) {
            config = config.with_sample_interval(std::time::Duration::from_millis(ms));
        }
        config
    }
}

#[derive(Parser)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct Repl {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Start,
    Pause,
    Reset,
    Lap,
    /// Delete every recorded lap
    Clear,
    /// Copy laps to the clipboard as CSV
    Share,
    /// Write laps to a CSV file or directory
    Download {
        path: Option<PathBuf>,
        #[arg(long)]
        time_only: bool,
    },
    /// Replace the laps with those of a CSV file
    Import { path: PathBuf },
    Mode { mode: Mode },
    /// Set the countdown duration in seconds
    Countdown { seconds: String },
    /// Simulate a key press: space, ctrl-r, l
    Key { key: Key },
    Status,
    Laps,
    Exit,
}

/// Terminal display shared by the engine and the analogue renderer.
#[derive(Clone)]
struct Screen {
    live: bool,
    state: Arc<Mutex<ScreenState>>,
}

#[derive(Default)]
struct ScreenState {
    readout: String,
    face: String,
}

impl Screen {
    fn new(live: bool) -> Self {
        Self {
            live,
            state: Arc::default(),
        }
    }

    fn redraw(&self, state: &ScreenState) {
        if self.live {
            let mut out = std::io::stdout();
            let _ = write!(out, "\r{} {}", state.readout, state.face);
            let _ = out.flush();
        }
    }
}

impl DisplaySink for Screen {
    fn show_readout(&mut self, readout: &Readout) {
        if let Ok(mut state) = self.state.lock() {
            let text = readout.to_string();
            if state.readout != text {
                state.readout = text;
                self.redraw(&state);
            }
        }
    }

    fn show_face(&mut self, face: &ClockFace) {
        const WIDTH: usize = 20;
        let filled = ((face.fraction_of_minute * WIDTH as f64) as usize).min(WIDTH);
        let bar = format!(
            "[{}{}] {}",
            "#".repeat(filled),
            ".".repeat(WIDTH - filled),
            face.label
        );
        if let Ok(mut state) = self.state.lock() {
            if state.face != bar {
                state.face = bar;
                self.redraw(&state);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();
    let config = args.apply(Config::from_env()?);

    let store: Arc<dyn KeyValueStore> = match config.store_path() {
        Some(path) => match JsonFileStore::open(path) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "cannot open store, laps will not persist"
                );
                Arc::new(MemoryStore::new())
            }
        },
        None => Arc::new(MemoryStore::new()),
    };
    let clipboard = config
        .clipboard_command()
        .and_then(CommandClipboard::parse)
        .map(|c| Arc::new(c) as Arc<dyn Clipboard>);

    let screen = Screen::new(args.live);
    let builder = EngineBuilder::from_config(&config)
        .with_store(store)
        .with_display(screen.clone());
    let (handle, task) = EngineRuntime::spawn(builder, clipboard);

    if let Some(events) = handle.subscribe().await {
        tokio::spawn(AnalogueRenderer::new(screen).run(events));
    }
    if let Some(events) = handle.subscribe().await {
        tokio::spawn(AchievementNotifier::new().run(events, |a| {
            println!("{} {}", a.emoji(), a.text());
        }));
    }
    if let Some(events) = handle.subscribe().await {
        tokio::spawn(announce_expiry(events));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match respond(line, &handle).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => println!("{err}"),
        }
    }

    handle.shutdown().await;
    task.await?;
    Ok(())
}

async fn announce_expiry(events: Receiver<TimerEvent>) {
    while let Ok(event) = events.recv().await {
        if event == TimerEvent::Expired {
            println!("\x07Countdown finished");
        }
    }
}

async fn respond(line: &str, handle: &EngineHandle) -> Result<bool, String> {
    let args = shlex::split(line).ok_or("error: Invalid quoting")?;
    let repl = Repl::try_parse_from(args).map_err(|e| e.to_string())?;

    let action = match repl.command {
        Commands::Start => Action::Start,
        Commands::Pause => Action::Pause,
        Commands::Reset => Action::Reset,
        Commands::Lap => Action::Lap,
        Commands::Clear => Action::ClearLaps,
        Commands::Share => Action::Share,
        Commands::Download { path, time_only } => Action::Download {
            target: path.unwrap_or_else(|| PathBuf::from(".")),
            layout: if time_only {
                CsvLayout::TimeOnly
            } else {
                CsvLayout::WithSplits
            },
        },
        Commands::Import { path } => Action::Import { source: path },
        Commands::Mode { mode } => Action::SetMode(mode),
        Commands::Countdown { seconds } => Action::SetCountdown(seconds),
        Commands::Key { key } => {
            let outcome = handle.press(key).await.ok_or("engine stopped")?;
            print_outcome(outcome);
            return Ok(false);
        }
        Commands::Status => {
            let s = handle.snapshot().await.ok_or("engine stopped")?;
            println!("{} {} {} ({} laps)", s.mode, s.status, s.readout, s.laps.len());
            return Ok(false);
        }
        Commands::Laps => {
            let s = handle.snapshot().await.ok_or("engine stopped")?;
            if s.laps.is_empty() {
                println!("No lap times recorded");
            }
            for lap in s.laps.iter().rev() {
                println!("Lap {}  {}  Split: {}", lap.index, lap.value_text(), lap.split_text());
            }
            return Ok(false);
        }
        Commands::Exit => return Ok(true),
    };

    let outcome = handle.apply(action).await.ok_or("engine stopped")?;
    print_outcome(outcome);
    Ok(false)
}

fn print_outcome(outcome: Outcome) {
    match outcome {
        Outcome::Applied | Outcome::Ignored => {}
        Outcome::Lap(lap) => {
            println!("Lap {}  {}  Split: {}", lap.index, lap.value_text(), lap.split_text())
        }
        Outcome::Rejected(err) => println!("{err}"),
        Outcome::Shared(ShareOutcome::Copied) => println!("Lap times copied to clipboard!"),
        Outcome::Shared(ShareOutcome::NothingToShare) => println!("No lap times to share"),
        Outcome::Shared(ShareOutcome::Unsupported) => {
            println!("Clipboard not supported (set --clipboard or LAPWATCH_CLIPBOARD)")
        }
        Outcome::Shared(ShareOutcome::Failed(err)) => println!("{err}"),
        Outcome::Downloaded(path) => println!("Saved {}", path.display()),
        Outcome::Imported(count) => println!("Imported {count} laps"),
        Outcome::Failed(err) => println!("{err}"),
    }
}
