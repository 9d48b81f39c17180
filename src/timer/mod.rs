pub mod clock;
pub mod engine;
pub mod event;
pub mod scheduler;
pub mod state;

pub use clock::{ManualClock, SystemClock, WallClock};
pub use engine::{EngineBuilder, TimerEngine, parse_countdown_seconds};
pub use event::TimerEvent;
pub use scheduler::{DEFAULT_SAMPLE_INTERVAL, ManualScheduler, Scheduler, TokioScheduler};
pub use state::{Mode, Status, TimerCore};
