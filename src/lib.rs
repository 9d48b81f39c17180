//! Stopwatch and countdown timer engine with lap/split recording.
//!
//! [`timer::TimerEngine`] is the state machine. [`runtime::EngineRuntime`]
//! drives it on a tokio task with 10ms sampling. Laps are kept in a
//! [`ledger::LapLedger`] persisted through a [`storage::KeyValueStore`] and can
//! be exported, shared or imported as CSV via [`export`].

pub mod config;
pub mod controls;
pub mod display;
pub mod error;
pub mod export;
pub mod format;
pub mod ledger;
pub mod listeners;
pub mod logging;
pub mod runtime;
pub mod storage;
pub mod timer;

pub use config::Config;
pub use error::{ConfigError, EngineError, ExportError, StoreError};
pub use runtime::{EngineHandle, EngineRuntime, Outcome, Snapshot};
pub use timer::{Mode, Status, TimerEngine, TimerEvent};
