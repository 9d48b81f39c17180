use thiserror::Error;

use crate::timer::{Mode, Status};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid countdown: enter a positive number of seconds (got {0:?})")]
    InvalidCountdown(String),
    #[error("cannot switch to {requested} mode while the timer is {status}")]
    ModeLocked { requested: Mode, status: Status },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no lap times to export")]
    NoLaps,
    #[error("clipboard is not supported")]
    ClipboardUnsupported,
    #[error("clipboard failed: {0}")]
    Clipboard(String),
    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
