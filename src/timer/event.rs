use crate::{ledger::LapRecord, timer::Mode};

/// Published by the engine after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    Started { mode: Mode, value_ms: u64 },
    Paused { value_ms: u64 },
    /// A sample of a running timer.
    Tick { mode: Mode, value_ms: u64 },
    /// A countdown reached zero.
    Expired,
    Reset,
    ModeChanged(Mode),
    LapRecorded {
        mode: Mode,
        record: LapRecord,
        lap_count: usize,
    },
    LapsCleared,
    LapsImported { count: usize },
}

impl TimerEvent {
    /// The value the display should show after this event, if it carries one.
    pub fn displayed_ms(&self) -> Option<u64> {
        match self {
            Self::Started { value_ms, .. }
            | Self::Paused { value_ms }
            | Self::Tick { value_ms, .. } => Some(*value_ms),
            Self::Expired | Self::Reset => Some(0),
            _ => None,
        }
    }
}
