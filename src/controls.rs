//! User-facing actions and the keyboard bindings that trigger them.

use std::path::PathBuf;
use std::str::FromStr;

use crate::export::CsvLayout;
use crate::timer::Mode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Pause,
    /// Pause when running, start otherwise.
    Toggle,
    Reset,
    Lap,
    ClearLaps,
    Share,
    Download { target: PathBuf, layout: CsvLayout },
    Import { source: PathBuf },
    SetMode(Mode),
    SetCountdown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Space,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub code: KeyCode,
    pub ctrl: bool,
}

impl Key {
    pub fn plain(code: KeyCode) -> Self {
        Self { code, ctrl: false }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self { code, ctrl: true }
    }
}

impl FromStr for Key {
    type Err = String;

    /// Accepts `space`, a single character, or either prefixed with `ctrl-`
    /// / `ctrl+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (ctrl, name) = match lower
            .strip_prefix("ctrl-")
            .or_else(|| lower.strip_prefix("ctrl+"))
        {
            Some(rest) => (true, rest),
            None => (false, lower.as_str()),
        };

        let mut chars = name.chars();
        let code = match (name, chars.next(), chars.next()) {
            ("space", _, _) => KeyCode::Space,
            (_, Some(c), None) => KeyCode::Char(c),
            _ => return Err(format!("unknown key {s:?}")),
        };
        Ok(Self { code, ctrl })
    }
}

/// Space toggles start/pause, Ctrl+R resets, L records a lap while running.
pub fn action_for_key(key: Key, running: bool) -> Option<Action> {
    match key.code {
        KeyCode::Space => Some(Action::Toggle),
        KeyCode::Char('r' | 'R') if key.ctrl => Some(Action::Reset),
        KeyCode::Char('l' | 'L') if running => Some(Action::Lap),
        _ => None,
    }
}
