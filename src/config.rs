use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::timer::{DEFAULT_SAMPLE_INTERVAL, Mode};

pub const ENV_MODE: &str = "LAPWATCH_MODE";
pub const ENV_COUNTDOWN: &str = "LAPWATCH_COUNTDOWN";
pub const ENV_STORE: &str = "LAPWATCH_STORE";
pub const ENV_SAMPLE_MS: &str = "LAPWATCH_SAMPLE_MS";
pub const ENV_CLIPBOARD: &str = "LAPWATCH_CLIPBOARD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    mode: Mode,
    countdown_input: String,
    store_path: Option<PathBuf>,
    sample_interval: Duration,
    clipboard_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Stopwatch,
            countdown_input: String::new(),
            store_path: None,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            clipboard_command: None,
        }
    }
}

fn var_map<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    f: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => f(value.trim())
            .map(Some)
            .ok_or(ConfigError::Invalid { key, value }),
        _ => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from `lookup`, falling back to defaults for
    /// unset or blank keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mode = var_map(&lookup, ENV_MODE, |v| v.parse().ok())?.unwrap_or(defaults.mode);
        let countdown_input = lookup(ENV_COUNTDOWN).unwrap_or_default();
        let store_path = var_map(&lookup, ENV_STORE, |v| Some(PathBuf::from(v)))?;
        let sample_interval = var_map(&lookup, ENV_SAMPLE_MS, |v| {
            v.parse::<u64>().ok().filter(|ms| *ms > 0).map(Duration::from_millis)
        })?
        .unwrap_or(defaults.sample_interval);
        let clipboard_command = var_map(&lookup, ENV_CLIPBOARD, |v| Some(v.to_string()))?;

        Ok(Self {
            mode,
            countdown_input,
            store_path,
            sample_interval,
            clipboard_command,
        })
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_countdown_input(mut self, input: impl Into<String>) -> Self {
        self.countdown_input = input.into();
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_clipboard_command(mut self, command: impl Into<String>) -> Self {
        self.clipboard_command = Some(command.into());
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn countdown_input(&self) -> &str {
        &self.countdown_input
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    pub fn clipboard_command(&self) -> Option<&str> {
        self.clipboard_command.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sample_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_reads_every_key() {
        let config = Config::from_lookup(lookup(&[
            (ENV_MODE, "countdown"),
            (ENV_COUNTDOWN, "90"),
            (ENV_STORE, "/tmp/laps.json"),
            (ENV_SAMPLE_MS, "20"),
            (ENV_CLIPBOARD, "wl-copy"),
        ]))
        .unwrap();
        assert_eq!(config.mode(), Mode::Countdown);
        assert_eq!(config.countdown_input(), "90");
        assert_eq!(config.store_path(), Some(Path::new("/tmp/laps.json")));
        assert_eq!(config.sample_interval(), Duration::from_millis(20));
        assert_eq!(config.clipboard_command(), Some("wl-copy"));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = Config::from_lookup(lookup(&[(ENV_MODE, "hourglass")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: ENV_MODE,
                value: "hourglass".into()
            }
        );
        assert!(Config::from_lookup(lookup(&[(ENV_SAMPLE_MS, "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[(ENV_SAMPLE_MS, "fast")])).is_err());
    }
}
