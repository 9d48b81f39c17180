use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;

use crate::error::ExportError;
use crate::export::csv::{CsvLayout, DOWNLOAD_FILE_NAME, to_csv};
use crate::ledger::LapRecord;

#[async_trait::async_trait]
pub trait Clipboard: Send + Sync + 'static {
    async fn write_text(&self, text: &str) -> Result<(), ExportError>;
}

/// Pipes text into an external program such as `wl-copy`, `xclip -selection
/// clipboard` or `pbcopy`.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a shell-style command line. `None` when it is empty or badly
    /// quoted.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = shlex::split(command_line)?.into_iter();
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }
}

#[async_trait::async_trait]
impl Clipboard for CommandClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ExportError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExportError::Clipboard(format!("cannot run {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        let status = child.wait().await?;
        if !status.success() {
            return Err(ExportError::Clipboard(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ShareOutcome {
    Copied,
    NothingToShare,
    Unsupported,
    Failed(ExportError),
}

/// Copies the lap sheet to `clipboard`. No clipboard means the host does not
/// support one.
pub async fn share_laps(records: &[LapRecord], clipboard: Option<&dyn Clipboard>) -> ShareOutcome {
    if records.is_empty() {
        return ShareOutcome::NothingToShare;
    }
    let Some(clipboard) = clipboard else {
        tracing::info!("share requested without a clipboard");
        return ShareOutcome::Unsupported;
    };

    match clipboard.write_text(&to_csv(records, CsvLayout::WithSplits)).await {
        Ok(()) => {
            tracing::info!(laps = records.len(), "lap times copied to clipboard");
            ShareOutcome::Copied
        }
        Err(err) => {
            tracing::warn!(%err, "clipboard write failed");
            ShareOutcome::Failed(err)
        }
    }
}

/// Writes the lap sheet to `target`. A directory target receives the default
/// file name.
pub async fn download_laps(
    records: &[LapRecord],
    target: &Path,
    layout: CsvLayout,
) -> Result<PathBuf, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoLaps);
    }
    let path = if tokio::fs::metadata(target).await.is_ok_and(|m| m.is_dir()) {
        target.join(DOWNLOAD_FILE_NAME)
    } else {
        target.to_path_buf()
    };

    tokio::fs::write(&path, to_csv(records, layout)).await?;
    tracing::info!(path = %path.display(), laps = records.len(), "lap times downloaded");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemoryClipboard {
        text: Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl Clipboard for MemoryClipboard {
        async fn write_text(&self, text: &str) -> Result<(), ExportError> {
            *self.text.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    struct DeniedClipboard;

    #[async_trait::async_trait]
    impl Clipboard for DeniedClipboard {
        async fn write_text(&self, _text: &str) -> Result<(), ExportError> {
            Err(ExportError::Clipboard("permission denied".into()))
        }
    }

    fn laps() -> Vec<LapRecord> {
        vec![LapRecord {
            index: 1,
            value_ms: 61_000,
            split_ms: 61_000,
        }]
    }

    #[tokio::test]
    async fn test_share_copies_csv() {
        let clipboard = MemoryClipboard::default();
        let outcome = share_laps(&laps(), Some(&clipboard)).await;
        assert!(matches!(outcome, ShareOutcome::Copied));
        assert_eq!(
            clipboard.text.lock().unwrap().as_deref(),
            Some("Lap Number,Time,Split\n1,01:01:00,01:01:00\n")
        );
    }

    #[tokio::test]
    async fn test_share_outcomes() {
        let clipboard = MemoryClipboard::default();
        assert!(matches!(
            share_laps(&[], Some(&clipboard)).await,
            ShareOutcome::NothingToShare
        ));
        assert!(matches!(share_laps(&laps(), None).await, ShareOutcome::Unsupported));
        assert!(matches!(
            share_laps(&laps(), Some(&DeniedClipboard)).await,
            ShareOutcome::Failed(ExportError::Clipboard(_))
        ));
    }

    #[tokio::test]
    async fn test_download_into_directory_uses_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = download_laps(&laps(), dir.path(), CsvLayout::WithSplits)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("stopwatch_lap_times.csv"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("Lap Number,Time,Split\n"));
    }

    #[tokio::test]
    async fn test_download_without_laps_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = download_laps(&[], &dir.path().join("x.csv"), CsvLayout::TimeOnly).await;
        assert!(matches!(result, Err(ExportError::NoLaps)));
    }

    #[test]
    fn test_command_clipboard_parse() {
        let clipboard = CommandClipboard::parse("xclip -selection clipboard").unwrap();
        assert_eq!(clipboard.program, "xclip");
        assert_eq!(clipboard.args, ["-selection", "clipboard"]);
        assert!(CommandClipboard::parse("").is_none());
        assert!(CommandClipboard::parse("\"unterminated").is_none());
    }
}
