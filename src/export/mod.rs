pub mod csv;
pub mod share;

pub use csv::{CsvLayout, DOWNLOAD_FILE_NAME, ImportedLap, parse_csv, to_csv};
pub use share::{Clipboard, CommandClipboard, ShareOutcome, download_laps, share_laps};
