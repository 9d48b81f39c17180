//! Lap sheets as CSV text, in both directions.

use crate::format::parse_time;
use crate::ledger::LapRecord;

pub const DOWNLOAD_FILE_NAME: &str = "stopwatch_lap_times.csv";

const HEADER_WITH_SPLITS: &str = "Lap Number,Time,Split";
const HEADER_TIME_ONLY: &str = "Lap Number,Time";
const SPLIT_PREFIX: &str = "Split: ";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    #[default]
    WithSplits,
    TimeOnly,
}

/// Renders `records` in the order given, one line per lap, each line
/// terminated by `\n`.
pub fn to_csv(records: &[LapRecord], layout: CsvLayout) -> String {
    let header = match layout {
        CsvLayout::WithSplits => HEADER_WITH_SPLITS,
        CsvLayout::TimeOnly => HEADER_TIME_ONLY,
    };
    let mut text = String::with_capacity(header.len() + 1 + records.len() * 24);
    text.push_str(header);
    text.push('\n');

    for record in records {
        let line = match layout {
            CsvLayout::WithSplits => format!(
                "{},{},{}\n",
                record.index,
                record.value_text(),
                record.split_text()
            ),
            CsvLayout::TimeOnly => format!("{},{}\n", record.index, record.value_text()),
        };
        text.push_str(&line);
    }
    text
}

/// A well-formed data row of an imported sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedLap {
    pub value_ms: u64,
    pub split_ms: u64,
}

/// Parses every data row after the header. Rows lacking a lap, time or split
/// field, or whose times do not parse, are skipped.
pub fn parse_csv(text: &str) -> Vec<ImportedLap> {
    text.lines().skip(1).filter_map(parse_row).collect()
}

fn parse_row(line: &str) -> Option<ImportedLap> {
    let mut fields = line.split(',').map(unquote);
    let lap = fields.next()?;
    let time = fields.next()?;
    let split = fields.next()?;
    if lap.is_empty() || time.is_empty() || split.is_empty() {
        return None;
    }
    let split = split.strip_prefix(SPLIT_PREFIX).unwrap_or(split);

    Some(ImportedLap {
        value_ms: parse_time(time)?,
        split_ms: parse_time(split)?,
    })
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}
