//! Millisecond durations rendered as `MM:SS:HH` readouts and analogue faces.

use std::fmt;

const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;
const MS_PER_HUNDREDTH: u64 = 10;

/// Zero-padded digital readout. Minutes are not wrapped into hours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readout {
    pub minutes: String,
    pub seconds: String,
    pub hundredths: String,
}

impl Readout {
    pub fn zero() -> Self {
        format_time(0)
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.minutes, self.seconds, self.hundredths)
    }
}

/// Analogue representation: how far the sweep has travelled through the
/// current minute, plus the `MM:SS` label drawn in the middle of the face.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockFace {
    pub fraction_of_minute: f64,
    pub label: String,
}

impl ClockFace {
    pub fn empty() -> Self {
        clock_face(0)
    }
}

pub fn format_time(total_ms: u64) -> Readout {
    let minutes = total_ms / MS_PER_MINUTE;
    let seconds = (total_ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let hundredths = (total_ms % MS_PER_SECOND) / MS_PER_HUNDREDTH;

    Readout {
        minutes: format!("{minutes:02}"),
        seconds: format!("{seconds:02}"),
        hundredths: format!("{hundredths:02}"),
    }
}

/// `MM:SS:HH` text of `total_ms`.
pub fn format_time_text(total_ms: u64) -> String {
    format_time(total_ms).to_string()
}

pub fn clock_face(total_ms: u64) -> ClockFace {
    let truncated = total_ms - total_ms % MS_PER_HUNDREDTH;
    let fraction_of_minute = (truncated % MS_PER_MINUTE) as f64 / MS_PER_MINUTE as f64;
    let readout = format_time(total_ms);

    ClockFace {
        fraction_of_minute,
        label: format!("{}:{}", readout.minutes, readout.seconds),
    }
}

/// Parses `M+:SS:HH` back into milliseconds. Surrounding whitespace and double
/// quotes are ignored. Seconds must be below 60 and hundredths below 100.
pub fn parse_time(text: &str) -> Option<u64> {
    let text = text.trim().trim_matches('"').trim();
    let mut fields = text.split(':');
    let minutes = parse_field(fields.next()?)?;
    let seconds = parse_field(fields.next()?)?;
    let hundredths = parse_field(fields.next()?)?;
    if fields.next().is_some() || seconds >= 60 || hundredths >= 100 {
        return None;
    }

    minutes
        .checked_mul(MS_PER_MINUTE)?
        .checked_add(seconds * MS_PER_SECOND + hundredths * MS_PER_HUNDREDTH)
}

fn parse_field(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
