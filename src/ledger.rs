//! The ordered list of recorded laps and its persisted form.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::format::{format_time_text, parse_time};
use crate::storage::KeyValueStore;

pub const LAPS_KEY: &str = "stopwatchLaps";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapRecord {
    /// 1-based position in the ledger.
    pub index: usize,
    /// Elapsed or remaining milliseconds at capture.
    pub value_ms: u64,
    /// Milliseconds since the previous lap.
    pub split_ms: u64,
}

impl LapRecord {
    pub fn value_text(&self) -> String {
        format_time_text(self.value_ms)
    }

    pub fn split_text(&self) -> String {
        format_time_text(self.split_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLap {
    index: usize,
    value_text: String,
    split_text: String,
}

impl From<&LapRecord> for StoredLap {
    fn from(record: &LapRecord) -> Self {
        Self {
            index: record.index,
            value_text: record.value_text(),
            split_text: record.split_text(),
        }
    }
}

pub struct LapLedger {
    records: Vec<LapRecord>,
    store: Arc<dyn KeyValueStore>,
}

impl LapLedger {
    /// Replays whatever `store` holds. Missing or unreadable data yields an
    /// empty ledger.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let records = match store.get(LAPS_KEY) {
            Ok(Some(text)) => decode(&text),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(%err, "failed to read stored laps, starting empty");
                Vec::new()
            }
        };
        if !records.is_empty() {
            tracing::debug!(count = records.len(), "restored laps");
        }
        Self { records, store }
    }

    /// Records in the order they were taken.
    pub fn records(&self) -> &[LapRecord] {
        &self.records
    }

    /// Most recent lap first.
    pub fn display_order(&self) -> impl Iterator<Item = &LapRecord> {
        self.records.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, value_ms: u64, split_ms: u64) -> LapRecord {
        let record = LapRecord {
            index: self.records.len() + 1,
            value_ms,
            split_ms,
        };
        self.records.push(record);
        self.persist();
        record
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.persist();
    }

    fn persist(&self) {
        let stored: Vec<StoredLap> = self.records.iter().map(StoredLap::from).collect();
        let result = serde_json::to_string(&stored)
            .map_err(StoreError::from)
            .and_then(|text| self.store.set(LAPS_KEY, text));
        if let Err(err) = result {
            tracing::warn!(%err, "failed to persist laps");
        }
    }
}

fn decode(text: &str) -> Vec<LapRecord> {
    let stored: Vec<StoredLap> = match serde_json::from_str(text) {
        Ok(stored) => stored,
        Err(err) => {
            tracing::warn!(%err, "stored laps are corrupt, starting empty");
            return Vec::new();
        }
    };

    stored
        .iter()
        .filter_map(|lap| Some((parse_time(&lap.value_text)?, parse_time(&lap.split_text)?)))
        .enumerate()
        .map(|(i, (value_ms, split_ms))| LapRecord {
            index: i + 1,
            value_ms,
            split_ms,
        })
        .collect()
}
