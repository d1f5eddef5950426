use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 15;

/// A past city search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub city: String,
    pub timestamp: String,
    pub date: String,
    pub time: String,
}

impl HistoryEntry {
    pub fn new(city: impl Into<String>, at: NaiveDateTime) -> Self {
        Self {
            city: city.into(),
            timestamp: at.format("%Y-%m-%d %I:%M:%S %p").to_string(),
            date: at.format("%B %d, %Y").to_string(),
            time: at.format("%I:%M %p").to_string(),
        }
    }
}

/// Recent searches, most recent first, one entry per city (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistory {
    entries: Vec<HistoryEntry>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `city` to the front and drops whatever falls past `limit`.
    pub fn record(&mut self, city: &str, at: NaiveDateTime, limit: usize) {
        let needle = city.to_lowercase();
        self.entries.retain(|e| e.city.to_lowercase() != needle);
        self.entries.insert(0, HistoryEntry::new(city, at));
        self.entries.truncate(limit);
    }

    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
