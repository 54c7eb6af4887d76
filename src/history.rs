use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::core::{ProjectionResult, Scenario};

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub recorded_at: Timestamp,
    pub scenario: Scenario,
    pub final_amount: f64,
    pub total_interest: f64,
}

/// Recent projections, newest first. Re-running identical inputs moves the
/// earlier entry to the front instead of adding a second one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(HISTORY_CAPACITY);
        History { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn record(
        &mut self,
        scenario: Scenario,
        result: &ProjectionResult,
        recorded_at: Timestamp,
    ) -> &HistoryEntry {
        self.entries.retain(|entry| entry.scenario != scenario);
        self.entries.insert(
            0,
            HistoryEntry {
                recorded_at,
                scenario,
                final_amount: result.final_amount,
                total_interest: result.total_interest,
            },
        );
        self.entries.truncate(HISTORY_CAPACITY);
        &self.entries[0]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
