use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReadingResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// What happened at one device slot of the console's list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SlotOutcome {
    Configured {
        slot: usize,
        name: String,
        result: ReadingResult,
    },
    /// Discovered, but its radio ID is not in the roster.
    Unmatched { slot: usize, radio_id: String },
    /// Work for the slot stopped early; the reason is also in the log.
    Abandoned { slot: usize, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<SlotOutcome>,
    /// Set when the device list could not be walked to its end.
    pub halted: Option<String>,
}

impl RunSummary {
    pub fn new(run_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: None,
            outcomes: Vec::new(),
            halted: None,
        }
    }

    pub fn slots_visited(&self) -> usize {
        self.outcomes.len()
    }

    pub fn configured(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SlotOutcome::Configured { .. }))
            .count()
    }

    pub fn count_result(&self, wanted: ReadingResult) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| {
                matches!(outcome, SlotOutcome::Configured { result, .. } if *result == wanted)
            })
            .count()
    }

    pub fn unmatched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SlotOutcome::Unmatched { .. }))
            .count()
    }

    pub fn abandoned(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SlotOutcome::Abandoned { .. }))
            .count()
    }
}
