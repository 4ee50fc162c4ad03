use serde::{Deserialize, Serialize};

/// Outcome of checking a PowerTag's live readings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReadingResult {
    /// Every phase reads negative with a low power factor: the sensor is mounted backwards.
    NeedsReversal,
    /// Anything else that is not clearly correct; an engineer has to look at it.
    NeedsReview,
    ReadingsCorrect,
}

impl ReadingResult {
    /// Code written to the roster's `Issues` column.
    pub fn code(&self) -> i8 {
        match self {
            ReadingResult::NeedsReversal => -1,
            ReadingResult::NeedsReview => 0,
            ReadingResult::ReadingsCorrect => 1,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(ReadingResult::NeedsReversal),
            0 => Some(ReadingResult::NeedsReview),
            1 => Some(ReadingResult::ReadingsCorrect),
            _ => None,
        }
    }
}

/// Raw text of the four values shown in the real-time panel. `None` means the
/// labelled entry was not on the page at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingSnapshot {
    pub power_factor: Option<String>,
    pub phase_a: Option<String>,
    pub phase_b: Option<String>,
    pub phase_c: Option<String>,
}
