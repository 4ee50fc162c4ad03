pub mod reading;
pub mod run;

pub use reading::{ReadingResult, ReadingSnapshot};
pub use run::{RunStatus, RunSummary, SlotOutcome};
