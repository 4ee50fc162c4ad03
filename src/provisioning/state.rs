use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::RunStatus;

use super::runner::RunReport;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub report: Option<RunReport>,
    pub error: Option<String>,
    /// A browser session from a finished run is still open.
    pub browser_open: bool,
}

impl RunState {
    /// Claims the run slot. Returns `false`, leaving the state untouched, while a run is active.
    pub fn begin(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == RunStatus::Running {
            return false;
        }
        *self = RunState {
            status: RunStatus::Running,
            started_at: Some(now),
            browser_open: self.browser_open,
            ..RunState::default()
        };
        true
    }

    pub fn succeed(&mut self, report: RunReport) {
        self.status = RunStatus::Succeeded;
        self.report = Some(report);
        self.browser_open = true;
    }

    pub fn fail(&mut self, message: String) {
        self.status = RunStatus::Failed;
        self.error = Some(message);
    }

    pub fn output_path(&self) -> Option<&std::path::Path> {
        self.report.as_ref().map(|report| report.output_path.as_path())
    }
}
