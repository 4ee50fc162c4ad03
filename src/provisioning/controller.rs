use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{error, info};
use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tokio::sync::Mutex;

use crate::{driver::WebDriverSession, settings::SettingsStore};

use super::runner::{self, RunReport, RunRequest};
use super::state::RunState;

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct RunFinishedEvent {
    success: bool,
    message: String,
    report: Option<RunReport>,
}

/// Runs provisioning off the UI thread and keeps the resulting browser session
/// until the operator closes it.
#[derive(Clone)]
pub struct ProvisioningController {
    state: Arc<Mutex<RunState>>,
    session: Arc<Mutex<Option<WebDriverSession>>>,
    settings: Arc<SettingsStore>,
    app_handle: AppHandle,
}

impl ProvisioningController {
    pub fn new(app_handle: AppHandle, settings: Arc<SettingsStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::default())),
            session: Arc::new(Mutex::new(None)),
            settings,
            app_handle,
        }
    }

    pub async fn get_state(&self) -> RunState {
        self.state.lock().await.clone()
    }

    pub async fn output_path(&self) -> Option<PathBuf> {
        self.state.lock().await.output_path().map(PathBuf::from)
    }

    pub async fn start(
        &self,
        url: String,
        password: String,
        roster_path: Option<String>,
    ) -> Result<RunState> {
        if url.trim().is_empty() {
            return Err(anyhow!("a console URL is required"));
        }

        if !self.state.lock().await.begin(Utc::now()) {
            return Err(anyhow!("a provisioning run is already active"));
        }

        // Only one browser session at a time.
        self.release_session().await;
        self.emit_state_changed().await;

        let settings = self.settings.current();
        let request = RunRequest {
            url: url.trim().to_string(),
            secret: password,
            roster_path: roster_path
                .map(PathBuf::from)
                .unwrap_or_else(|| settings.roster_path.clone()),
            output_path: None,
        };

        let controller = self.clone();
        tokio::spawn(async move {
            let outcome = runner::run(&settings, &request).await;
            controller.finish(outcome).await;
        });

        Ok(self.get_state().await)
    }

    async fn finish(&self, outcome: Result<(WebDriverSession, RunReport)>) {
        let event = match outcome {
            Ok((session, report)) => {
                info!("Configuration successfully completed");
                *self.session.lock().await = Some(session);
                self.state.lock().await.succeed(report.clone());
                RunFinishedEvent {
                    success: true,
                    message: "Configuration successfully completed.".into(),
                    report: Some(report),
                }
            }
            Err(err) => {
                error!("Configuration failed: {err:#}");
                self.state.lock().await.fail(format!("{err:#}"));
                RunFinishedEvent {
                    success: false,
                    message: format!("Configuration failed: {err:#}"),
                    report: None,
                }
            }
        };

        self.emit_state_changed().await;
        if let Err(err) = self.app_handle.emit("provisioning-finished", event) {
            error!("failed to emit provisioning-finished: {err}");
        }
    }

    /// Quits the browser kept open by the last successful run, if any.
    pub async fn close_browser(&self) -> Result<()> {
        if self.release_session().await {
            self.emit_state_changed().await;
        }
        Ok(())
    }

    async fn release_session(&self) -> bool {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => {
                runner::release(&session).await;
                self.state.lock().await.browser_open = false;
                true
            }
            None => false,
        }
    }

    async fn emit_state_changed(&self) {
        let state = self.state.lock().await.clone();
        let _ = self.app_handle.emit("provisioning-state-changed", state);
    }
}
