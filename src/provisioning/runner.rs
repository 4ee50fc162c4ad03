use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::console::{open_console, BootstrapReport, Credentials};
use crate::driver::{AutomationDriver, WebDriverSession};
use crate::models::{ReadingResult, RunSummary};
use crate::roster::Roster;
use crate::settings::ProvisionerSettings;

use super::orchestrator::Provisioner;

/// What the operator asked for. The secret is only held for the duration of the run.
#[derive(Clone)]
pub struct RunRequest {
    pub url: String,
    pub secret: String,
    pub roster_path: PathBuf,
    /// Falls back to the configured output path.
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub bootstrap: BootstrapReport,
    pub summary: RunSummary,
    pub output_path: PathBuf,
}

/// Loads the roster, starts a browser session and provisions every discovered tag.
///
/// On success the live session is handed back so the operator can look at the
/// console before closing it. On failure the session is already closed.
pub async fn run(
    settings: &ProvisionerSettings,
    request: &RunRequest,
) -> Result<(WebDriverSession, RunReport)> {
    let mut roster = Roster::load(&request.roster_path)
        .context("Failed to load PowerTag data from file")?;

    let session = WebDriverSession::connect(settings)
        .await
        .context("failed to start a browser session")?;

    let report = execute_or_release(&session, &mut roster, request, settings).await?;
    Ok((session, report))
}

/// [`execute`], closing the driver's session if anything fails.
pub async fn execute_or_release<D: AutomationDriver>(
    driver: &D,
    roster: &mut Roster,
    request: &RunRequest,
    settings: &ProvisionerSettings,
) -> Result<RunReport> {
    match execute(driver, roster, request, settings).await {
        Ok(report) => Ok(report),
        Err(err) => {
            release(driver).await;
            Err(err)
        }
    }
}

/// Bootstraps the console, runs the provisioning loop and writes the roster back.
pub async fn execute<D: AutomationDriver>(
    driver: &D,
    roster: &mut Roster,
    request: &RunRequest,
    settings: &ProvisionerSettings,
) -> Result<RunReport> {
    let credentials = Credentials {
        username: &settings.username,
        secret: &request.secret,
    };

    let bootstrap = open_console(driver, &request.url, &credentials, &settings.timings)
        .await
        .with_context(|| format!("failed to open the console at {}", request.url))?;

    let summary = Provisioner::new(driver, roster, &settings.timings)
        .run()
        .await;

    let destination = request
        .output_path
        .clone()
        .unwrap_or_else(|| settings.output_path.clone());
    let output_path = roster
        .persist(Some(&destination))
        .context("failed to save the checked roster")?;

    info!(
        "Run {} finished: {} correct, {} reversed, {} to review",
        summary.run_id,
        summary.count_result(ReadingResult::ReadingsCorrect),
        summary.count_result(ReadingResult::NeedsReversal),
        summary.count_result(ReadingResult::NeedsReview)
    );

    Ok(RunReport {
        bootstrap,
        summary,
        output_path,
    })
}

pub async fn release<D: AutomationDriver>(driver: &D) {
    if let Err(err) = driver.quit().await {
        warn!("Failed to close the browser session: {err}");
    }
}
