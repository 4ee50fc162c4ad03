use std::{io::BufRead, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use crate::{
    driver::AutomationDriver,
    models::RunSummary,
    provisioning::{self, RunReport, RunRequest},
    settings::SettingsStore,
    utils::logging::{init_logging, LogSinks},
};

/// Configure newly discovered PowerTags through the gateway web console.
#[derive(Parser, Debug)]
#[command(name = "powertag-setup", version)]
pub struct Cli {
    /// Address of the gateway web console.
    #[arg(long)]
    pub url: String,

    /// Operator password. Prefer the environment variable over the flag.
    #[arg(long, env = "POWERTAG_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Device roster CSV; defaults to the configured roster path.
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// Where to write the checked roster; defaults to the configured output path.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "powertag-settings.json")]
    pub settings: PathBuf,

    /// Leave the browser open until Enter is pressed.
    #[arg(long)]
    pub keep_open: bool,
}

pub fn run() {
    if let Err(err) = execute(Cli::parse()) {
        error!("Configuration failed: {err:#}");
        eprintln!("Configuration failed: {err:#}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let store = SettingsStore::new(cli.settings.clone())?;
    let settings = store.current();

    let _log_guard = init_logging(LogSinks {
        file: settings.log_file.as_deref(),
        forward: None,
    })?;

    let request = RunRequest {
        url: cli.url,
        secret: cli.password,
        roster_path: cli.roster.unwrap_or_else(|| settings.roster_path.clone()),
        output_path: cli.output,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(async {
        let (session, report) = provisioning::run(&settings, &request).await?;
        print_report(&report);

        let waited = if cli.keep_open {
            wait_for_enter().await
        } else {
            Ok(())
        };

        close_after(&session, waited).await?;
        info!("Configuration successfully completed");
        Ok(())
    })
}

/// Releases the browser whatever happened while it was held open.
async fn close_after<D: AutomationDriver>(driver: &D, held: Result<()>) -> Result<()> {
    provisioning::runner::release(driver).await;
    held
}

async fn wait_for_enter() -> Result<()> {
    println!("Press Enter to close the browser.");
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
    })
    .await
    .context("failed waiting for the operator")
}

fn print_report(report: &RunReport) {
    let summary: &RunSummary = &report.summary;
    println!("Run {}", summary.run_id);
    println!("  slots visited:  {}", summary.slots_visited());
    println!("  configured:     {}", summary.configured());
    println!("  not in roster:  {}", summary.unmatched());
    println!("  abandoned:      {}", summary.abandoned());
    if let Some(reason) = &summary.halted {
        println!("  halted early:   {reason}");
    }
    println!("Checked roster written to {}", report.output_path.display());
}
