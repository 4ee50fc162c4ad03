use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Fixed waits and poll bounds used while driving the console, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Implicit wait applied by the WebDriver server to every element lookup.
    pub implicit_wait_ms: u64,
    /// Bound for individual element waits (interstitial, login form, panel controls).
    pub element_wait_ms: u64,
    /// Bound for the identifier field to appear after a slot is opened.
    pub identity_wait_ms: u64,
    pub discovery_timeout_ms: u64,
    pub discovery_poll_ms: u64,
    /// Pause after opening a slot, before reading its identifier.
    pub slot_settle_ms: u64,
    /// Pause after the save action, before verification.
    pub save_settle_ms: u64,
    /// Pause after opening the real-time panel, before reading values.
    pub panel_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            implicit_wait_ms: 10_000,
            element_wait_ms: 10_000,
            identity_wait_ms: 20_000,
            discovery_timeout_ms: 120_000,
            discovery_poll_ms: 1_000,
            slot_settle_ms: 5_000,
            save_settle_ms: 3_000,
            panel_settle_ms: 5_000,
        }
    }
}

impl Timings {
    /// No settle delays and short waits, for scripted consoles.
    pub fn immediate() -> Self {
        Self {
            implicit_wait_ms: 0,
            element_wait_ms: 50,
            identity_wait_ms: 50,
            discovery_timeout_ms: 200,
            discovery_poll_ms: 10,
            slot_settle_ms: 0,
            save_settle_ms: 0,
            panel_settle_ms: 0,
        }
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn identity_wait(&self) -> Duration {
        Duration::from_millis(self.identity_wait_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn discovery_poll(&self) -> Duration {
        Duration::from_millis(self.discovery_poll_ms)
    }

    pub fn slot_settle(&self) -> Duration {
        Duration::from_millis(self.slot_settle_ms)
    }

    pub fn save_settle(&self) -> Duration {
        Duration::from_millis(self.save_settle_ms)
    }

    pub fn panel_settle(&self) -> Duration {
        Duration::from_millis(self.panel_settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerSettings {
    pub webdriver_url: String,
    pub browser: String,
    pub accept_insecure_certs: bool,
    /// Operator account used to log in; the secret is never stored.
    pub username: String,
    pub roster_path: PathBuf,
    pub output_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub timings: Timings,
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            browser: "chrome".into(),
            accept_insecure_certs: false,
            username: "SecurityAdmin".into(),
            roster_path: PathBuf::from("data/PowerTags.csv"),
            output_path: PathBuf::from(crate::roster::DEFAULT_OUTPUT),
            log_file: Some(PathBuf::from("app.log")),
            timings: Timings::default(),
        }
    }
}

impl ProvisionerSettings {
    /// Applies `POWERTAG_*` environment overrides on top of the stored values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("POWERTAG_WEBDRIVER_URL") {
            if !url.trim().is_empty() {
                self.webdriver_url = url.trim().to_string();
            }
        }

        if let Ok(output) = std::env::var("POWERTAG_OUTPUT") {
            if !output.trim().is_empty() {
                self.output_path = PathBuf::from(output.trim());
            }
        }

        let debug_mode = std::env::var("POWERTAG_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.timings.slot_settle_ms = 0;
            self.timings.save_settle_ms = 0;
            self.timings.panel_settle_ms = 0;
        }

        self
    }
}

/// Settings read once from a JSON file. A missing or malformed file yields defaults.
pub struct SettingsStore {
    data: ProvisionerSettings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                ProvisionerSettings::default()
            })
        } else {
            ProvisionerSettings::default()
        };

        Ok(Self { data })
    }

    /// Stored settings with environment overrides applied.
    pub fn current(&self) -> ProvisionerSettings {
        self.data.clone().with_env_overrides()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("powertag-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path()).unwrap();
        let settings = store.current();
        assert_eq!(settings.username, "SecurityAdmin");
        assert_eq!(settings.output_path, PathBuf::from("PowerTags_checked.csv"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path();
        fs::write(&path, r#"{ "username": "Installer", "timings": { "slot_settle_ms": 1 } }"#)
            .unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = store.current();
        assert_eq!(settings.username, "Installer");
        assert_eq!(settings.timings.discovery_timeout_ms, 120_000);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn stored_log_file_is_used() {
        let path = temp_path();
        fs::write(&path, r#"{ "log_file": "logs/powertag.log" }"#).unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.current().log_file, Some(PathBuf::from("logs/powertag.log")));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_path();
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.current().browser, "chrome");

        let _ = fs::remove_file(path);
    }
}
