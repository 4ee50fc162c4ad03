use serde::Serialize;

use crate::driver::{AutomationDriver, DriverResult};
use crate::settings::Timings;
use crate::{log_error, log_info};

use super::locators;

const ENABLE_LOGS: bool = true;

pub struct Credentials<'a> {
    pub username: &'a str,
    pub secret: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DiscoveryOutcome {
    /// The status indicator left "Searching".
    Completed,
    /// Still searching when the poll ran out; the run goes on with what is listed.
    WindowClosed,
    /// The menu path to the discovery switch was not there.
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapReport {
    pub interstitial_dismissed: bool,
    pub authenticated: bool,
    pub discovery: DiscoveryOutcome,
}

/// Opens the console, logs in and runs a discovery scan.
///
/// Only a failure to load `url` (or a broken driver) is returned as an error;
/// missing page elements are logged and reported in the [`BootstrapReport`].
pub async fn open_console<D: AutomationDriver>(
    driver: &D,
    url: &str,
    credentials: &Credentials<'_>,
    timings: &Timings,
) -> DriverResult<BootstrapReport> {
    driver.navigate(url).await?;
    log_info!("Opened console at {url}");

    let interstitial_dismissed = dismiss_security_warning(driver, timings).await?;
    let authenticated = log_in(driver, credentials, timings).await?;
    let discovery = search_for_new_devices(driver, timings).await?;

    Ok(BootstrapReport {
        interstitial_dismissed,
        authenticated,
        discovery,
    })
}

/// Clicks through the browser's certificate warning if it is shown.
pub async fn dismiss_security_warning<D: AutomationDriver>(
    driver: &D,
    timings: &Timings,
) -> DriverResult<bool> {
    let result: DriverResult<()> = async {
        let details = driver
            .wait_for(&locators::DETAILS_BUTTON, timings.element_wait())
            .await?;
        driver.click(&details).await?;
        let proceed = driver
            .wait_for(&locators::PROCEED_LINK, timings.element_wait())
            .await?;
        driver.click(&proceed).await
    }
    .await;

    match result {
        Ok(()) => {
            log_info!("Security warning dismissed");
            Ok(true)
        }
        Err(err) if err.is_absence() => {
            log_info!("Security warning not found or not clickable");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

pub async fn log_in<D: AutomationDriver>(
    driver: &D,
    credentials: &Credentials<'_>,
    timings: &Timings,
) -> DriverResult<bool> {
    let result: DriverResult<()> = async {
        let username = driver
            .wait_for(&locators::USERNAME_INPUT, timings.element_wait())
            .await?;
        let password = driver.find(&locators::PASSWORD_INPUT).await?;
        let button = driver.find(&locators::LOGIN_BUTTON).await?;

        driver.send_keys(&username, credentials.username).await?;
        driver.send_keys(&password, credentials.secret).await?;
        driver.click(&button).await
    }
    .await;

    match result {
        Ok(()) => {
            log_info!("Logged in as {}", credentials.username);
            Ok(true)
        }
        Err(err) if err.is_absence() => {
            log_error!("Login elements not found: {err}");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Enables joining and waits for the scan indicator to stop reading "Searching".
pub async fn search_for_new_devices<D: AutomationDriver>(
    driver: &D,
    timings: &Timings,
) -> DriverResult<DiscoveryOutcome> {
    let navigation: DriverResult<()> = async {
        for step in [
            &locators::SETTINGS_MENU,
            &locators::WIRELESS_DEVICES_CARD,
            &locators::DISCOVERY_ENTRY,
            &locators::PERMIT_JOIN_SWITCH,
        ] {
            let element = driver.find(step).await?;
            driver.click(&element).await?;
        }
        Ok(())
    }
    .await;

    match navigation {
        Ok(()) => {}
        Err(err) if err.is_absence() => {
            log_error!("Error occurred while searching for new PowerTags: {err}");
            return Ok(DiscoveryOutcome::Unavailable);
        }
        Err(err) => return Err(err),
    }

    log_info!("Searching for new PowerTags...");
    let finished = driver
        .wait_while_text(
            &locators::DISCOVERY_STATUS,
            locators::DISCOVERY_BUSY_TEXT,
            timings.discovery_timeout(),
            timings.discovery_poll(),
        )
        .await?;

    if finished {
        log_info!("Search completed");
        Ok(DiscoveryOutcome::Completed)
    } else {
        log_info!(
            "Discovery window closed after {}s; continuing with the devices found",
            timings.discovery_timeout().as_secs()
        );
        Ok(DiscoveryOutcome::WindowClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::fake::{Action, FakeConsole};

    fn credentials() -> Credentials<'static> {
        Credentials {
            username: "SecurityAdmin",
            secret: "hunter2",
        }
    }

    #[tokio::test]
    async fn full_bootstrap_logs_in_and_waits_for_discovery() {
        let console = FakeConsole::builder()
            .with_interstitial()
            .discovery_polls_until_done(3)
            .build();

        let report = open_console(&console, "https://gateway.local", &credentials(), &Timings::immediate())
            .await
            .unwrap();

        assert!(report.interstitial_dismissed);
        assert!(report.authenticated);
        assert_eq!(report.discovery, DiscoveryOutcome::Completed);

        let actions = console.actions();
        assert_eq!(actions[0], Action::Navigate("https://gateway.local".into()));
        assert!(actions.contains(&Action::Type {
            field: locators::USERNAME_INPUT.to_string(),
            text: "SecurityAdmin".into()
        }));
        assert!(actions.contains(&Action::Type {
            field: locators::PASSWORD_INPUT.to_string(),
            text: "hunter2".into()
        }));
        assert!(actions.contains(&Action::Click(locators::PERMIT_JOIN_SWITCH.to_string())));
    }

    #[tokio::test]
    async fn missing_interstitial_is_not_an_error() {
        let console = FakeConsole::builder().build();
        let dismissed = dismiss_security_warning(&console, &Timings::immediate())
            .await
            .unwrap();
        assert!(!dismissed);
    }

    #[tokio::test]
    async fn missing_login_form_is_reported_not_raised() {
        let console = FakeConsole::builder().without_login_form().build();
        let report = open_console(&console, "https://gateway.local", &credentials(), &Timings::immediate())
            .await
            .unwrap();
        assert!(!report.authenticated);
    }

    #[tokio::test]
    async fn vanished_status_indicator_ends_the_wait() {
        let console = FakeConsole::builder()
            .discovery_never_finishes()
            .missing(locators::DISCOVERY_STATUS)
            .build();
        let mut timings = Timings::immediate();
        timings.discovery_timeout_ms = 60_000;

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            search_for_new_devices(&console, &timings),
        )
        .await
        .expect("discovery wait should return as soon as the indicator is gone")
        .unwrap();
        assert_eq!(outcome, DiscoveryOutcome::Completed);
    }

    #[tokio::test]
    async fn discovery_timeout_lets_the_run_continue() {
        let console = FakeConsole::builder().discovery_never_finishes().build();
        let outcome = search_for_new_devices(&console, &Timings::immediate())
            .await
            .unwrap();
        assert_eq!(outcome, DiscoveryOutcome::WindowClosed);
    }
}
