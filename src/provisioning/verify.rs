use crate::console::locators;
use crate::driver::{AutomationDriver, DriverResult, Locator};
use crate::models::{ReadingResult, ReadingSnapshot};
use crate::settings::Timings;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Power factor a correctly mounted tag must exceed.
const POWER_FACTOR_THRESHOLD: f64 = 0.5;

fn parse_reading(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Decides whether a tag's readings are right, reversed, or need an engineer.
///
/// Every entry must have been found on the panel. Phase A and the power factor
/// must be numeric; when B or C carry no number the tag is judged as single-phase.
pub fn classify(snapshot: &ReadingSnapshot) -> ReadingResult {
    let (Some(pf), Some(a), Some(b), Some(c)) = (
        snapshot.power_factor.as_deref(),
        snapshot.phase_a.as_deref(),
        snapshot.phase_b.as_deref(),
        snapshot.phase_c.as_deref(),
    ) else {
        return ReadingResult::NeedsReview;
    };

    let (Some(pf), Some(a)) = (parse_reading(pf), parse_reading(a)) else {
        return ReadingResult::NeedsReview;
    };

    match (parse_reading(b), parse_reading(c)) {
        (Some(b), Some(c)) => {
            if a > 0.0 && b > 0.0 && c > 0.0 && pf > POWER_FACTOR_THRESHOLD {
                ReadingResult::ReadingsCorrect
            } else if a < 0.0 && b < 0.0 && c < 0.0 && pf < POWER_FACTOR_THRESHOLD {
                ReadingResult::NeedsReversal
            } else {
                ReadingResult::NeedsReview
            }
        }
        _ => {
            if a > 0.0 && pf > POWER_FACTOR_THRESHOLD {
                ReadingResult::ReadingsCorrect
            } else if a < 0.0 && pf < POWER_FACTOR_THRESHOLD {
                ReadingResult::NeedsReversal
            } else {
                ReadingResult::NeedsReview
            }
        }
    }
}

async fn read_entry<D: AutomationDriver>(driver: &D, title: &str) -> DriverResult<Option<String>> {
    let entry = match driver.find(&locators::reading_entry(title)).await {
        Ok(entry) => entry,
        Err(err) if err.is_absence() => return Ok(None),
        Err(err) => return Err(err),
    };

    match driver.find_within(&entry, &locators::READING_VALUE).await {
        Ok(value) => Ok(Some(driver.text(&value).await?.trim().to_string())),
        Err(err) if err.is_absence() => Ok(None),
        Err(err) => Err(err),
    }
}

async fn click<D: AutomationDriver>(driver: &D, locator: &Locator, timings: &Timings) -> DriverResult<()> {
    let element = driver.wait_for(locator, timings.element_wait()).await?;
    driver.click(&element).await
}

/// Reads the four values shown in the real-time panel, which must already be open.
pub async fn read_snapshot<D: AutomationDriver>(driver: &D) -> DriverResult<ReadingSnapshot> {
    Ok(ReadingSnapshot {
        power_factor: read_entry(driver, locators::POWER_FACTOR_TITLE).await?,
        phase_a: read_entry(driver, locators::PHASE_A_TITLE).await?,
        phase_b: read_entry(driver, locators::PHASE_B_TITLE).await?,
        phase_c: read_entry(driver, locators::PHASE_C_TITLE).await?,
    })
}

/// Opens the real-time panel of the current device, classifies its readings and
/// goes back to the settings view. Never fails: anything unreadable is `NeedsReview`.
pub async fn check_readings<D: AutomationDriver>(driver: &D, timings: &Timings) -> ReadingResult {
    let snapshot: DriverResult<ReadingSnapshot> = async {
        click(driver, &locators::REAL_TIME_BUTTON, timings).await?;
        click(driver, &locators::REAL_TIME_SECTION, timings).await?;
        tokio::time::sleep(timings.panel_settle()).await;
        read_snapshot(driver).await
    }
    .await;

    let result = match snapshot {
        Ok(snapshot) => {
            log_info!(
                "Current readings for this PowerTag: PF={}, Pa={}, Pb={}, Pc={}",
                snapshot.power_factor.as_deref().unwrap_or("?"),
                snapshot.phase_a.as_deref().unwrap_or("?"),
                snapshot.phase_b.as_deref().unwrap_or("?"),
                snapshot.phase_c.as_deref().unwrap_or("?"),
            );
            if snapshot.power_factor.is_none()
                || snapshot.phase_a.is_none()
                || snapshot.phase_b.is_none()
                || snapshot.phase_c.is_none()
            {
                log_warn!("Some of the readings were not found on the real-time panel");
            }
            classify(&snapshot)
        }
        Err(err) => {
            log_warn!("Unable to read the real-time panel: {err}");
            ReadingResult::NeedsReview
        }
    };

    if let Err(err) = click(driver, &locators::SETTINGS_BUTTON, timings).await {
        log_warn!("Could not return to the settings view: {err}");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::fake::{FakeConsole, FakeDevice};
    use crate::provisioning::slots::DeviceSlots;

    fn three(a: &str, b: &str, c: &str, pf: &str) -> ReadingSnapshot {
        ReadingSnapshot {
            power_factor: Some(pf.into()),
            phase_a: Some(a.into()),
            phase_b: Some(b.into()),
            phase_c: Some(c.into()),
        }
    }

    #[test]
    fn boundary_cases() {
        assert_eq!(classify(&three("1", "1", "1", "0.51")), ReadingResult::ReadingsCorrect);
        assert_eq!(classify(&three("-1", "-1", "-1", "0.49")), ReadingResult::NeedsReversal);
        assert_eq!(classify(&three("1", "-1", "1", "0.6")), ReadingResult::NeedsReview);
        assert_eq!(classify(&three("2", "", "", "0.6")), ReadingResult::ReadingsCorrect);
        assert_eq!(classify(&three("-2", "", "", "0.3")), ReadingResult::NeedsReversal);
    }

    #[test]
    fn power_factor_of_exactly_half_needs_review() {
        assert_eq!(classify(&three("1", "1", "1", "0.5")), ReadingResult::NeedsReview);
        assert_eq!(classify(&three("-1", "-1", "-1", "0.5")), ReadingResult::NeedsReview);
    }

    #[test]
    fn non_numeric_required_values_need_review() {
        assert_eq!(classify(&three("n/a", "1", "1", "0.9")), ReadingResult::NeedsReview);
        assert_eq!(classify(&three("1", "1", "1", "")), ReadingResult::NeedsReview);
        assert_eq!(classify(&three("NaN", "", "", "0.9")), ReadingResult::NeedsReview);
    }

    #[test]
    fn one_missing_phase_falls_back_to_single_phase() {
        assert_eq!(classify(&three("3", "4", "-", "0.8")), ReadingResult::ReadingsCorrect);
    }

    #[test]
    fn absent_entries_need_review() {
        let mut snapshot = three("1", "1", "1", "0.9");
        snapshot.phase_c = None;
        assert_eq!(classify(&snapshot), ReadingResult::NeedsReview);
        assert_eq!(classify(&ReadingSnapshot::default()), ReadingResult::NeedsReview);
    }

    #[test]
    fn classify_is_total_over_odd_strings() {
        let samples = ["", " ", "0", "-0", "1e3", "-1e-3", "inf", "-inf", "abc", "0.5", "12,5"];
        for pf in samples {
            for a in samples {
                for b in samples {
                    let result = classify(&three(a, b, "1", pf));
                    assert!(matches!(
                        result,
                        ReadingResult::ReadingsCorrect
                            | ReadingResult::NeedsReversal
                            | ReadingResult::NeedsReview
                    ));
                }
            }
        }
    }

    #[tokio::test]
    async fn check_readings_opens_and_always_closes_the_panel() {
        let console = FakeConsole::builder()
            .device(FakeDevice::three_phase("0000AB12", "0.93", "120", "98", "101"))
            .build();
        let timings = Timings::immediate();
        DeviceSlots::new().open_next(&console).await.unwrap();

        assert_eq!(check_readings(&console, &timings).await, ReadingResult::ReadingsCorrect);
        assert_eq!(console.clicks(&locators::SETTINGS_BUTTON), 1);
    }

    #[tokio::test]
    async fn missing_panel_entries_need_review_and_still_close() {
        let console = FakeConsole::builder()
            .device(FakeDevice::without_readings("0000AB12"))
            .build();
        let timings = Timings::immediate();
        DeviceSlots::new().open_next(&console).await.unwrap();

        assert_eq!(check_readings(&console, &timings).await, ReadingResult::NeedsReview);
        assert_eq!(console.clicks(&locators::SETTINGS_BUTTON), 1);
    }

    #[tokio::test]
    async fn unopenable_panel_needs_review() {
        let console = FakeConsole::builder()
            .device(FakeDevice::three_phase("0000AB12", "0.93", "120", "98", "101"))
            .missing(locators::REAL_TIME_BUTTON)
            .build();
        let timings = Timings::immediate();
        DeviceSlots::new().open_next(&console).await.unwrap();

        assert_eq!(check_readings(&console, &timings).await, ReadingResult::NeedsReview);
        assert_eq!(console.clicks(&locators::SETTINGS_BUTTON), 1);
    }
}
