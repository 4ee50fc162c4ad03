use chrono::Utc;
use tokio::time::sleep;
use uuid::Uuid;

use crate::console::locators;
use crate::driver::{AutomationDriver, DriverResult, Locator};
use crate::models::{ReadingResult, RunSummary, SlotOutcome};
use crate::roster::{DeviceRecord, Roster, MOUNTED_ATTENTION, MOUNTED_OK, MOUNTED_REVERSAL_FAILED};
use crate::settings::Timings;
use crate::{log_error, log_info, log_warn};

use super::slots::DeviceSlots;
use super::verify::check_readings;

const ENABLE_LOGS: bool = true;

/// Number of trailing characters of the console's source address used as the radio ID.
const RADIO_ID_LEN: usize = 4;

/// Walks every discovered device, configures the ones in the roster and records
/// how their readings look.
pub struct Provisioner<'a, D> {
    driver: &'a D,
    roster: &'a mut Roster,
    timings: &'a Timings,
}

fn trailing_chars(value: &str, count: usize) -> String {
    let total = value.chars().count();
    value.chars().skip(total.saturating_sub(count)).collect()
}

impl<'a, D: AutomationDriver> Provisioner<'a, D> {
    pub fn new(driver: &'a D, roster: &'a mut Roster, timings: &'a Timings) -> Self {
        Self {
            driver,
            roster,
            timings,
        }
    }

    /// Processes slots until the list runs out. The roster is left for the caller to persist.
    pub async fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::new(Uuid::new_v4().to_string(), Utc::now());
        let mut slots = DeviceSlots::new();

        loop {
            let slot = match slots.open_next(self.driver).await {
                Ok(Some(slot)) => slot,
                Ok(None) => break,
                Err(err) => {
                    log_error!("Stopping after slot {}: {err}", slots.opened());
                    summary.halted = Some(err.to_string());
                    break;
                }
            };

            let outcome = match self.process_slot(slot).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    log_warn!("Slot {slot}: {err}; moving on to the next device");
                    SlotOutcome::Abandoned {
                        slot,
                        reason: err.to_string(),
                    }
                }
            };
            summary.outcomes.push(outcome);
        }

        summary.finished_at = Some(Utc::now());
        log_info!(
            "Adding {} PowerTags has been completed ({} configured, {} unmatched, {} abandoned)",
            summary.slots_visited(),
            summary.configured(),
            summary.unmatched(),
            summary.abandoned()
        );
        summary
    }

    async fn process_slot(&mut self, slot: usize) -> DriverResult<SlotOutcome> {
        sleep(self.timings.slot_settle()).await;

        let Some(radio_id) = self.read_radio_id().await? else {
            return Ok(SlotOutcome::Abandoned {
                slot,
                reason: "source identifier is empty".into(),
            });
        };
        log_info!("A PowerTag with radio ID {radio_id} is currently being configured");

        let Some(record) = self.roster.lookup(&radio_id).cloned() else {
            log_info!("Slot {slot}: radio ID {radio_id} is not in the roster, leaving it as is");
            return Ok(SlotOutcome::Unmatched { slot, radio_id });
        };

        if record.name.is_empty() || record.label.is_empty() {
            log_warn!("Slot {slot}: roster entry for radio ID {radio_id} has no name or fuse label, skipping it");
            return Ok(SlotOutcome::Abandoned {
                slot,
                reason: format!("roster entry for {radio_id} has no name or fuse label"),
            });
        }

        self.write_fields(&record).await?;
        self.save().await?;
        log_info!(
            "PowerTag {} : {} has been configured correctly",
            record.name,
            record.label
        );
        self.roster.set_mounted_status(&record.name, MOUNTED_OK);

        sleep(self.timings.save_settle()).await;

        let result = check_readings(self.driver, self.timings).await;
        self.roster.set_issue_code(&record.name, result);

        match result {
            ReadingResult::ReadingsCorrect => {
                log_info!("{}: Correct readings", record.name);
            }
            ReadingResult::NeedsReview => {
                self.roster.set_mounted_status(&record.name, MOUNTED_ATTENTION);
                log_warn!("{}: {MOUNTED_ATTENTION}", record.name);
            }
            ReadingResult::NeedsReversal => match self.reverse_current_flow().await {
                Ok(()) => {
                    log_warn!("{}: The direction of current flow has been changed", record.name);
                    self.roster.set_mounted_status(&record.name, MOUNTED_OK);
                }
                Err(err) => {
                    log_warn!("{}: could not reverse current flow: {err}", record.name);
                    self.roster.set_mounted_status(&record.name, MOUNTED_REVERSAL_FAILED);
                }
            },
        }

        Ok(SlotOutcome::Configured {
            slot,
            name: record.name,
            result,
        })
    }

    async fn read_radio_id(&self) -> DriverResult<Option<String>> {
        let field = self
            .driver
            .wait_for(&locators::SOURCE_ID_FIELD, self.timings.identity_wait())
            .await?;
        let address = self.driver.attribute(&field, "value").await?;

        Ok(address
            .map(|address| address.trim().to_string())
            .filter(|address| !address.is_empty())
            .map(|address| trailing_chars(&address, RADIO_ID_LEN)))
    }

    async fn fill(&self, locator: &Locator, value: &str) -> DriverResult<()> {
        let field = self.driver.find(locator).await?;
        self.driver.clear(&field).await?;
        self.driver.send_keys(&field, value).await
    }

    async fn write_fields(&self, record: &DeviceRecord) -> DriverResult<()> {
        self.fill(&locators::NAME_FIELD, &record.name).await?;
        self.fill(&locators::LABEL_FIELD, &record.label).await?;
        self.fill(&locators::UNIT_ID_FIELD, &record.unit_id()).await
    }

    /// Opens the floating action menu and presses save.
    async fn save(&self) -> DriverResult<()> {
        let menu = self.driver.find(&locators::SAVE_MENU).await?;
        self.driver.click(&menu).await?;
        let save = self.driver.find(&locators::SAVE_BUTTON).await?;
        self.driver.click(&save).await
    }

    async fn reverse_current_flow(&self) -> DriverResult<()> {
        let select = self
            .driver
            .wait_for(&locators::CURRENT_FLOW_SELECT, self.timings.element_wait())
            .await?;
        self.driver
            .select_by_label(&select, locators::REVERSE_OPTION)
            .await?;
        self.save().await
    }
}
