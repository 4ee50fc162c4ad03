//! Scripted in-memory console used by the tests in place of a browser.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use crate::driver::{AutomationDriver, DriverError, DriverResult, Element, Locator};
use crate::models::ReadingSnapshot;

use super::locators;

const VALUE_SUFFIX: &str = "#value";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(String),
    Click(String),
    Clear(String),
    Type { field: String, text: String },
    Select { field: String, label: String },
    Quit,
}

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub address: String,
    pub readings: ReadingSnapshot,
}

impl FakeDevice {
    pub fn three_phase(address: &str, pf: &str, a: &str, b: &str, c: &str) -> Self {
        Self {
            address: address.into(),
            readings: ReadingSnapshot {
                power_factor: Some(pf.into()),
                phase_a: Some(a.into()),
                phase_b: Some(b.into()),
                phase_c: Some(c.into()),
            },
        }
    }

    /// B and C entries are shown but carry no value.
    pub fn single_phase(address: &str, pf: &str, a: &str) -> Self {
        Self::three_phase(address, pf, a, "", "")
    }

    pub fn without_readings(address: &str) -> Self {
        Self {
            address: address.into(),
            readings: ReadingSnapshot::default(),
        }
    }
}

#[derive(Default)]
struct State {
    interstitial: bool,
    login_form: bool,
    /// `None` keeps the scan "Searching" forever.
    discovery_polls_left: Option<usize>,
    devices: Vec<FakeDevice>,
    current: Option<usize>,
    panel_open: bool,
    missing: HashSet<Locator>,
    slot_elements: HashMap<String, usize>,
    slot_lookups: Vec<usize>,
    actions: Vec<Action>,
}

pub struct FakeConsole {
    state: Mutex<State>,
}

pub struct FakeConsoleBuilder {
    state: State,
}

impl FakeConsoleBuilder {
    pub fn with_interstitial(mut self) -> Self {
        self.state.interstitial = true;
        self
    }

    pub fn without_login_form(mut self) -> Self {
        self.state.login_form = false;
        self
    }

    pub fn discovery_polls_until_done(mut self, polls: usize) -> Self {
        self.state.discovery_polls_left = Some(polls);
        self
    }

    pub fn discovery_never_finishes(mut self) -> Self {
        self.state.discovery_polls_left = None;
        self
    }

    pub fn device(mut self, device: FakeDevice) -> Self {
        self.state.devices.push(device);
        self
    }

    /// Makes `locator` absent from every page.
    pub fn missing(mut self, locator: Locator) -> Self {
        self.state.missing.insert(locator);
        self
    }

    pub fn build(self) -> FakeConsole {
        FakeConsole {
            state: Mutex::new(self.state),
        }
    }
}

impl FakeConsole {
    pub fn builder() -> FakeConsoleBuilder {
        FakeConsoleBuilder {
            state: State {
                login_form: true,
                discovery_polls_left: Some(0),
                ..State::default()
            },
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().unwrap().actions.clone()
    }

    /// Slot numbers the run tried to locate, in order.
    pub fn slot_lookups(&self) -> Vec<usize> {
        self.state.lock().unwrap().slot_lookups.clone()
    }

    pub fn typed_into(&self, field: &Locator) -> Vec<String> {
        let field = field.to_string();
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Type { field: f, text } if f == field => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self, target: &Locator) -> usize {
        let target = target.to_string();
        self.actions()
            .iter()
            .filter(|action| matches!(action, Action::Click(id) if *id == target))
            .count()
    }

    pub fn is_quit(&self) -> bool {
        self.actions().contains(&Action::Quit)
    }
}

fn reading_for(readings: &ReadingSnapshot, entry_id: &str) -> Option<Option<String>> {
    [
        (locators::POWER_FACTOR_TITLE, &readings.power_factor),
        (locators::PHASE_A_TITLE, &readings.phase_a),
        (locators::PHASE_B_TITLE, &readings.phase_b),
        (locators::PHASE_C_TITLE, &readings.phase_c),
    ]
    .into_iter()
    .find(|(title, _)| locators::reading_entry(title).to_string() == entry_id)
    .map(|(_, value)| value.clone())
}

impl State {
    fn present(&mut self, locator: &Locator) -> bool {
        if self.missing.contains(locator) {
            return false;
        }

        let form_open = self.current.is_some();
        let key = locator.to_string();

        if let Some(slot) = (1..=self.devices.len() + 8).find(|n| locators::device_slot(*n) == *locator) {
            self.slot_lookups.push(slot);
            if slot <= self.devices.len() {
                self.slot_elements.insert(key, slot - 1);
                return true;
            }
            return false;
        }

        if *locator == locators::DETAILS_BUTTON || *locator == locators::PROCEED_LINK {
            return self.interstitial;
        }
        if *locator == locators::USERNAME_INPUT
            || *locator == locators::PASSWORD_INPUT
            || *locator == locators::LOGIN_BUTTON
        {
            return self.login_form;
        }
        if [
            &locators::SETTINGS_MENU,
            &locators::WIRELESS_DEVICES_CARD,
            &locators::DISCOVERY_ENTRY,
            &locators::PERMIT_JOIN_SWITCH,
            &locators::DISCOVERY_STATUS,
        ]
        .contains(&locator)
        {
            return true;
        }
        if [
            &locators::SOURCE_ID_FIELD,
            &locators::NAME_FIELD,
            &locators::LABEL_FIELD,
            &locators::UNIT_ID_FIELD,
            &locators::CURRENT_FLOW_SELECT,
            &locators::SAVE_MENU,
            &locators::SAVE_BUTTON,
            &locators::REAL_TIME_BUTTON,
            &locators::REAL_TIME_SECTION,
            &locators::SETTINGS_BUTTON,
        ]
        .contains(&locator)
        {
            return form_open;
        }

        if self.panel_open {
            if let Some(device) = self.current.and_then(|index| self.devices.get(index)) {
                if let Some(value) = reading_for(&device.readings, &key) {
                    return value.is_some();
                }
            }
        }
        false
    }
}

impl AutomationDriver for FakeConsole {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.state
            .lock()
            .unwrap()
            .actions
            .push(Action::Navigate(url.to_string()));
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> DriverResult<Element> {
        let mut state = self.state.lock().unwrap();
        if state.present(locator) {
            Ok(Element(locator.to_string()))
        } else {
            Err(DriverError::NoSuchElement(locator.to_string()))
        }
    }

    async fn find_within(&self, parent: &Element, locator: &Locator) -> DriverResult<Element> {
        if *locator == locators::READING_VALUE {
            Ok(Element(format!("{}{VALUE_SUFFIX}", parent.0)))
        } else {
            Err(DriverError::NoSuchElement(locator.to_string()))
        }
    }

    async fn click(&self, element: &Element) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(index) = state.slot_elements.get(&element.0).copied() {
            state.current = Some(index);
            state.panel_open = false;
        } else if element.0 == locators::REAL_TIME_SECTION.to_string() {
            state.panel_open = true;
        } else if element.0 == locators::SETTINGS_BUTTON.to_string() {
            state.panel_open = false;
        }
        state.actions.push(Action::Click(element.0.clone()));
        Ok(())
    }

    async fn clear(&self, element: &Element) -> DriverResult<()> {
        self.state
            .lock()
            .unwrap()
            .actions
            .push(Action::Clear(element.0.clone()));
        Ok(())
    }

    async fn send_keys(&self, element: &Element, text: &str) -> DriverResult<()> {
        self.state.lock().unwrap().actions.push(Action::Type {
            field: element.0.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn text(&self, element: &Element) -> DriverResult<String> {
        let mut state = self.state.lock().unwrap();

        if element.0 == locators::DISCOVERY_STATUS.to_string() {
            let polls_left = state.discovery_polls_left;
            return Ok(match polls_left {
                Some(0) => "Finished".into(),
                Some(left) => {
                    state.discovery_polls_left = Some(left - 1);
                    locators::DISCOVERY_BUSY_TEXT.into()
                }
                None => locators::DISCOVERY_BUSY_TEXT.into(),
            });
        }

        if let Some(entry) = element.0.strip_suffix(VALUE_SUFFIX) {
            let device = state
                .current
                .and_then(|index| state.devices.get(index))
                .ok_or_else(|| DriverError::NoSuchElement(element.0.clone()))?;
            return reading_for(&device.readings, entry)
                .flatten()
                .map(|value| format!(" {value} "))
                .ok_or_else(|| DriverError::NoSuchElement(element.0.clone()));
        }

        Ok(String::new())
    }

    async fn attribute(&self, element: &Element, name: &str) -> DriverResult<Option<String>> {
        let state = self.state.lock().unwrap();
        if element.0 == locators::SOURCE_ID_FIELD.to_string() && name == "value" {
            return Ok(state
                .current
                .and_then(|index| state.devices.get(index))
                .map(|device| device.address.clone()));
        }
        Ok(None)
    }

    async fn select_by_label(&self, select: &Element, label: &str) -> DriverResult<()> {
        self.state.lock().unwrap().actions.push(Action::Select {
            field: select.0.clone(),
            label: label.to_string(),
        });
        Ok(())
    }

    async fn quit(&self) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.actions.contains(&Action::Quit) {
            state.actions.push(Action::Quit);
        }
        Ok(())
    }
}
