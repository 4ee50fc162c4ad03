//! Where things live in the gateway's web console.

use std::borrow::Cow;

use crate::driver::Locator;

const fn id(value: &'static str) -> Locator {
    Locator::Id(Cow::Borrowed(value))
}

const fn xpath(value: &'static str) -> Locator {
    Locator::XPath(Cow::Borrowed(value))
}

// Browser certificate interstitial.
pub const DETAILS_BUTTON: Locator = id("details-button");
pub const PROCEED_LINK: Locator = id("proceed-link");

// Login form.
pub const USERNAME_INPUT: Locator = id("username");
pub const PASSWORD_INPUT: Locator = id("password");
pub const LOGIN_BUTTON: Locator = Locator::ClassName(Cow::Borrowed("login-btn"));

// Settings -> Wireless Devices -> discovery.
pub const SETTINGS_MENU: Locator = xpath(r#"//a[@routerlink="/settings"]"#);
pub const WIRELESS_DEVICES_CARD: Locator =
    xpath(r#"//app-card-menu-dumb[@cardtitle="Wireless Devices"]"#);
pub const DISCOVERY_ENTRY: Locator = xpath("//se-list-item[2]");
pub const PERMIT_JOIN_SWITCH: Locator = xpath(r#"//*[@id="switchbutton"]"#);
pub const DISCOVERY_STATUS: Locator =
    xpath(r#"//*[@id="ZigBeePermitJoin.Information_elements.disco_status"]"#);
pub const DISCOVERY_BUSY_TEXT: &str = "Searching";

const DEVICE_TREE: &str = "/html/body/se-app/app-root/app-shell/se-container/app-tab/se-container\
/se-block/se-block-content/se-list/se-container/se-list/app-generic-treeview\
/app-generic-treeview-dumb/se-list-group";

/// The `slot`-th device (1-based) in the discovered-devices tree.
pub fn device_slot(slot: usize) -> Locator {
    Locator::xpath(format!("{DEVICE_TREE}/se-block[{slot}]"))
}

// Device form.
pub const SOURCE_ID_FIELD: Locator =
    xpath(r#"//*[@id="ZigBeeGreenPowerDevice.Identification_elements.source_id.value"]"#);
pub const NAME_FIELD: Locator = xpath(r#"//*[@id="PhysicalIdentification.UserApplicationName_value"]"#);
pub const LABEL_FIELD: Locator = xpath(r#"//*[@id="ElectricalTopology.Label"]"#);
pub const UNIT_ID_FIELD: Locator =
    xpath(r#"//*[@id="Device.Component_virtual_device_elements.unit_id.value-number"]"#);
pub const CURRENT_FLOW_SELECT: Locator = id("ElectricalCharacteristics.CurrentFlow");
pub const REVERSE_OPTION: &str = "Reverse";

// Floating action button: the menu toggle sits in the shadow root, save is a light-DOM child.
pub const SAVE_MENU: Locator = Locator::Shadow {
    host: Cow::Borrowed("se-fab"),
    inner: Cow::Borrowed("se-button"),
};
pub const SAVE_BUTTON: Locator = Locator::Css(Cow::Borrowed(r#"se-fab se-button[icon="action_save"]"#));

// Real-time readings panel.
pub const REAL_TIME_BUTTON: Locator = xpath(r#"//*[@id="real-time-button"]"#);
pub const REAL_TIME_SECTION: Locator = xpath(
    "/html/body/se-app/app-root/app-shell/se-container/app-real-time/se-container/se-block\
/se-block-content/div/div[1]/div[2]",
);
pub const SETTINGS_BUTTON: Locator = xpath(r#"//*[@id="settings-button"]"#);
pub const READING_VALUE: Locator = xpath("./following-sibling::se-table-item");

pub const POWER_FACTOR_TITLE: &str = "Total power factor";
pub const PHASE_A_TITLE: &str = "Active power A";
pub const PHASE_B_TITLE: &str = "Active power B";
pub const PHASE_C_TITLE: &str = "Active power C";

/// The labelled entry whose next sibling holds the value for `title`.
pub fn reading_entry(title: &str) -> Locator {
    Locator::xpath(format!("//se-table-item[@title='{title}']"))
}
