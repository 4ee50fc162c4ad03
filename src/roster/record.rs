use serde::{Deserialize, Serialize};

use crate::models::ReadingResult;

/// Mounted status written once a device is configured and its readings look right.
pub const MOUNTED_OK: &str = "OK";

/// Mounted status written when the readings need an engineer.
pub const MOUNTED_ATTENTION: &str = "Attention, check the readings!";

/// Mounted status written when the readings call for a reversal that could not be applied.
pub const MOUNTED_REVERSAL_FAILED: &str = "Attention, current flow could not be reversed!";

/// One PowerTag the operator expects to find on site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Unique display name, e.g. `PT-Q1-07`.
    pub name: String,
    /// Last four characters of the device's radio address; the join key.
    pub radio_id: String,
    /// Fuse designation applied as the console label.
    pub label: String,
    pub mounted_status: Option<String>,
    pub issue_code: Option<ReadingResult>,
}

impl DeviceRecord {
    pub fn new(
        name: impl Into<String>,
        radio_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            radio_id: radio_id.into(),
            label: label.into(),
            mounted_status: None,
            issue_code: None,
        }
    }

    /// Short unit identifier derived from the last two characters of the name.
    pub fn unit_id(&self) -> String {
        let count = self.name.chars().count();
        self.name.chars().skip(count.saturating_sub(2)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_id_takes_last_two_characters() {
        assert_eq!(DeviceRecord::new("PT-Q1-07", "1A2B", "F1").unit_id(), "07");
        assert_eq!(DeviceRecord::new("7", "1A2B", "F1").unit_id(), "7");
        assert_eq!(DeviceRecord::new("Zähler-ü9", "1A2B", "F1").unit_id(), "ü9");
    }
}
