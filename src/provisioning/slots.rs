use crate::console::locators;
use crate::driver::{AutomationDriver, DriverResult};

/// Walks the discovered-devices list one position at a time.
///
/// Each call opens the next slot; the first position with no element ends the
/// sequence. `reset` starts over from the top of the list.
#[derive(Debug, Clone)]
pub struct DeviceSlots {
    next: usize,
    exhausted: bool,
}

impl Default for DeviceSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSlots {
    pub fn new() -> Self {
        Self {
            next: 1,
            exhausted: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Slots handed out so far.
    pub fn opened(&self) -> usize {
        if self.exhausted {
            self.next - 2
        } else {
            self.next - 1
        }
    }

    /// Opens the next device and returns its 1-based slot, or `None` at the end of the list.
    pub async fn open_next<D: AutomationDriver>(&mut self, driver: &D) -> DriverResult<Option<usize>> {
        if self.exhausted {
            return Ok(None);
        }

        let slot = self.next;
        self.next += 1;

        let opened = async {
            let element = driver.find(&locators::device_slot(slot)).await?;
            driver.click(&element).await
        }
        .await;

        match opened {
            Ok(()) => Ok(Some(slot)),
            Err(err) if err.is_no_such_element() => {
                self.exhausted = true;
                Ok(None)
            }
            Err(err) => {
                self.exhausted = true;
                Err(err)
            }
        }
    }
}
