pub mod orchestrator;
pub mod runner;
pub mod slots;
pub mod state;
pub mod verify;

#[cfg(feature = "desktop")]
pub(crate) mod commands;
#[cfg(feature = "desktop")]
pub mod controller;

pub use orchestrator::Provisioner;
pub use runner::{run, RunReport, RunRequest};
pub use slots::DeviceSlots;
pub use state::RunState;
pub use verify::{check_readings, classify};

#[cfg(feature = "desktop")]
pub use controller::ProvisioningController;
