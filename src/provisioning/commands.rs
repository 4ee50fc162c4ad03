use std::path::PathBuf;

use tauri::State;
use tauri_plugin_opener::OpenerExt;

use crate::{
    provisioning::{ProvisioningController, RunState},
    roster::{DeviceRecord, Roster},
    AppState,
};

fn controller_from_state(state: &State<'_, AppState>) -> ProvisioningController {
    state.provisioning.clone()
}

#[tauri::command]
pub async fn get_run_state(state: State<'_, AppState>) -> Result<RunState, String> {
    let controller = controller_from_state(&state);
    Ok(controller.get_state().await)
}

#[tauri::command]
pub async fn start_provisioning(
    state: State<'_, AppState>,
    url: String,
    password: String,
    roster_path: Option<String>,
) -> Result<RunState, String> {
    let controller = controller_from_state(&state);
    controller
        .start(url, password, roster_path)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn close_browser(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.close_browser().await.map_err(|e| e.to_string())
}

/// Roster preview for the "Load CSV" button.
#[tauri::command]
pub async fn load_roster(
    state: State<'_, AppState>,
    path: Option<String>,
) -> Result<Vec<DeviceRecord>, String> {
    let path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| state.settings.current().roster_path);
    Roster::load(&path)
        .map(|roster| roster.records().to_vec())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reveal_output(
    state: State<'_, AppState>,
    app_handle: tauri::AppHandle,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    let path = controller
        .output_path()
        .await
        .ok_or_else(|| "no checked roster has been written yet".to_string())?;
    app_handle
        .opener()
        .open_path(path.to_string_lossy(), None::<&str>)
        .map_err(|e| e.to_string())
}
