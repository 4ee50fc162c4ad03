pub mod console;
pub mod driver;
pub mod models;
pub mod provisioning;
pub mod roster;
pub mod settings;
pub mod utils;

#[cfg(not(feature = "desktop"))]
mod cli;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::{mpsc, Arc};

    use log::{error, info};
    use tauri::{Emitter, Manager, RunEvent};

    use crate::{
        provisioning::{
            commands::{close_browser, get_run_state, load_roster, reveal_output, start_provisioning},
            ProvisioningController,
        },
        settings::SettingsStore,
        utils::logging::{init_logging, LogGuard, LogSinks},
    };

    pub(crate) struct AppState {
        pub(crate) provisioning: ProvisioningController,
        pub(crate) settings: Arc<SettingsStore>,
        _log_guard: LogGuard,
    }

    pub fn run() {
        let app = tauri::Builder::default()
            .plugin(tauri_plugin_opener::init())
            .setup(|app| {
                let result = (|| -> anyhow::Result<()> {
                    let app_data_dir = app
                        .path()
                        .app_data_dir()
                        .map_err(|err| anyhow::anyhow!(err))?;
                    std::fs::create_dir_all(&app_data_dir)?;

                    let settings_path = app_data_dir.join("settings.json");
                    let settings_store = Arc::new(SettingsStore::new(settings_path)?);
                    let settings = settings_store.current();

                    let (log_tx, log_rx) = mpsc::channel::<String>();
                    let log_guard = match init_logging(LogSinks {
                        file: settings.log_file.as_deref(),
                        forward: Some(log_tx.clone()),
                    }) {
                        Ok(guard) => guard,
                        Err(err) => {
                            eprintln!("logging to file disabled: {err:#}");
                            init_logging(LogSinks {
                                file: None,
                                forward: Some(log_tx),
                            })?
                        }
                    };

                    info!("PowerTag setup starting up...");

                    let controller =
                        ProvisioningController::new(app.handle().clone(), Arc::clone(&settings_store));

                    app.manage(AppState {
                        provisioning: controller,
                        settings: settings_store,
                        _log_guard: log_guard,
                    });

                    // Mirror log lines into the window's log area.
                    let handle = app.handle().clone();
                    std::thread::spawn(move || {
                        for line in log_rx {
                            if handle.emit("provisioning-log", line).is_err() {
                                break;
                            }
                        }
                    });

                    Ok(())
                })();

                result.map_err(|err| err.into())
            })
            .invoke_handler(tauri::generate_handler![
                load_roster,
                start_provisioning,
                close_browser,
                get_run_state,
                reveal_output,
            ])
            .build(tauri::generate_context!());

        let app = match app {
            Ok(app) => app,
            Err(err) => {
                eprintln!("error while building tauri application: {err}");
                return;
            }
        };

        app.run(|handle, event| {
            if let RunEvent::Exit = event {
                if let Some(state) = handle.try_state::<AppState>() {
                    let controller = state.provisioning.clone();
                    if let Err(err) = tauri::async_runtime::block_on(controller.close_browser()) {
                        error!("failed to close the browser on exit: {err:#}");
                    }
                }
            }
        });
    }
}

#[cfg(feature = "desktop")]
pub(crate) use desktop::AppState;

#[cfg_attr(all(feature = "desktop", mobile), tauri::mobile_entry_point)]
pub fn run() {
    #[cfg(feature = "desktop")]
    desktop::run();

    #[cfg(not(feature = "desktop"))]
    cli::run();
}
