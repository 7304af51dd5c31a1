//! Webview shell. Commands forward to the controller; state changes come
//! back to the page as events.

mod commands;

use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};

use crate::{
    api::HttpBackend,
    config::StudyConfig,
    experiment::{ExperimentController, ExperimentSnapshot, PhaseObserver},
    timer::CountdownSnapshot,
    utils::logging,
};

use commands::{
    accept_consent, accept_internet_use, check_backend, continue_instructions, dismiss_error,
    edit_prompt, get_experiment_state, open_completion_redirect, rate_image, select_prompt,
    submit_participant_id, submit_prompts, submit_ratings, submit_survey,
};

pub const PHASE_CHANGED_EVENT: &str = "experiment-phase-changed";
pub const COUNTDOWN_TICK_EVENT: &str = "countdown-tick";

pub(crate) struct AppState {
    pub(crate) experiment: ExperimentController,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct CountdownTickEvent {
    remaining_ms: u64,
    warning: bool,
}

struct AppHandleObserver {
    app_handle: AppHandle,
}

impl PhaseObserver for AppHandleObserver {
    fn state_changed(&self, snapshot: &ExperimentSnapshot) {
        if let Err(err) = self.app_handle.emit(PHASE_CHANGED_EVENT, snapshot.clone()) {
            log::warn!("failed to emit {PHASE_CHANGED_EVENT}: {err}");
        }
    }

    fn countdown_tick(&self, countdown: &CountdownSnapshot) {
        let payload = CountdownTickEvent {
            remaining_ms: countdown.remaining_ms,
            warning: countdown.warning,
        };
        let _ = self.app_handle.emit(COUNTDOWN_TICK_EVENT, payload);
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    logging::init();
    log::info!("Prompt study starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let config = StudyConfig::load(None)?;
                log::info!("study backend at {}", config.api_base_url);

                let backend = HttpBackend::new(&config.api_base_url, config.request_timeout())?;
                let observer = Arc::new(AppHandleObserver {
                    app_handle: app.handle().clone(),
                });
                let experiment = ExperimentController::new(config, Arc::new(backend), observer)?;

                app.manage(AppState { experiment });
                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_experiment_state,
            submit_participant_id,
            accept_consent,
            accept_internet_use,
            submit_survey,
            continue_instructions,
            edit_prompt,
            select_prompt,
            submit_prompts,
            rate_image,
            submit_ratings,
            dismiss_error,
            check_backend,
            open_completion_redirect,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
