use tauri::State;
use tauri_plugin_opener::OpenerExt;

use crate::{
    experiment::{ExperimentController, ExperimentSnapshot},
    models::{RatingDimension, SurveyForm},
};

use super::AppState;

fn controller_from_state(state: &State<'_, AppState>) -> ExperimentController {
    state.experiment.clone()
}

#[tauri::command]
pub async fn get_experiment_state(state: State<'_, AppState>) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.snapshot().await)
}

#[tauri::command]
pub async fn submit_participant_id(
    state: State<'_, AppState>,
    participant_id: String,
) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller
        .submit_participant_id(&participant_id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn accept_consent(state: State<'_, AppState>) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller.accept_consent().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn accept_internet_use(state: State<'_, AppState>) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller
        .accept_internet_use()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn submit_survey(
    state: State<'_, AppState>,
    survey: SurveyForm,
) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller
        .submit_survey(survey)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn continue_instructions(state: State<'_, AppState>) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller
        .continue_instructions()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn edit_prompt(
    state: State<'_, AppState>,
    index: usize,
    text: String,
) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller
        .edit_prompt(index, &text)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn select_prompt(
    state: State<'_, AppState>,
    prompt: String,
) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller
        .select_prompt(&prompt)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn submit_prompts(state: State<'_, AppState>) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller.submit_prompts().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn rate_image(
    state: State<'_, AppState>,
    index: usize,
    dimension: RatingDimension,
    value: u8,
) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller
        .rate_image(index, dimension, value)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn submit_ratings(state: State<'_, AppState>) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    controller.submit_ratings().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn dismiss_error(state: State<'_, AppState>) -> Result<ExperimentSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.dismiss_error().await)
}

#[tauri::command]
pub async fn check_backend(state: State<'_, AppState>) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    controller.check_backend().await.map_err(|e| e.to_string())
}

/// Sends the participant back to the recruitment platform.
#[tauri::command]
pub async fn open_completion_redirect(
    app: tauri::AppHandle,
    state: State<'_, AppState>,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    let url = controller
        .completion_redirect()
        .await
        .ok_or_else(|| "the study is not complete yet".to_string())?;
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| e.to_string())
}
