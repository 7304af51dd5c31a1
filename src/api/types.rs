use serde::{Deserialize, Serialize};

use crate::{
    models::{Condition, ConditionOrder, GeneratedImage, Survey},
    timing::TimingRecord,
};

/// Body of `POST /api/save-survey`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveySubmission {
    pub participant_id: String,
    pub survey: Survey,
    pub timestamp: String,
}

/// Body of `POST /api/save-prompts`.
///
/// A participant who typed nothing is still recorded: `prompts` is empty,
/// `selectedPrompt` is null and `noResponse` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptSubmission {
    pub participant_id: String,
    pub trial_index: usize,
    pub condition: Condition,
    pub theme: String,
    pub prompts: Vec<String>,
    pub selected_prompt: Option<String>,
    pub is_practice: bool,
    pub condition_order: ConditionOrder,
    pub timing_data: TimingRecord,
    pub no_response: bool,
    pub timestamp: String,
}

/// One element of the `POST /api/save-ratings` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmission {
    pub participant_id: String,
    pub trial_index: usize,
    pub creativity_rating: u8,
    pub intention_rating: u8,
    pub theme: String,
    pub condition: Condition,
    pub prompt: String,
    pub timestamp: String,
}

/// Body of `POST /api/save-timing`, sent whenever a page is left.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageTiming {
    pub participant_id: String,
    pub page: String,
    /// Seconds spent on the page.
    pub duration: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Ready,
    Pending,
    NoTrials,
    AllFailed,
    Unrecognized(String),
}

impl From<&str> for GenerationStatus {
    fn from(value: &str) -> Self {
        match value {
            "ready" => GenerationStatus::Ready,
            "pending" => GenerationStatus::Pending,
            "no_trials" => GenerationStatus::NoTrials,
            "all_failed" => GenerationStatus::AllFailed,
            other => GenerationStatus::Unrecognized(other.to_string()),
        }
    }
}

/// Reply of `GET /api/check-generation-status/{participantId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatusResponse {
    pub status: String,
    #[serde(default)]
    pub completed_trials: Option<u32>,
}

impl GenerationStatusResponse {
    pub fn status(&self) -> GenerationStatus {
        GenerationStatus::from(self.status.as_str())
    }
}

/// Reply of `GET /api/get-all-images/{participantId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImagesResponse {
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
}
