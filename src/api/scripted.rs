use std::{
    collections::VecDeque,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{error::BackendError, models::GeneratedImage};

use super::{
    ExperimentBackend, GenerationStatusResponse, PageTiming, PromptSubmission, RatingSubmission,
    SurveySubmission,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Survey(SurveySubmission),
    Prompts(PromptSubmission),
    Status(String),
    Images(String),
    Ratings(Vec<RatingSubmission>),
    Completion(String),
    Timing(PageTiming),
    Health,
}

/// In-memory backend that records every call and replays scripted replies.
#[derive(Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<Call>>,
    statuses: Mutex<VecDeque<Result<GenerationStatusResponse, BackendError>>>,
    images: Mutex<Option<Result<Vec<GeneratedImage>, BackendError>>>,
    next_save_failure: Mutex<Option<BackendError>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, status: &str) {
        self.statuses.lock().unwrap().push_back(Ok(GenerationStatusResponse {
            status: status.to_string(),
            completed_trials: None,
        }));
    }

    pub fn push_status_error(&self, err: BackendError) {
        self.statuses.lock().unwrap().push_back(Err(err));
    }

    pub fn set_images(&self, images: Result<Vec<GeneratedImage>, BackendError>) {
        *self.images.lock().unwrap() = Some(images);
    }

    /// The next survey, prompt or rating save fails with `err`.
    pub fn fail_next_save(&self, err: BackendError) {
        *self.next_save_failure.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Status(_)))
            .count()
    }

    pub fn prompt_submissions(&self) -> Vec<PromptSubmission> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Prompts(submission) => Some(submission),
                _ => None,
            })
            .collect()
    }

    pub fn page_timings(&self) -> Vec<PageTiming> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Timing(timing) => Some(timing),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn save_outcome(&self) -> Result<(), BackendError> {
        match self.next_save_failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExperimentBackend for ScriptedBackend {
    async fn save_survey(&self, submission: &SurveySubmission) -> Result<(), BackendError> {
        self.save_outcome()?;
        self.record(Call::Survey(submission.clone()));
        Ok(())
    }

    async fn save_prompts(&self, submission: &PromptSubmission) -> Result<(), BackendError> {
        self.save_outcome()?;
        self.record(Call::Prompts(submission.clone()));
        Ok(())
    }

    async fn check_generation_status(
        &self,
        participant_id: &str,
    ) -> Result<GenerationStatusResponse, BackendError> {
        self.record(Call::Status(participant_id.to_string()));
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(GenerationStatusResponse {
                    status: "pending".into(),
                    completed_trials: None,
                })
            })
    }

    async fn get_all_images(
        &self,
        participant_id: &str,
    ) -> Result<Vec<GeneratedImage>, BackendError> {
        self.record(Call::Images(participant_id.to_string()));
        self.images.lock().unwrap().clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn save_ratings(&self, ratings: &[RatingSubmission]) -> Result<(), BackendError> {
        self.save_outcome()?;
        self.record(Call::Ratings(ratings.to_vec()));
        Ok(())
    }

    async fn mark_completion(
        &self,
        participant_id: &str,
        _timestamp: &str,
    ) -> Result<(), BackendError> {
        self.record(Call::Completion(participant_id.to_string()));
        Ok(())
    }

    async fn save_timing(&self, timing: &PageTiming) -> Result<(), BackendError> {
        self.record(Call::Timing(timing.clone()));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        self.record(Call::Health);
        Ok(true)
    }
}
