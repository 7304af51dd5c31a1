//! The only path by which experiment data reaches durable storage.
//!
//! Phase results are awaited and gate advancement; page timings are sent in
//! the background and only logged when they fail.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    api::{ExperimentBackend, PageTiming, PromptSubmission, RatingSubmission, SurveySubmission},
    error::ExperimentError,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Clone)]
pub struct TelemetrySubmitter {
    backend: Arc<dyn ExperimentBackend>,
}

impl TelemetrySubmitter {
    pub fn new(backend: Arc<dyn ExperimentBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Arc<dyn ExperimentBackend> {
        self.backend.clone()
    }

    pub async fn submit_survey(&self, submission: &SurveySubmission) -> Result<(), ExperimentError> {
        self.backend.save_survey(submission).await.map_err(|err| {
            log_error!(
                "survey submission failed for {}: {err}",
                submission.participant_id
            );
            ExperimentError::from(err)
        })?;
        log_info!("survey saved for {}", submission.participant_id);
        Ok(())
    }

    pub async fn submit_prompts(&self, submission: &PromptSubmission) -> Result<(), ExperimentError> {
        self.backend.save_prompts(submission).await.map_err(|err| {
            log_error!(
                "prompt submission failed for {} trial {}: {err}",
                submission.participant_id,
                submission.trial_index
            );
            ExperimentError::from(err)
        })?;
        log_info!(
            "saved {} prompt(s) for {} trial {}",
            submission.prompts.len(),
            submission.participant_id,
            submission.trial_index
        );
        Ok(())
    }

    pub async fn submit_ratings(&self, ratings: &[RatingSubmission]) -> Result<(), ExperimentError> {
        self.backend.save_ratings(ratings).await.map_err(|err| {
            log_error!("rating submission failed: {err}");
            ExperimentError::from(err)
        })?;
        log_info!("saved {} rating(s)", ratings.len());
        Ok(())
    }

    /// Awaited, but never gates anything: a failure is logged and dropped.
    pub async fn mark_completion(&self, participant_id: &str, timestamp: &str) {
        match self.backend.mark_completion(participant_id, timestamp).await {
            Ok(()) => log_info!("completion recorded for {participant_id}"),
            Err(err) => log_warn!("failed to record completion for {participant_id}: {err}"),
        }
    }

    /// Fire-and-forget. Must be called from within a tokio runtime.
    pub fn record_page_timing(&self, timing: PageTiming) -> JoinHandle<()> {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.save_timing(&timing).await {
                log_warn!(
                    "page timing for '{}' ({:.3}s) not saved: {err}",
                    timing.page,
                    timing.duration
                );
            }
        })
    }
}
