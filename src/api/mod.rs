//! The study backend as the experiment sees it.
//!
//! `ExperimentBackend` is the seam between the experiment core and the
//! network; `HttpBackend` is the production implementation.

pub mod http;
#[cfg(test)]
pub(crate) mod scripted;
pub mod types;

use async_trait::async_trait;

use crate::{error::BackendError, models::GeneratedImage};

pub use http::HttpBackend;
pub use types::{
    GenerationStatus, GenerationStatusResponse, ImagesResponse, PageTiming, PromptSubmission,
    RatingSubmission, SurveySubmission,
};

#[async_trait]
pub trait ExperimentBackend: Send + Sync {
    async fn save_survey(&self, submission: &SurveySubmission) -> Result<(), BackendError>;

    async fn save_prompts(&self, submission: &PromptSubmission) -> Result<(), BackendError>;

    async fn check_generation_status(
        &self,
        participant_id: &str,
    ) -> Result<GenerationStatusResponse, BackendError>;

    async fn get_all_images(&self, participant_id: &str)
        -> Result<Vec<GeneratedImage>, BackendError>;

    async fn save_ratings(&self, ratings: &[RatingSubmission]) -> Result<(), BackendError>;

    async fn mark_completion(&self, participant_id: &str, timestamp: &str)
        -> Result<(), BackendError>;

    async fn save_timing(&self, timing: &PageTiming) -> Result<(), BackendError>;

    /// Connectivity check. `Ok(false)` means the server answered badly or not at all.
    async fn health_check(&self) -> Result<bool, BackendError>;
}
