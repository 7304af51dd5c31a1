use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::{de::DeserializeOwned, Serialize};

use crate::{error::BackendError, models::GeneratedImage};

use super::{
    ExperimentBackend, GenerationStatusResponse, ImagesResponse, PageTiming, PromptSubmission,
    RatingSubmission, SurveySubmission,
};

/// JSON-over-HTTP client for the study backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// # Arguments
    /// * `base_url` - Backend root, e.g. "http://localhost:8000"
    /// * `timeout` - Applied to every request
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| BackendError::Transport(format!("invalid base url '{base_url}': {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::from)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Transport(format!("base url '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &T,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.endpoint(segments)?)
            .json(body)
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BackendError> {
        let response = self.client.get(self.endpoint(segments)?).send().await?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status { status, body })
}

#[async_trait]
impl ExperimentBackend for HttpBackend {
    async fn save_survey(&self, submission: &SurveySubmission) -> Result<(), BackendError> {
        self.post_json(&["api", "save-survey"], submission).await
    }

    async fn save_prompts(&self, submission: &PromptSubmission) -> Result<(), BackendError> {
        self.post_json(&["api", "save-prompts"], submission).await
    }

    async fn check_generation_status(
        &self,
        participant_id: &str,
    ) -> Result<GenerationStatusResponse, BackendError> {
        self.get_json(&["api", "check-generation-status", participant_id])
            .await
    }

    async fn get_all_images(
        &self,
        participant_id: &str,
    ) -> Result<Vec<GeneratedImage>, BackendError> {
        let response: ImagesResponse = self
            .get_json(&["api", "get-all-images", participant_id])
            .await?;
        let base = self.base_url().to_string();
        Ok(response
            .images
            .into_iter()
            .map(|mut image| {
                image.resolve_locator(&base);
                image
            })
            .collect())
    }

    async fn save_ratings(&self, ratings: &[RatingSubmission]) -> Result<(), BackendError> {
        self.post_json(&["api", "save-ratings"], ratings).await
    }

    async fn mark_completion(
        &self,
        participant_id: &str,
        timestamp: &str,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.endpoint(&["api", "mark-completion"])?)
            .query(&[("participant_id", participant_id), ("timestamp", timestamp)])
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    async fn save_timing(&self, timing: &PageTiming) -> Result<(), BackendError> {
        self.post_json(&["api", "save-timing"], timing).await
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        let url = self.endpoint(&["api", "test"])?;
        match self.client.get(url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
