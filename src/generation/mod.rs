//! Bounded polling of the backend's image-generation job.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{ExperimentBackend, GenerationStatus},
    models::GeneratedImage,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Why the participant ends up with nothing to rate. All of these are final.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "reason", content = "detail")]
pub enum NoContentReason {
    NoTrials,
    AllFailed,
    Unrecognized(String),
    AttemptsExhausted,
    EmptyBatch,
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready(Vec<GeneratedImage>),
    NoContent(NoContentReason),
}

#[derive(Clone)]
pub struct GenerationPoller {
    backend: Arc<dyn ExperimentBackend>,
    interval: Duration,
    max_attempts: u32,
}

impl GenerationPoller {
    pub fn new(backend: Arc<dyn ExperimentBackend>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            backend,
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Polls once immediately and then every `interval`, at most
    /// `max_attempts` times in total. Returns `None` if cancelled first.
    pub async fn run(
        &self,
        participant_id: &str,
        cancel: CancellationToken,
    ) -> Option<PollOutcome> {
        tokio::select! {
            outcome = self.poll_until_settled(participant_id) => Some(outcome),
            _ = cancel.cancelled() => {
                log_info!("generation polling for {participant_id} cancelled");
                None
            }
        }
    }

    async fn poll_until_settled(&self, participant_id: &str) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.interval).await;
            }

            let status = match self.backend.check_generation_status(participant_id).await {
                Ok(response) => response.status(),
                Err(err) => {
                    log_warn!("generation status check {attempt} failed: {err}");
                    return PollOutcome::NoContent(NoContentReason::Network(err.to_string()));
                }
            };
            log_info!(
                "generation status for {participant_id}: {status:?} (attempt {attempt}/{})",
                self.max_attempts
            );

            match status {
                GenerationStatus::Pending => continue,
                GenerationStatus::Ready => return self.fetch_images(participant_id).await,
                GenerationStatus::NoTrials => {
                    return PollOutcome::NoContent(NoContentReason::NoTrials)
                }
                GenerationStatus::AllFailed => {
                    return PollOutcome::NoContent(NoContentReason::AllFailed)
                }
                GenerationStatus::Unrecognized(raw) => {
                    log_warn!("unrecognized generation status '{raw}'");
                    return PollOutcome::NoContent(NoContentReason::Unrecognized(raw));
                }
            }
        }

        log_warn!(
            "generation still pending after {} attempts for {participant_id}",
            self.max_attempts
        );
        PollOutcome::NoContent(NoContentReason::AttemptsExhausted)
    }

    async fn fetch_images(&self, participant_id: &str) -> PollOutcome {
        match self.backend.get_all_images(participant_id).await {
            Ok(images) if images.is_empty() => {
                log_warn!("generation reported ready but no images came back");
                PollOutcome::NoContent(NoContentReason::EmptyBatch)
            }
            Ok(images) => {
                log_info!("fetched {} generated image(s)", images.len());
                PollOutcome::Ready(images)
            }
            Err(err) => {
                log_warn!("fetching generated images failed: {err}");
                PollOutcome::NoContent(NoContentReason::Network(err.to_string()))
            }
        }
    }
}
