use thiserror::Error;

/// Input problems the participant can fix on the spot. The phase stays put.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("participant id is required")]
    MissingParticipantId,
    #[error("survey field '{0}' is required")]
    MissingSurveyField(&'static str),
    #[error("please name the other tools you have used")]
    MissingOtherTools,
    #[error("select the prompt you think is best before continuing")]
    NoSelection,
    #[error("the selected prompt is not one of your prompts")]
    SelectionNotInSet,
    #[error("prompts are limited to {max} characters")]
    PromptTooLong { max: usize },
    #[error("prompt slot {0} does not exist")]
    PromptIndexOutOfRange(usize),
    #[error("rating {0} is outside the 0-4 scale")]
    RatingOutOfRange(u8),
    #[error("image {0} does not exist")]
    RatingIndexOutOfRange(usize),
    #[error("{missing} image(s) still need both ratings")]
    IncompleteRatings { missing: usize },
}

/// A request to the study backend that did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("could not reach the study server: {0}")]
    Transport(String),
    #[error("study server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response from the study server: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExperimentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("'{action}' is not available during {phase}")]
    OutOfOrder {
        phase: &'static str,
        action: &'static str,
    },
    #[error("a submission is already in progress")]
    SubmissionInFlight,
    #[error("participant id is already set")]
    ParticipantIdAlreadySet,
}

impl ExperimentError {
    /// Whether the participant should see this inline and may simply retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExperimentError::Validation(_)
                | ExperimentError::Backend(_)
                | ExperimentError::SubmissionInFlight
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("theme pool is empty")]
    EmptyThemePool,
    #[error("theme pool of {len} cannot be split into two blocks of {block_len}")]
    UnevenBlocks { len: usize, block_len: usize },
    #[error("both blocks use condition {0:?}")]
    SameCondition(String),
}
