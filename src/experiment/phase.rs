use serde::Serialize;

use crate::{
    generation::NoContentReason,
    models::{FrozenPromptSet, GeneratedImage, PromptSet, Rating, TrialParams},
    timing::TimingRecorder,
};

/// Every screen of the study, in order. Each variant carries exactly what
/// its transitions need.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Phase {
    IdEntry,
    Consent,
    InternetUseAgreement,
    ExperienceSurvey,
    GeneralInstructions,
    PracticeInstructions,
    Input(InputPhase),
    TransitionToMain,
    #[serde(rename_all = "camelCase")]
    BetweenTrialInstructions {
        completed_trial: usize,
        next: TrialParams,
    },
    Processing,
    ImageRating(RatingPhase),
    #[serde(rename_all = "camelCase")]
    Completion {
        redirect_url: String,
    },
    NoContentAvailable {
        reason: NoContentReason,
    },
}

impl Phase {
    /// Stable label reported with page timings.
    pub fn page_name(&self) -> String {
        match self {
            Phase::IdEntry => "id-entry".into(),
            Phase::Consent => "consent".into(),
            Phase::InternetUseAgreement => "internet-use-agreement".into(),
            Phase::ExperienceSurvey => "experience-survey".into(),
            Phase::GeneralInstructions => "general-instructions".into(),
            Phase::PracticeInstructions => "practice-instructions".into(),
            Phase::Input(input) if input.trial.is_practice() => "practice-trial".into(),
            Phase::Input(input) => format!("trial-{}", input.trial.index),
            Phase::TransitionToMain => "transition-to-main".into(),
            Phase::BetweenTrialInstructions {
                completed_trial, ..
            } => format!("between-trials-{completed_trial}"),
            Phase::Processing => "processing".into(),
            Phase::ImageRating(_) => "image-rating".into(),
            Phase::Completion { .. } => "completion".into(),
            Phase::NoContentAvailable { .. } => "no-content-available".into(),
        }
    }

    /// Short name for error messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::IdEntry => "id entry",
            Phase::Consent => "consent",
            Phase::InternetUseAgreement => "internet use agreement",
            Phase::ExperienceSurvey => "experience survey",
            Phase::GeneralInstructions => "general instructions",
            Phase::PracticeInstructions => "practice instructions",
            Phase::Input(input) => match input.stage {
                InputStage::Collecting { .. } => "prompt writing",
                InputStage::Selecting { .. } => "prompt selection",
                InputStage::Submitted => "prompt submission",
            },
            Phase::TransitionToMain => "transition to main trials",
            Phase::BetweenTrialInstructions { .. } => "between-trial instructions",
            Phase::Processing => "processing",
            Phase::ImageRating(_) => "image rating",
            Phase::Completion { .. } => "completion",
            Phase::NoContentAvailable { .. } => "no content available",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Completion { .. } | Phase::NoContentAvailable { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPhase {
    pub trial: TrialParams,
    pub duration_secs: u64,
    pub stage: InputStage,
    #[serde(skip)]
    pub(crate) recorder: TimingRecorder,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum InputStage {
    /// Timer running, prompts editable, submission disabled.
    Collecting { prompts: PromptSet },
    /// Timer expired, prompts frozen, waiting for the best one to be chosen.
    #[serde(rename_all = "camelCase")]
    Selecting {
        frozen: FrozenPromptSet,
        selection: Option<String>,
        /// Nothing was typed; the participant is told active input is required.
        no_response_notice: bool,
    },
    Submitted,
}

/// Images fetched for rating. Dropped as soon as the phase is left.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPhase {
    pub images: Vec<GeneratedImage>,
    pub ratings: Vec<Rating>,
}

impl RatingPhase {
    pub fn new(images: Vec<GeneratedImage>) -> Self {
        let ratings = vec![Rating::default(); images.len()];
        Self { images, ratings }
    }

    pub fn incomplete(&self) -> usize {
        self.ratings.iter().filter(|r| !r.is_complete()).count()
    }
}
