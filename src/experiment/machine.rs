use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::time::Instant;

use crate::{
    api::{PageTiming, PromptSubmission, RatingSubmission, SurveySubmission},
    config::StudyConfig,
    error::{ExperimentError, PlanError, ValidationError},
    generation::{NoContentReason, PollOutcome},
    models::{Condition, PromptSet, RatingDimension, Session, SurveyForm, TrialParams},
    plan,
    timing::TimingRecorder,
    utils::iso_timestamp,
};

use super::{InputPhase, InputStage, Phase, RatingPhase};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// An input phase that was just entered and needs its countdown started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputStart {
    pub epoch: u64,
    pub duration: Duration,
}

/// Where a submitted trial led.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterTrial {
    TransitionToMain,
    BetweenTrials,
    Processing,
}

/// The whole experiment as one value. Every mutation goes through a named
/// transition; none of them ever moves backwards.
#[derive(Debug)]
pub struct ExperimentMachine {
    config: StudyConfig,
    session: Session,
    phase: Phase,
    epoch: u64,
    entered_at: Instant,
    submitting: bool,
    last_error: Option<String>,
    page_timings: Vec<PageTiming>,
}

impl ExperimentMachine {
    /// Draws the session plan from `rng` and starts at id entry.
    pub fn create<R: Rng>(
        config: StudyConfig,
        rng: &mut R,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        let plan = plan::plan(
            rng,
            &config.practice_theme,
            &config.theme_pool,
            Condition::BeCreative,
            Condition::BeFluent,
            config.block_len(),
        )?;
        let session = Session::new(plan, wall);
        log_info!(
            "session {} created ({})",
            session.run_id,
            session.condition_order().as_str()
        );

        Ok(Self {
            config,
            session,
            phase: Phase::IdEntry,
            epoch: 0,
            entered_at: now,
            submitting: false,
            last_error: None,
            page_timings: Vec::new(),
        })
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Bumped on every phase entry.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn surface_error(&mut self, err: &ExperimentError) {
        self.last_error = Some(err.to_string());
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Page timings recorded since the last call.
    pub fn take_page_timings(&mut self) -> Vec<PageTiming> {
        std::mem::take(&mut self.page_timings)
    }

    /// True while the participant can still type.
    pub fn is_collecting(&self) -> bool {
        matches!(
            &self.phase,
            Phase::Input(InputPhase {
                stage: InputStage::Collecting { .. },
                ..
            })
        )
    }

    fn enter(&mut self, next: Phase, now: Instant, wall: DateTime<Utc>) {
        let left = self.phase.page_name();
        let seconds = now.duration_since(self.entered_at).as_secs_f64();
        self.page_timings.push(PageTiming {
            participant_id: self.participant_id().to_string(),
            page: left.clone(),
            duration: seconds,
            timestamp: iso_timestamp(wall),
        });

        log_info!("phase {} -> {} after {:.1}s", left, next.page_name(), seconds);
        self.phase = next;
        self.epoch += 1;
        self.entered_at = now;
        self.last_error = None;
    }

    fn participant_id(&self) -> &str {
        self.session.participant_id().unwrap_or_default()
    }

    fn out_of_order(&self, action: &'static str) -> ExperimentError {
        ExperimentError::OutOfOrder {
            phase: self.phase.label(),
            action,
        }
    }

    fn start_submission(&mut self) -> Result<(), ExperimentError> {
        if self.submitting {
            return Err(ExperimentError::SubmissionInFlight);
        }
        self.submitting = true;
        Ok(())
    }

    /// Clears the in-flight flag after a failed send. The phase stays and
    /// everything typed so far is kept.
    pub fn abort_submission(&mut self) {
        self.submitting = false;
    }

    pub fn submit_participant_id(
        &mut self,
        id: &str,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<(), ExperimentError> {
        if !matches!(self.phase, Phase::IdEntry) {
            return Err(self.out_of_order("submit participant id"));
        }
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingParticipantId.into());
        }
        self.session.set_participant_id(id.to_string())?;
        self.enter(Phase::Consent, now, wall);
        Ok(())
    }

    pub fn accept_consent(&mut self, now: Instant, wall: DateTime<Utc>) -> Result<(), ExperimentError> {
        if !matches!(self.phase, Phase::Consent) {
            return Err(self.out_of_order("accept consent"));
        }
        self.enter(Phase::InternetUseAgreement, now, wall);
        Ok(())
    }

    pub fn accept_internet_use(
        &mut self,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<(), ExperimentError> {
        if !matches!(self.phase, Phase::InternetUseAgreement) {
            return Err(self.out_of_order("accept internet use"));
        }
        self.enter(Phase::ExperienceSurvey, now, wall);
        Ok(())
    }

    pub fn begin_survey(
        &mut self,
        form: SurveyForm,
        wall: DateTime<Utc>,
    ) -> Result<SurveySubmission, ExperimentError> {
        if !matches!(self.phase, Phase::ExperienceSurvey) {
            return Err(self.out_of_order("submit survey"));
        }
        let survey = form.validate()?;
        self.start_submission()?;
        Ok(SurveySubmission {
            participant_id: self.participant_id().to_string(),
            survey,
            timestamp: iso_timestamp(wall),
        })
    }

    pub fn complete_survey(&mut self, now: Instant, wall: DateTime<Utc>) -> Result<(), ExperimentError> {
        if !matches!(self.phase, Phase::ExperienceSurvey) || !self.submitting {
            return Err(self.out_of_order("complete survey"));
        }
        self.submitting = false;
        self.enter(Phase::GeneralInstructions, now, wall);
        Ok(())
    }

    /// Leaves an instruction screen. Returns the countdown to start when the
    /// next screen is an input phase.
    pub fn continue_instructions(
        &mut self,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<Option<InputStart>, ExperimentError> {
        match self.phase {
            Phase::GeneralInstructions => {
                self.enter(Phase::PracticeInstructions, now, wall);
                Ok(None)
            }
            Phase::PracticeInstructions
            | Phase::TransitionToMain
            | Phase::BetweenTrialInstructions { .. } => {
                let trial = self
                    .session
                    .current_trial_params()
                    .ok_or_else(|| self.out_of_order("continue"))?;
                Ok(Some(self.enter_input(trial, now, wall)))
            }
            _ => Err(self.out_of_order("continue")),
        }
    }

    fn enter_input(&mut self, trial: TrialParams, now: Instant, wall: DateTime<Utc>) -> InputStart {
        let duration = self.config.input_duration(trial.is_practice());
        let input = InputPhase {
            trial,
            duration_secs: duration.as_secs(),
            stage: InputStage::Collecting {
                prompts: PromptSet::new(self.config.max_prompt_chars),
            },
            recorder: TimingRecorder::start(now),
        };
        self.enter(Phase::Input(input), now, wall);
        InputStart {
            epoch: self.epoch,
            duration,
        }
    }

    pub fn edit_prompt(&mut self, index: usize, text: &str, now: Instant) -> Result<(), ExperimentError> {
        let Phase::Input(InputPhase {
            stage: InputStage::Collecting { prompts },
            recorder,
            ..
        }) = &mut self.phase
        else {
            return Err(self.out_of_order("edit prompt"));
        };

        prompts.edit(index, text)?;
        if !text.is_empty() {
            recorder.record_keystroke(now);
        }
        Ok(())
    }

    /// Countdown expiry for the input phase entered at `epoch`. Returns
    /// `false` and changes nothing when that phase is already gone.
    pub fn expire_input(&mut self, epoch: u64, now: Instant, wall: DateTime<Utc>) -> bool {
        if epoch != self.epoch {
            log_debug!("ignoring stale expiry for epoch {epoch} (now {})", self.epoch);
            return false;
        }
        let Phase::Input(input) = &mut self.phase else {
            return false;
        };
        let InputStage::Collecting { prompts } = &input.stage else {
            return false;
        };

        let frozen = prompts.clone().freeze();
        let no_response_notice = frozen.is_empty();
        input.recorder.enter_selection(now, wall);
        log_info!(
            "time up for trial {}: {} prompt(s) frozen",
            input.trial.index,
            frozen.prompts().len()
        );
        input.stage = InputStage::Selecting {
            frozen,
            selection: None,
            no_response_notice,
        };
        true
    }

    /// Locked while the prompt submission is in flight.
    pub fn select_prompt(&mut self, prompt: &str) -> Result<(), ExperimentError> {
        if self.submitting {
            return Err(ExperimentError::SubmissionInFlight);
        }
        let Phase::Input(InputPhase {
            stage: InputStage::Selecting { frozen, selection, .. },
            ..
        }) = &mut self.phase
        else {
            return Err(self.out_of_order("select prompt"));
        };

        if !frozen.contains(prompt) {
            return Err(ValidationError::SelectionNotInSet.into());
        }
        *selection = Some(prompt.to_string());
        Ok(())
    }

    pub fn begin_prompt_submission(
        &mut self,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<PromptSubmission, ExperimentError> {
        let Phase::Input(InputPhase {
            trial,
            stage: InputStage::Selecting { frozen, selection, .. },
            recorder,
            ..
        }) = &self.phase
        else {
            return Err(self.out_of_order("submit prompts"));
        };

        let selected_prompt = frozen.validate_selection(selection.as_deref())?;
        let submission = PromptSubmission {
            participant_id: self.participant_id().to_string(),
            trial_index: trial.index,
            condition: trial.condition,
            theme: trial.theme.clone(),
            prompts: frozen.prompts().to_vec(),
            selected_prompt,
            is_practice: trial.is_practice(),
            condition_order: self.session.condition_order(),
            timing_data: recorder.finish(now),
            no_response: frozen.is_empty(),
            timestamp: iso_timestamp(wall),
        };
        self.start_submission()?;
        Ok(submission)
    }

    pub fn complete_prompt_submission(
        &mut self,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<AfterTrial, ExperimentError> {
        if !self.submitting {
            return Err(self.out_of_order("complete prompt submission"));
        }
        let Phase::Input(input) = &mut self.phase else {
            return Err(self.out_of_order("complete prompt submission"));
        };
        if !matches!(input.stage, InputStage::Selecting { .. }) {
            return Err(self.out_of_order("complete prompt submission"));
        }
        input.stage = InputStage::Submitted;
        self.submitting = false;

        let completed = self.session.current_trial();
        if completed >= self.session.main_trial_count() {
            self.enter(Phase::Processing, now, wall);
            return Ok(AfterTrial::Processing);
        }

        self.session.advance_trial();
        if completed == 0 {
            self.enter(Phase::TransitionToMain, now, wall);
            return Ok(AfterTrial::TransitionToMain);
        }

        let next = self
            .session
            .current_trial_params()
            .ok_or_else(|| self.out_of_order("complete prompt submission"))?;
        self.enter(
            Phase::BetweenTrialInstructions {
                completed_trial: completed,
                next,
            },
            now,
            wall,
        );
        Ok(AfterTrial::BetweenTrials)
    }

    /// Applies the poller's verdict. Only meaningful while processing.
    pub fn apply_generation_outcome(
        &mut self,
        outcome: PollOutcome,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<(), ExperimentError> {
        if !matches!(self.phase, Phase::Processing) {
            return Err(self.out_of_order("apply generation outcome"));
        }
        let next = match outcome {
            PollOutcome::Ready(images) if images.is_empty() => Phase::NoContentAvailable {
                reason: NoContentReason::EmptyBatch,
            },
            PollOutcome::Ready(images) => Phase::ImageRating(RatingPhase::new(images)),
            PollOutcome::NoContent(reason) => Phase::NoContentAvailable { reason },
        };
        self.enter(next, now, wall);
        Ok(())
    }

    pub fn rate_image(
        &mut self,
        index: usize,
        dimension: RatingDimension,
        value: u8,
    ) -> Result<(), ExperimentError> {
        if self.submitting {
            return Err(ExperimentError::SubmissionInFlight);
        }
        let Phase::ImageRating(rating) = &mut self.phase else {
            return Err(self.out_of_order("rate image"));
        };
        let slot = rating
            .ratings
            .get_mut(index)
            .ok_or(ValidationError::RatingIndexOutOfRange(index))?;
        slot.set(dimension, value)?;
        Ok(())
    }

    pub fn begin_rating_submission(
        &mut self,
        wall: DateTime<Utc>,
    ) -> Result<Vec<RatingSubmission>, ExperimentError> {
        let Phase::ImageRating(rating) = &self.phase else {
            return Err(self.out_of_order("submit ratings"));
        };
        let missing = rating.incomplete();
        if missing > 0 {
            return Err(ValidationError::IncompleteRatings { missing }.into());
        }

        let timestamp = iso_timestamp(wall);
        let participant_id = self.participant_id().to_string();
        let submissions = rating
            .images
            .iter()
            .zip(&rating.ratings)
            .map(|(image, scores)| RatingSubmission {
                participant_id: participant_id.clone(),
                trial_index: image.trial_index,
                creativity_rating: scores.creativity.unwrap_or_default(),
                intention_rating: scores.intention.unwrap_or_default(),
                theme: image.theme.clone(),
                condition: image.condition,
                prompt: image.prompt.clone(),
                timestamp: timestamp.clone(),
            })
            .collect();
        self.start_submission()?;
        Ok(submissions)
    }

    pub fn complete_rating_submission(
        &mut self,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<(), ExperimentError> {
        if !matches!(self.phase, Phase::ImageRating(_)) || !self.submitting {
            return Err(self.out_of_order("complete ratings"));
        }
        self.submitting = false;
        let redirect_url = self.config.redirect_url.clone();
        self.enter(Phase::Completion { redirect_url }, now, wall);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenAiExperience, GeneratedImage, TextToImageExperience, ToolsUsed};
    use rand::{rngs::StdRng, SeedableRng};

    fn machine() -> (ExperimentMachine, Instant) {
        let now = Instant::now();
        let machine = ExperimentMachine::create(
            StudyConfig::default(),
            &mut StdRng::seed_from_u64(5),
            now,
            Utc::now(),
        )
        .unwrap();
        (machine, now)
    }

    fn survey() -> SurveyForm {
        SurveyForm {
            gen_ai_experience: Some(GenAiExperience::Basic),
            text_to_image_experience: Some(TextToImageExperience::Often),
            tools_used: ToolsUsed::default(),
            other_tools: None,
        }
    }

    /// Walks from id entry up to the practice input phase.
    fn to_practice(machine: &mut ExperimentMachine, now: Instant) -> InputStart {
        let wall = Utc::now();
        machine.submit_participant_id("R7X9", now, wall).unwrap();
        machine.accept_consent(now, wall).unwrap();
        machine.accept_internet_use(now, wall).unwrap();
        machine.begin_survey(survey(), wall).unwrap();
        machine.complete_survey(now, wall).unwrap();
        assert_eq!(machine.continue_instructions(now, wall).unwrap(), None);
        machine.continue_instructions(now, wall).unwrap().unwrap()
    }

    fn finish_trial(machine: &mut ExperimentMachine, start: InputStart, now: Instant) -> AfterTrial {
        let wall = Utc::now();
        machine.edit_prompt(0, "a lighthouse", now).unwrap();
        assert!(machine.expire_input(start.epoch, now + start.duration, wall));
        machine.select_prompt("a lighthouse").unwrap();
        machine.begin_prompt_submission(now + start.duration, wall).unwrap();
        machine
            .complete_prompt_submission(now + start.duration, wall)
            .unwrap()
    }

    fn images(n: usize) -> Vec<GeneratedImage> {
        (1..=n)
            .map(|i| GeneratedImage {
                locator: format!("https://img.example.org/{i}.png"),
                trial_index: i,
                theme: format!("theme {i}"),
                condition: Condition::BeFluent,
                prompt: format!("prompt {i}"),
            })
            .collect()
    }

    #[test]
    fn test_linear_entry_sequence() {
        let (mut machine, now) = machine();
        let start = to_practice(&mut machine, now);
        assert_eq!(start.duration, Duration::from_secs(60));
        match machine.phase() {
            Phase::Input(input) => {
                assert!(input.trial.is_practice());
                assert_eq!(input.trial.theme, "a walk in the park");
            }
            other => panic!("expected practice input, got {other:?}"),
        }
        assert!(machine.is_collecting());
        assert_eq!(start.epoch, machine.epoch());
    }

    #[test]
    fn test_actions_out_of_order_are_rejected() {
        let (mut machine, now) = machine();
        let wall = Utc::now();
        assert!(matches!(
            machine.accept_consent(now, wall),
            Err(ExperimentError::OutOfOrder { .. })
        ));
        assert!(matches!(
            machine.continue_instructions(now, wall),
            Err(ExperimentError::OutOfOrder { .. })
        ));
        assert_eq!(
            machine.submit_participant_id("   ", now, wall),
            Err(ExperimentError::Validation(ValidationError::MissingParticipantId))
        );
        assert!(matches!(machine.phase(), Phase::IdEntry));
    }

    #[test]
    fn test_survey_validation_keeps_phase() {
        let (mut machine, now) = machine();
        let wall = Utc::now();
        machine.submit_participant_id("R7X9", now, wall).unwrap();
        machine.accept_consent(now, wall).unwrap();
        machine.accept_internet_use(now, wall).unwrap();

        let mut form = survey();
        form.text_to_image_experience = None;
        assert!(matches!(
            machine.begin_survey(form, wall),
            Err(ExperimentError::Validation(_))
        ));
        assert!(!machine.is_submitting());

        let payload = machine.begin_survey(survey(), wall).unwrap();
        assert_eq!(payload.participant_id, "R7X9");
        assert_eq!(
            machine.begin_survey(survey(), wall),
            Err(ExperimentError::SubmissionInFlight)
        );
        machine.abort_submission();
        assert!(matches!(machine.phase(), Phase::ExperienceSurvey));
    }

    #[test]
    fn test_submission_disabled_while_collecting() {
        let (mut machine, now) = machine();
        to_practice(&mut machine, now);
        machine.edit_prompt(0, "a quiet forest", now).unwrap();
        assert!(matches!(
            machine.begin_prompt_submission(now, Utc::now()),
            Err(ExperimentError::OutOfOrder { .. })
        ));
        assert!(matches!(
            machine.select_prompt("a quiet forest"),
            Err(ExperimentError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_stale_expiry_is_ignored() {
        let (mut machine, now) = machine();
        let start = to_practice(&mut machine, now);
        assert!(!machine.expire_input(start.epoch - 1, now, Utc::now()));
        assert!(machine.is_collecting());

        assert!(machine.expire_input(start.epoch, now, Utc::now()));
        assert!(!machine.is_collecting());
        assert!(!machine.expire_input(start.epoch, now, Utc::now()), "second expiry is a no-op");
    }

    #[test]
    fn test_editing_after_expiry_is_rejected() {
        let (mut machine, now) = machine();
        let start = to_practice(&mut machine, now);
        machine.edit_prompt(0, "first", now).unwrap();
        machine.expire_input(start.epoch, now, Utc::now());
        assert!(matches!(
            machine.edit_prompt(1, "late", now),
            Err(ExperimentError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_empty_prompt_set_submits_without_selection() {
        let (mut machine, now) = machine();
        let start = to_practice(&mut machine, now);
        let expired_at = now + start.duration;
        assert!(machine.expire_input(start.epoch, expired_at, Utc::now()));

        match machine.phase() {
            Phase::Input(InputPhase {
                stage: InputStage::Selecting { no_response_notice, .. },
                ..
            }) => assert!(*no_response_notice),
            other => panic!("expected selecting, got {other:?}"),
        }

        let payload = machine
            .begin_prompt_submission(expired_at + Duration::from_secs(3), Utc::now())
            .unwrap();
        assert!(payload.no_response);
        assert!(payload.prompts.is_empty());
        assert_eq!(payload.selected_prompt, None);
        assert_eq!(payload.timing_data.first_keypress_latency, None);
        assert_eq!(payload.timing_data.total_response_time, 60.0);
        assert_eq!(payload.timing_data.selection_phase_duration, Some(3.0));
    }

    #[test]
    fn test_selection_required_for_non_empty_set() {
        let (mut machine, now) = machine();
        let start = to_practice(&mut machine, now);
        machine.edit_prompt(0, "a quiet forest", now).unwrap();
        machine.expire_input(start.epoch, now, Utc::now());

        assert_eq!(
            machine.begin_prompt_submission(now, Utc::now()),
            Err(ExperimentError::Validation(ValidationError::NoSelection))
        );
        assert_eq!(
            machine.select_prompt("a loud forest"),
            Err(ExperimentError::Validation(ValidationError::SelectionNotInSet))
        );
        assert!(!machine.is_submitting());
    }

    #[test]
    fn test_trials_route_through_between_screens_to_processing() {
        let (mut machine, now) = machine();
        let start = to_practice(&mut machine, now);
        assert_eq!(finish_trial(&mut machine, start, now), AfterTrial::TransitionToMain);
        assert_eq!(machine.session().current_trial(), 1);

        for trial in 1..=6 {
            let start = machine
                .continue_instructions(now, Utc::now())
                .unwrap()
                .unwrap();
            assert_eq!(start.duration, Duration::from_secs(120));
            let after = finish_trial(&mut machine, start, now);
            if trial < 6 {
                assert_eq!(after, AfterTrial::BetweenTrials);
                match machine.phase() {
                    Phase::BetweenTrialInstructions {
                        completed_trial,
                        next,
                    } => {
                        assert_eq!(*completed_trial, trial);
                        assert_eq!(next.index, trial + 1);
                        assert_eq!(*next, machine.session().trial(trial + 1).unwrap());
                    }
                    other => panic!("expected between-trial screen, got {other:?}"),
                }
            } else {
                assert_eq!(after, AfterTrial::Processing);
                assert!(matches!(machine.phase(), Phase::Processing));
            }
        }
        assert_eq!(machine.session().current_trial(), 6);
    }

    #[test]
    fn test_generation_outcome_routes() {
        let (mut machine, now) = machine();
        let wall = Utc::now();
        machine.phase = Phase::Processing;
        machine
            .apply_generation_outcome(PollOutcome::Ready(Vec::new()), now, wall)
            .unwrap();
        assert!(matches!(
            machine.phase(),
            Phase::NoContentAvailable {
                reason: NoContentReason::EmptyBatch
            }
        ));
        assert!(machine
            .apply_generation_outcome(PollOutcome::Ready(images(1)), now, wall)
            .is_err());
    }

    #[test]
    fn test_ratings_require_every_image() {
        let (mut machine, now) = machine();
        let wall = Utc::now();
        machine.submit_participant_id("R7X9", now, wall).unwrap();
        machine.phase = Phase::Processing;
        machine
            .apply_generation_outcome(PollOutcome::Ready(images(2)), now, wall)
            .unwrap();

        machine.rate_image(0, RatingDimension::Creativity, 3).unwrap();
        machine.rate_image(0, RatingDimension::Intention, 1).unwrap();
        machine.rate_image(1, RatingDimension::Creativity, 4).unwrap();
        assert_eq!(
            machine.begin_rating_submission(wall),
            Err(ExperimentError::Validation(ValidationError::IncompleteRatings { missing: 1 }))
        );
        assert_eq!(
            machine.rate_image(2, RatingDimension::Creativity, 1),
            Err(ExperimentError::Validation(ValidationError::RatingIndexOutOfRange(2)))
        );

        machine.rate_image(1, RatingDimension::Intention, 0).unwrap();
        let submissions = machine.begin_rating_submission(wall).unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].creativity_rating, 3);
        assert_eq!(submissions[1].intention_rating, 0);
        assert_eq!(submissions[1].trial_index, 2);

        machine.complete_rating_submission(now, wall).unwrap();
        match machine.phase() {
            Phase::Completion { redirect_url } => {
                assert_eq!(redirect_url, &StudyConfig::default().redirect_url)
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(machine.phase().is_terminal());
    }

    #[test]
    fn test_selection_locked_while_prompts_in_flight() {
        let (mut machine, now) = machine();
        let start = to_practice(&mut machine, now);
        machine.edit_prompt(0, "a quiet forest", now).unwrap();
        machine.edit_prompt(1, "a neon city at night", now).unwrap();
        machine.expire_input(start.epoch, now, Utc::now());
        machine.select_prompt("a quiet forest").unwrap();

        let payload = machine.begin_prompt_submission(now, Utc::now()).unwrap();
        assert_eq!(payload.selected_prompt.as_deref(), Some("a quiet forest"));
        assert_eq!(
            machine.select_prompt("a neon city at night"),
            Err(ExperimentError::SubmissionInFlight)
        );
        match machine.phase() {
            Phase::Input(InputPhase {
                stage: InputStage::Selecting { selection, .. },
                ..
            }) => assert_eq!(selection.as_deref(), Some("a quiet forest")),
            other => panic!("expected selecting, got {other:?}"),
        }

        machine.abort_submission();
        machine.select_prompt("a neon city at night").unwrap();
    }

    #[test]
    fn test_ratings_locked_while_in_flight() {
        let (mut machine, now) = machine();
        let wall = Utc::now();
        machine.submit_participant_id("R7X9", now, wall).unwrap();
        machine.phase = Phase::Processing;
        machine
            .apply_generation_outcome(PollOutcome::Ready(images(1)), now, wall)
            .unwrap();
        machine.rate_image(0, RatingDimension::Creativity, 2).unwrap();
        machine.rate_image(0, RatingDimension::Intention, 3).unwrap();

        let submissions = machine.begin_rating_submission(wall).unwrap();
        assert_eq!(
            machine.rate_image(0, RatingDimension::Creativity, 4),
            Err(ExperimentError::SubmissionInFlight)
        );
        assert_eq!(
            machine.begin_rating_submission(wall),
            Err(ExperimentError::SubmissionInFlight)
        );
        match machine.phase() {
            Phase::ImageRating(rating) => {
                assert_eq!(rating.ratings[0].creativity, Some(submissions[0].creativity_rating))
            }
            other => panic!("expected image rating, got {other:?}"),
        }
    }

    #[test]
    fn test_page_timing_recorded_per_transition() {
        let (mut machine, now) = machine();
        let wall = Utc::now();
        machine
            .submit_participant_id("R7X9", now + Duration::from_millis(4_500), wall)
            .unwrap();
        machine
            .accept_consent(now + Duration::from_secs(10), wall)
            .unwrap();

        let timings = machine.take_page_timings();
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].page, "id-entry");
        assert_eq!(timings[0].duration, 4.5);
        assert_eq!(timings[0].participant_id, "R7X9");
        assert_eq!(timings[1].page, "consent");
        assert_eq!(timings[1].duration, 5.5);
        assert!(machine.take_page_timings().is_empty());
    }

    #[test]
    fn test_error_cleared_on_transition() {
        let (mut machine, now) = machine();
        machine.surface_error(&ValidationError::MissingParticipantId.into());
        assert!(machine.last_error().is_some());
        machine.submit_participant_id("R7X9", now, Utc::now()).unwrap();
        assert_eq!(machine.last_error(), None);
    }
}
