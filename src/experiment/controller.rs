use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    api::ExperimentBackend,
    config::{debug_mode, StudyConfig},
    error::{ExperimentError, PlanError},
    generation::GenerationPoller,
    models::{RatingDimension, SurveyForm},
    telemetry::TelemetrySubmitter,
    timer::{CountdownSettings, CountdownSnapshot, CountdownTimer},
    utils::iso_timestamp,
};

use super::{AfterTrial, ExperimentMachine, InputStart, Phase};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Everything the rendering layer needs to draw the current screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSnapshot {
    pub run_id: Uuid,
    pub participant_id: Option<String>,
    pub page: String,
    pub phase: Phase,
    pub trial_index: usize,
    pub main_trial_count: usize,
    pub submitting: bool,
    pub countdown: Option<CountdownSnapshot>,
    pub error: Option<String>,
}

/// Receives state changes as they happen. Called without any lock held.
pub trait PhaseObserver: Send + Sync {
    fn state_changed(&self, snapshot: &ExperimentSnapshot);

    fn countdown_tick(&self, _countdown: &CountdownSnapshot) {}
}

pub struct NoopObserver;

impl PhaseObserver for NoopObserver {
    fn state_changed(&self, _snapshot: &ExperimentSnapshot) {}
}

#[derive(Clone)]
pub struct ExperimentController {
    machine: Arc<Mutex<ExperimentMachine>>,
    /// The running countdown, tagged with the epoch of the phase it belongs to.
    countdown: Arc<Mutex<Option<(u64, CountdownTimer)>>>,
    submitter: TelemetrySubmitter,
    poller: GenerationPoller,
    observer: Arc<dyn PhaseObserver>,
    countdown_settings: CountdownSettings,
    shutdown: CancellationToken,
}

impl ExperimentController {
    pub fn new(
        config: StudyConfig,
        backend: Arc<dyn ExperimentBackend>,
        observer: Arc<dyn PhaseObserver>,
    ) -> Result<Self, PlanError> {
        Self::with_rng(config, backend, observer, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng>(
        config: StudyConfig,
        backend: Arc<dyn ExperimentBackend>,
        observer: Arc<dyn PhaseObserver>,
        rng: &mut R,
    ) -> Result<Self, PlanError> {
        let countdown_settings = countdown_settings(&config, debug_mode());
        let poller = GenerationPoller::new(
            backend.clone(),
            config.poll_interval(),
            config.max_poll_attempts,
        );
        let machine = ExperimentMachine::create(config, rng, Instant::now(), Utc::now())?;

        Ok(Self {
            machine: Arc::new(Mutex::new(machine)),
            countdown: Arc::new(Mutex::new(None)),
            submitter: TelemetrySubmitter::new(backend),
            poller,
            observer,
            countdown_settings,
            shutdown: CancellationToken::new(),
        })
    }

    pub async fn snapshot(&self) -> ExperimentSnapshot {
        let machine = self.machine.lock().await;
        let countdown = self.countdown.lock().await;
        snapshot_of(&machine, countdown.as_ref().map(|(_, timer)| timer.snapshot()))
    }

    pub async fn submit_participant_id(&self, id: &str) -> Result<ExperimentSnapshot, ExperimentError> {
        self.transition(|machine, now, wall| machine.submit_participant_id(id, now, wall))
            .await
    }

    pub async fn accept_consent(&self) -> Result<ExperimentSnapshot, ExperimentError> {
        self.transition(|machine, now, wall| machine.accept_consent(now, wall))
            .await
    }

    pub async fn accept_internet_use(&self) -> Result<ExperimentSnapshot, ExperimentError> {
        self.transition(|machine, now, wall| machine.accept_internet_use(now, wall))
            .await
    }

    pub async fn submit_survey(&self, form: SurveyForm) -> Result<ExperimentSnapshot, ExperimentError> {
        let begun = self.machine.lock().await.begin_survey(form, Utc::now());
        let submission = match begun {
            Ok(submission) => submission,
            Err(err) => return self.settle(Err(err)).await,
        };

        let sent = self.submitter.submit_survey(&submission).await;
        let result = {
            let mut machine = self.machine.lock().await;
            match sent {
                Ok(()) => machine.complete_survey(Instant::now(), Utc::now()),
                Err(err) => {
                    machine.abort_submission();
                    Err(err)
                }
            }
        };
        self.settle(result).await
    }

    pub async fn continue_instructions(&self) -> Result<ExperimentSnapshot, ExperimentError> {
        let result = self
            .machine
            .lock()
            .await
            .continue_instructions(Instant::now(), Utc::now());
        match result {
            Ok(Some(start)) => {
                self.start_countdown(start).await;
                self.settle(Ok(())).await
            }
            Ok(None) => self.settle(Ok(())).await,
            Err(err) => self.settle(Err(err)).await,
        }
    }

    /// Keystrokes only update the prompt set; observers are not notified.
    pub async fn edit_prompt(&self, index: usize, text: &str) -> Result<ExperimentSnapshot, ExperimentError> {
        let result = self
            .machine
            .lock()
            .await
            .edit_prompt(index, text, Instant::now());
        match result {
            Ok(()) => Ok(self.snapshot().await),
            Err(err) => self.settle(Err(err)).await,
        }
    }

    pub async fn select_prompt(&self, prompt: &str) -> Result<ExperimentSnapshot, ExperimentError> {
        self.transition(|machine, _, _| machine.select_prompt(prompt))
            .await
    }

    pub async fn submit_prompts(&self) -> Result<ExperimentSnapshot, ExperimentError> {
        let begun = self
            .machine
            .lock()
            .await
            .begin_prompt_submission(Instant::now(), Utc::now());
        let submission = match begun {
            Ok(submission) => submission,
            Err(err) => return self.settle(Err(err)).await,
        };

        let sent = self.submitter.submit_prompts(&submission).await;
        let result = {
            let mut machine = self.machine.lock().await;
            match sent {
                Ok(()) => machine.complete_prompt_submission(Instant::now(), Utc::now()),
                Err(err) => {
                    machine.abort_submission();
                    Err(err)
                }
            }
        };

        if let Ok(AfterTrial::Processing) = result {
            self.spawn_generation_poll(submission.participant_id.clone());
        }
        self.settle(result.map(|_| ())).await
    }

    pub async fn rate_image(
        &self,
        index: usize,
        dimension: RatingDimension,
        value: u8,
    ) -> Result<ExperimentSnapshot, ExperimentError> {
        self.transition(|machine, _, _| machine.rate_image(index, dimension, value))
            .await
    }

    /// Saves every rating, then records completion. A failed completion
    /// mark is only logged.
    pub async fn submit_ratings(&self) -> Result<ExperimentSnapshot, ExperimentError> {
        let begun = self.machine.lock().await.begin_rating_submission(Utc::now());
        let ratings = match begun {
            Ok(ratings) => ratings,
            Err(err) => return self.settle(Err(err)).await,
        };

        let sent = self.submitter.submit_ratings(&ratings).await;
        let (result, participant_id) = {
            let mut machine = self.machine.lock().await;
            let result = match sent {
                Ok(()) => machine.complete_rating_submission(Instant::now(), Utc::now()),
                Err(err) => {
                    machine.abort_submission();
                    Err(err)
                }
            };
            let participant_id = machine.session().participant_id().map(str::to_string);
            (result, participant_id)
        };

        let completed = result.is_ok();
        let snapshot = self.settle(result).await?;
        if let (true, Some(participant_id)) = (completed, participant_id) {
            self.submitter
                .mark_completion(&participant_id, &iso_timestamp(Utc::now()))
                .await;
        }
        Ok(snapshot)
    }

    pub async fn dismiss_error(&self) -> ExperimentSnapshot {
        self.machine.lock().await.dismiss_error();
        self.publish(None).await
    }

    pub async fn check_backend(&self) -> Result<bool, ExperimentError> {
        Ok(self.submitter.backend().health_check().await?)
    }

    /// The redirect target, once the study is complete.
    pub async fn completion_redirect(&self) -> Option<String> {
        match self.machine.lock().await.phase() {
            Phase::Completion { redirect_url } => Some(redirect_url.clone()),
            _ => None,
        }
    }

    /// Stops the countdown and any generation polling.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some((_, mut timer)) = self.countdown.lock().await.take() {
            timer.cancel();
        }
        log_info!("experiment controller shut down");
    }

    async fn transition<F>(&self, apply: F) -> Result<ExperimentSnapshot, ExperimentError>
    where
        F: FnOnce(&mut ExperimentMachine, Instant, DateTime<Utc>) -> Result<(), ExperimentError>,
    {
        let result = {
            let mut machine = self.machine.lock().await;
            apply(&mut machine, Instant::now(), Utc::now())
        };
        self.settle(result).await
    }

    async fn settle(&self, result: Result<(), ExperimentError>) -> Result<ExperimentSnapshot, ExperimentError> {
        match result {
            Ok(()) => Ok(self.publish(None).await),
            Err(err) => {
                if err.is_retryable() {
                    log_warn!("{err}");
                } else {
                    log_error!("{err}");
                }
                self.publish(Some(&err)).await;
                Err(err)
            }
        }
    }

    /// Sends pending page timings, drops a countdown whose phase is gone and
    /// notifies the observer.
    async fn publish(&self, error: Option<&ExperimentError>) -> ExperimentSnapshot {
        let snapshot = {
            let mut machine = self.machine.lock().await;
            if let Some(err) = error {
                machine.surface_error(err);
            }
            for timing in machine.take_page_timings() {
                self.submitter.record_page_timing(timing);
            }

            let mut countdown = self.countdown.lock().await;
            let stale = matches!(countdown.as_ref(), Some((epoch, _)) if *epoch != machine.epoch());
            if stale {
                if let Some((_, mut timer)) = countdown.take() {
                    timer.cancel();
                }
            }
            snapshot_of(&machine, countdown.as_ref().map(|(_, timer)| timer.snapshot()))
        };
        self.observer.state_changed(&snapshot);
        snapshot
    }

    async fn start_countdown(&self, start: InputStart) {
        let observer = self.observer.clone();
        let controller = self.clone();
        let timer = CountdownTimer::start(
            start.duration,
            self.countdown_settings,
            move |countdown| observer.countdown_tick(&countdown),
            move || {
                tokio::spawn(async move {
                    controller.handle_expiry(start.epoch).await;
                });
            },
        );

        let previous = self.countdown.lock().await.replace((start.epoch, timer));
        if let Some((_, mut timer)) = previous {
            timer.cancel();
        }
    }

    async fn handle_expiry(&self, epoch: u64) {
        let expired = self
            .machine
            .lock()
            .await
            .expire_input(epoch, Instant::now(), Utc::now());
        if expired {
            self.publish(None).await;
        }
    }

    fn spawn_generation_poll(&self, participant_id: String) {
        let controller = self.clone();
        let cancel = self.shutdown.child_token();
        tokio::spawn(async move {
            let Some(outcome) = controller.poller.run(&participant_id, cancel).await else {
                return;
            };
            let result = controller.machine.lock().await.apply_generation_outcome(
                outcome,
                Instant::now(),
                Utc::now(),
            );
            // Failing here means the phase already moved on.
            if let Err(err) = controller.settle(result).await {
                log_warn!("generation outcome discarded: {err}");
            }
        });
    }
}

fn snapshot_of(machine: &ExperimentMachine, countdown: Option<CountdownSnapshot>) -> ExperimentSnapshot {
    let phase = machine.phase().clone();
    let session = machine.session();
    ExperimentSnapshot {
        run_id: session.run_id,
        participant_id: session.participant_id().map(str::to_string),
        page: phase.page_name(),
        countdown: countdown.filter(|_| matches!(phase, Phase::Input(_))),
        phase,
        trial_index: session.current_trial(),
        main_trial_count: session.main_trial_count(),
        submitting: machine.is_submitting(),
        error: machine.last_error().map(str::to_string),
    }
}

/// Roughly one tick report per second, or every tick in debug mode.
fn countdown_settings(config: &StudyConfig, debug: bool) -> CountdownSettings {
    let tick_ms = config.tick_interval_ms.max(1);
    let report_every_ticks = if debug {
        1
    } else {
        (1_000 / tick_ms).max(1) as u32
    };
    CountdownSettings {
        tick_interval: Duration::from_millis(tick_ms),
        warning_threshold: Duration::from_secs(config.warning_threshold_secs),
        report_every_ticks,
    }
}
