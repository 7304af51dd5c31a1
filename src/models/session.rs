use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ExperimentError, plan::SessionPlan};

use super::{ConditionOrder, TrialParams};

/// One participant's run. Lives only in memory; the backend receives the
/// per-phase payloads, never this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Local identifier used to correlate log lines and shell events.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    participant_id: Option<String>,
    plan: SessionPlan,
    current_trial: usize,
}

impl Session {
    pub fn new(plan: SessionPlan, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            participant_id: None,
            plan,
            current_trial: 0,
        }
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    /// Sets the externally supplied participant id. It cannot change later.
    pub fn set_participant_id(&mut self, id: String) -> Result<(), ExperimentError> {
        if self.participant_id.is_some() {
            return Err(ExperimentError::ParticipantIdAlreadySet);
        }
        self.participant_id = Some(id);
        Ok(())
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn condition_order(&self) -> ConditionOrder {
        self.plan.condition_order()
    }

    pub fn current_trial(&self) -> usize {
        self.current_trial
    }

    pub fn main_trial_count(&self) -> usize {
        self.plan.main_trial_count()
    }

    pub fn trial(&self, index: usize) -> Option<TrialParams> {
        self.plan.trial(index)
    }

    pub fn current_trial_params(&self) -> Option<TrialParams> {
        self.plan.trial(self.current_trial)
    }

    pub(crate) fn advance_trial(&mut self) {
        self.current_trial += 1;
    }
}
