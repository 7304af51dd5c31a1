use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::utils::iso_timestamp;

/// Behavioural timing of one input phase, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimingRecord {
    /// Phase start to first character typed; `None` if nothing was typed.
    pub first_keypress_latency: Option<f64>,
    /// Phase start to time expiry.
    pub total_response_time: f64,
    pub selection_phase_start_time: Option<String>,
    pub selection_phase_duration: Option<f64>,
}

/// Observes one input phase from entry to exit.
///
/// Instants are passed in by the caller, so the recorder never reads a clock
/// itself and is exact under test.
#[derive(Debug, Clone, Copy)]
pub struct TimingRecorder {
    entered_at: Instant,
    first_keystroke_at: Option<Instant>,
    selection: Option<(Instant, DateTime<Utc>)>,
}

impl TimingRecorder {
    pub fn start(now: Instant) -> Self {
        Self {
            entered_at: now,
            first_keystroke_at: None,
            selection: None,
        }
    }

    /// Only the first call is remembered.
    pub fn record_keystroke(&mut self, now: Instant) {
        if self.first_keystroke_at.is_none() {
            self.first_keystroke_at = Some(now);
        }
    }

    /// Marks time expiry and the start of the selection stage.
    pub fn enter_selection(&mut self, now: Instant, wall: DateTime<Utc>) {
        if self.selection.is_none() {
            self.selection = Some((now, wall));
        }
    }

    pub fn finish(&self, now: Instant) -> TimingRecord {
        let latency = self
            .first_keystroke_at
            .map(|at| at.duration_since(self.entered_at).as_secs_f64());

        match self.selection {
            Some((selection_at, wall)) => TimingRecord {
                first_keypress_latency: latency,
                total_response_time: selection_at.duration_since(self.entered_at).as_secs_f64(),
                selection_phase_start_time: Some(iso_timestamp(wall)),
                selection_phase_duration: Some(now.duration_since(selection_at).as_secs_f64()),
            },
            None => TimingRecord {
                first_keypress_latency: latency,
                total_response_time: now.duration_since(self.entered_at).as_secs_f64(),
                selection_phase_start_time: None,
                selection_phase_duration: None,
            },
        }
    }
}
