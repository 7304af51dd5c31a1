//! Runner for a timed prompt-writing study: participants write image prompts
//! under a countdown, pick their best one, and later rate the images the
//! backend generated from their picks.

pub mod api;
pub mod config;
pub mod error;
pub mod experiment;
pub mod generation;
pub mod models;
pub mod plan;
pub mod telemetry;
pub mod timer;
pub mod timing;
pub mod utils;

#[cfg(feature = "desktop")]
mod desktop;

pub use api::{ExperimentBackend, HttpBackend};
pub use config::StudyConfig;
pub use error::{BackendError, ExperimentError, PlanError, ValidationError};
pub use experiment::{ExperimentController, ExperimentSnapshot, Phase, PhaseObserver};

#[cfg(feature = "desktop")]
pub use desktop::run;
