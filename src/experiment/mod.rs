//! The experiment flow: which screen the participant is on, what they may
//! do there, and what has to happen before they move on.
//!
//! `ExperimentMachine` holds the state and all transitions and never awaits.
//! `ExperimentController` wraps it for the async world: countdowns, the
//! generation poller, backend submissions and observer notifications.

pub mod controller;
pub mod machine;
pub mod phase;

pub use controller::{ExperimentController, ExperimentSnapshot, NoopObserver, PhaseObserver};
pub use machine::{AfterTrial, ExperimentMachine, InputStart};
pub use phase::{InputPhase, InputStage, Phase, RatingPhase};
