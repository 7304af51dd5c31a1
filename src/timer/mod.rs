pub mod controller;
pub mod state;

pub use controller::{CountdownSettings, CountdownTimer};
pub use state::{CountdownSnapshot, CountdownState, CountdownStatus};
