//! Live session tracking: a polling state machine owned by one worker task.

mod controller;
mod state;
mod tracker;
mod worker;

pub use controller::TrackerHandle;
pub use state::{TrackerStatus, TrackingState};
pub use tracker::{TickOutcome, Tracker, TrackerDeps};
