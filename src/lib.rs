pub mod categorization;
pub mod cli;
pub mod completion;
pub mod db;
pub mod errors;
pub mod insights;
pub mod models;
pub mod probe;
pub mod recategorize;
pub mod settings;
pub mod tracking;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use categorization::CategorizationEngine;
pub use completion::{CompletionClient, CompletionRequest, HttpCompletionClient, ServiceError};
pub use db::{Database, SessionStore};
pub use errors::TrackerError;
pub use models::{DateRange, Session, Taxonomy};
pub use recategorize::{BatchJob, BatchOptions, BatchRecategorizer, BatchReport};
pub use settings::SettingsStore;
pub use tracking::{TrackerHandle, TrackerStatus};

pub use cli::run;
