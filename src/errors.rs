//! Failure taxonomy for the tracking and categorization core.
//!
//! None of these are fatal. Each one is logged where it happens and the caller
//! degrades to a safe default: skip the tick, keep the previous category, skip
//! the batch group.

use thiserror::Error;

use crate::completion::ServiceError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("no foreground window available")]
    ProbeUnavailable,

    #[error("completion service failed: {0}")]
    Service(#[from] ServiceError),

    #[error("completion returned {response:?}, which is not in the current taxonomy")]
    InvalidCategoryResponse { response: String },

    #[error("failed to persist session for {process_name}: {reason}")]
    Persistence { process_name: String, reason: String },

    #[error("batch group '{process_name}' failed: {reason}")]
    ChunkProcessing { process_name: String, reason: String },
}

impl TrackerError {
    pub fn persistence(process_name: &str, err: &anyhow::Error) -> Self {
        TrackerError::Persistence {
            process_name: process_name.to_string(),
            reason: format!("{err:#}"),
        }
    }

    pub fn chunk(process_name: &str, reason: impl std::fmt::Display) -> Self {
        TrackerError::ChunkProcessing {
            process_name: process_name.to_string(),
            reason: reason.to_string(),
        }
    }
}
