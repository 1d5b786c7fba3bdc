//! Hosted language-model completion capability.
//!
//! The rest of the crate only sees [`CompletionClient`]; the HTTP
//! implementation lives in [`http`].

pub mod http;

use std::{future::Future, sync::Arc};

use thiserror::Error;

pub use http::HttpCompletionClient;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("completion service is not configured (missing API key)")]
    NotConfigured,

    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion service returned no text")]
    EmptyResponse,
}

pub trait CompletionClient: Send + Sync {
    /// One chat completion round trip. Returns the trimmed completion text.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

impl<T: CompletionClient> CompletionClient for Arc<T> {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send {
        self.as_ref().complete(request)
    }
}
