//! Category resolution for a single session.
//!
//! Resolution is a left-to-right chain of `Option` resolvers:
//! app override, then AI completion, then keyword rules. The first one that
//! yields a label wins; if none does, the session keeps its current category.

pub mod prompt;
pub mod rules;

use std::sync::Arc;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    errors::TrackerError,
    models::{AppOverrides, Session, Taxonomy},
    settings::{CategorizationSettings, SettingsStore},
};

use prompt::{
    categorization_prompt, CATEGORIZE_MAX_TOKENS, CATEGORIZE_SYSTEM_PROMPT,
    CATEGORIZE_TEMPERATURE,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub struct CategorizationEngine<C> {
    settings: Arc<SettingsStore>,
    client: Option<C>,
}

impl<C: CompletionClient> CategorizationEngine<C> {
    pub fn new(settings: Arc<SettingsStore>, client: Option<C>) -> Self {
        Self { settings, client }
    }

    /// Category for `session`. Never fails; the worst case returns
    /// `session.category` unchanged. Does not write anything.
    pub async fn categorize(&self, session: &Session) -> String {
        // Settings are re-read on every call; the taxonomy may have changed.
        let config = self.settings.categorization();

        if let Some(category) = resolve_override(&config.overrides, session) {
            return category;
        }
        if let Some(category) = self.resolve_ai(&config, session).await {
            return category;
        }
        resolve_rules(&config.taxonomy, session).unwrap_or_else(|| session.category.clone())
    }

    async fn resolve_ai(&self, config: &CategorizationSettings, session: &Session) -> Option<String> {
        if !config.ai_enabled {
            return None;
        }
        let client = self.client.as_ref()?;

        match ask_completion(client, config, session).await {
            Ok(category) => Some(category),
            Err(err) => {
                log_warn!(
                    "AI categorization fell back to rules for {} ({}): {err}",
                    session.process_name,
                    session.window_title
                );
                None
            }
        }
    }
}

async fn ask_completion<C: CompletionClient>(
    client: &C,
    config: &CategorizationSettings,
    session: &Session,
) -> Result<String, TrackerError> {
    let request = CompletionRequest {
        system_prompt: CATEGORIZE_SYSTEM_PROMPT.to_string(),
        user_prompt: categorization_prompt(&config.taxonomy, config.custom_prompt.as_deref(), session),
        max_tokens: CATEGORIZE_MAX_TOKENS,
        temperature: CATEGORIZE_TEMPERATURE,
    };

    let response = client.complete(request).await?;
    let category = parse_category(&response, &config.taxonomy)?;
    log_info!(
        "AI categorized {} - {} as {category}",
        session.process_name,
        session.window_title
    );
    Ok(category)
}

/// Accept a completion only if, trimmed and lowercased, it names a taxonomy member.
pub fn parse_category(response: &str, taxonomy: &Taxonomy) -> Result<String, TrackerError> {
    let candidate = response.trim().to_lowercase();
    taxonomy
        .resolve(&candidate)
        .map(str::to_string)
        .ok_or(TrackerError::InvalidCategoryResponse {
            response: candidate,
        })
}

pub fn resolve_override(overrides: &AppOverrides, session: &Session) -> Option<String> {
    overrides
        .get(&session.process_name)
        .and_then(|ov| ov.forced_category())
        .map(str::to_string)
}

/// Rule bucket for the session, only if that bucket exists in the taxonomy.
pub fn resolve_rules(taxonomy: &Taxonomy, session: &Session) -> Option<String> {
    let bucket = rules::categorize(
        &session.process_name,
        session.url.as_deref(),
        session.domain.as_deref(),
    );
    taxonomy.resolve(bucket).map(str::to_string)
}
