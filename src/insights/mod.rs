//! Productivity score and coaching insights over a set of sessions.

pub mod scoring;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    models::Session,
    settings::SettingsStore,
};

pub use scoring::{activity_summary, heuristic_score, parse_ai_score, ProductivityScore};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

const SCORE_SYSTEM_PROMPT: &str = "You are a productivity coach. Respond with valid JSON only.";
const SCORE_MAX_TOKENS: u32 = 100;
const SCORE_TEMPERATURE: f32 = 0.5;

const INSIGHTS_SYSTEM_PROMPT: &str = "You are an AI productivity coach that analyzes time tracking data and provides actionable insights to improve productivity and work-life balance.";
const INSIGHTS_MAX_TOKENS: u32 = 300;
const INSIGHTS_TEMPERATURE: f32 = 0.7;

const BUILT_IN_TIPS: [&str; 5] = [
    "Great job tracking your time! This is the first step toward better productivity awareness.",
    "Consider setting specific goals for each work session to maximize your productivity.",
    "Try using the Pomodoro Technique: 25 minutes of focused work followed by a 5-minute break.",
    "Review your most productive hours and schedule important tasks during those times.",
    "Take regular breaks to maintain focus and prevent burnout.",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub text: String,
    pub generated_at: DateTime<Utc>,
    pub is_default: bool,
}

impl Insights {
    fn built_in() -> Self {
        let tip = BUILT_IN_TIPS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(BUILT_IN_TIPS[0]);
        Self {
            text: tip.to_string(),
            generated_at: Utc::now(),
            is_default: true,
        }
    }
}

pub struct InsightsService<C> {
    settings: Arc<SettingsStore>,
    client: Option<C>,
}

impl<C: CompletionClient> InsightsService<C> {
    pub fn new(settings: Arc<SettingsStore>, client: Option<C>) -> Self {
        Self { settings, client }
    }

    fn ai_client(&self) -> Option<&C> {
        self.client.as_ref().filter(|_| self.settings.ai_enabled())
    }

    /// AI score when available, the weighted heuristic otherwise.
    pub async fn score(&self, sessions: &[Session]) -> ProductivityScore {
        let taxonomy = self.settings.taxonomy();
        let Some(client) = self.ai_client() else {
            return heuristic_score(sessions, &taxonomy);
        };

        let request = CompletionRequest {
            system_prompt: SCORE_SYSTEM_PROMPT.to_string(),
            user_prompt: format!(
                "Based on these activities, provide a productivity score from 1-10 and brief explanation:\n\n{}\n\nRespond in JSON format: {{\"score\": number, \"explanation\": \"string\"}}",
                activity_summary(sessions)
            ),
            max_tokens: SCORE_MAX_TOKENS,
            temperature: SCORE_TEMPERATURE,
        };

        match client.complete(request).await {
            Ok(response) => parse_ai_score(&response).unwrap_or_else(|| {
                log_warn!("Unusable productivity score response: {response}");
                heuristic_score(sessions, &taxonomy)
            }),
            Err(err) => {
                log_warn!("Productivity score fell back to heuristic: {err}");
                heuristic_score(sessions, &taxonomy)
            }
        }
    }

    /// Coaching text for `range_label`; a built-in tip when AI is off or fails.
    /// `summary` is an optional digest of the range's activity.
    pub async fn insights(&self, range_label: &str, summary: Option<&str>) -> Insights {
        let Some(client) = self.ai_client() else {
            return Insights::built_in();
        };

        let activity = summary
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("\n- Activity:\n{s}\n"))
            .unwrap_or_default();
        let request = CompletionRequest {
            system_prompt: INSIGHTS_SYSTEM_PROMPT.to_string(),
            user_prompt: format!(
                "Productivity Analysis Request:\n- Date Range: {range_label}\n- Context: User is tracking their computer activity to improve productivity\n{activity}\nPlease provide an analysis including:\n1. Overall productivity assessment\n2. Potential time-wasting activities\n3. Suggestions for improvement\n4. Positive patterns to reinforce\n5. Specific actionable recommendations\n\nFocus on being helpful, encouraging, and practical. Keep it under 200 words."
            ),
            max_tokens: INSIGHTS_MAX_TOKENS,
            temperature: INSIGHTS_TEMPERATURE,
        };

        match client.complete(request).await {
            Ok(text) => Insights {
                text,
                generated_at: Utc::now(),
                is_default: false,
            },
            Err(err) => {
                log_warn!("Insights fell back to a built-in tip: {err}");
                Insights::built_in()
            }
        }
    }
}
