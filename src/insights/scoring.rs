use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Session, Taxonomy};

pub const NEUTRAL_SCORE: u8 = 5;
const DEFAULT_WEIGHT: f64 = 0.5;

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json object pattern is valid"));

/// Keyword fragments of a category name and the weight they imply.
/// First match wins.
const KEYWORD_WEIGHTS: &[(&[&str], f64)] = &[
    (&["productiv", "develop", "work", "focus", "study", "learn"], 1.0),
    (&["communic", "meeting", "email"], 0.7),
    (&["news"], 0.5),
    (&["social"], 0.3),
    (&["shopping"], 0.3),
    (&["entertain", "gaming", "game", "video"], 0.2),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityScore {
    pub score: u8,
    pub explanation: String,
}

/// Configured weight for `label`, else one guessed from its name.
pub fn category_weight(taxonomy: &Taxonomy, label: &str) -> f64 {
    if let Some(weight) = taxonomy.weight(label) {
        return weight;
    }
    let name = label.to_lowercase();
    KEYWORD_WEIGHTS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| name.contains(k)))
        .map(|(_, weight)| *weight)
        .unwrap_or(DEFAULT_WEIGHT)
}

/// `round(10 * weighted / total)` clamped to 1..=10; 5 when nothing was tracked.
pub fn heuristic_score(sessions: &[Session], taxonomy: &Taxonomy) -> ProductivityScore {
    let (total, weighted) = sessions.iter().fold((0.0, 0.0), |(total, weighted), s| {
        let secs = s.duration_secs as f64;
        (total + secs, weighted + secs * category_weight(taxonomy, &s.category))
    });

    let score = if total > 0.0 {
        clamp_score((weighted / total * 10.0).round())
    } else {
        NEUTRAL_SCORE
    };

    ProductivityScore {
        score,
        explanation: format!("Based on activity categorization, your productivity score is {score}/10."),
    }
}

fn clamp_score(raw: f64) -> u8 {
    raw.clamp(1.0, 10.0) as u8
}

#[derive(Deserialize)]
struct RawScore {
    score: f64,
    #[serde(default)]
    explanation: String,
}

/// Pull the first `{...}` out of a completion and decode it as a score.
pub fn parse_ai_score(response: &str) -> Option<ProductivityScore> {
    let object = JSON_OBJECT.find(response)?;
    let raw: RawScore = serde_json::from_str(object.as_str()).ok()?;
    if !raw.score.is_finite() {
        return None;
    }
    Some(ProductivityScore {
        score: clamp_score(raw.score.round()),
        explanation: raw.explanation.trim().to_string(),
    })
}

/// One `process (category): N min` line per session.
pub fn activity_summary(sessions: &[Session]) -> String {
    sessions
        .iter()
        .map(|s| format!("{} ({}): {} min", s.process_name, s.category, s.duration_minutes()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stored_session;
    use std::collections::HashMap;

    fn timed(category: &str, secs: u64) -> Session {
        let mut session = stored_session("x", "App", "window", category);
        session.duration_secs = secs;
        session
    }

    #[test]
    fn weighted_scenario_scores_six() {
        let mut weights = HashMap::new();
        weights.insert("productivity".to_string(), 1.0);
        weights.insert("entertainment".to_string(), 0.2);
        let taxonomy = Taxonomy::new(["productivity", "entertainment"]).with_weights(&weights);

        let sessions = [
            timed("productivity", 600),
            timed("productivity", 600),
            timed("entertainment", 600),
            timed("entertainment", 600),
        ];
        assert_eq!(heuristic_score(&sessions, &taxonomy).score, 6);
    }

    #[test]
    fn empty_history_is_neutral() {
        let score = heuristic_score(&[], &Taxonomy::default());
        assert_eq!(score.score, NEUTRAL_SCORE);
    }

    #[test]
    fn unweighted_names_use_keywords() {
        let taxonomy = Taxonomy::new(["deep work", "social_media", "misc"]);
        assert_eq!(category_weight(&taxonomy, "deep work"), 1.0);
        assert_eq!(category_weight(&taxonomy, "social_media"), 0.3);
        assert_eq!(category_weight(&taxonomy, "misc"), 0.5);
    }

    #[test]
    fn score_is_clamped_to_at_least_one() {
        let mut weights = HashMap::new();
        weights.insert("gaming".to_string(), 0.0);
        let taxonomy = Taxonomy::new(["gaming"]).with_weights(&weights);
        assert_eq!(heuristic_score(&[timed("gaming", 300)], &taxonomy).score, 1);
    }

    #[test]
    fn ai_score_tolerates_commentary() {
        let parsed = parse_ai_score(
            "Sure! Here you go:\n{\"score\": 7, \"explanation\": \"Mostly focused.\"}\nHope that helps.",
        )
        .unwrap();
        assert_eq!(parsed.score, 7);
        assert_eq!(parsed.explanation, "Mostly focused.");

        assert!(parse_ai_score("no json here").is_none());
        assert!(parse_ai_score("{\"explanation\": \"missing score\"}").is_none());
        assert_eq!(parse_ai_score("{\"score\": 42}").unwrap().score, 10);
    }

    #[test]
    fn summary_lists_minutes_per_session() {
        let summary = activity_summary(&[timed("development", 150), timed("other", 59)]);
        assert_eq!(summary, "App (development): 2 min\nApp (other): 0 min");
    }
}
