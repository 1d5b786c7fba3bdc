//! Category vocabulary and per-app overrides.
//!
//! The taxonomy is user-editable at any time, so it is rebuilt from the
//! settings store for every operation and never cached.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "productivity",
    "development",
    "communication",
    "social_media",
    "entertainment",
    "news",
    "shopping",
    "system",
    "other",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub name: String,
    pub description: Option<String>,
    /// 0..=1, only used for productivity scoring.
    pub weight: Option<f64>,
}

/// Ordered, de-duplicated set of category labels.
///
/// Order only matters for display and prompts; membership is a set check.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    entries: Vec<CategoryEntry>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().map(|label| label.to_string()))
    }
}

impl Taxonomy {
    /// Blank labels and case-insensitive duplicates are dropped. An empty
    /// result falls back to the default vocabulary.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<CategoryEntry> = Vec::new();
        for label in labels {
            let name = label.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let lowered = name.to_lowercase();
            if entries.iter().any(|e| e.name.to_lowercase() == lowered) {
                continue;
            }
            entries.push(CategoryEntry {
                name: name.to_string(),
                description: None,
                weight: None,
            });
        }

        if entries.is_empty() {
            return Self::default();
        }
        Self { entries }
    }

    pub fn with_descriptions(mut self, descriptions: &HashMap<String, String>) -> Self {
        for entry in &mut self.entries {
            entry.description = descriptions
                .get(&entry.name)
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());
        }
        self
    }

    pub fn with_weights(mut self, weights: &HashMap<String, f64>) -> Self {
        for entry in &mut self.entries {
            entry.weight = weights
                .get(&entry.name)
                .copied()
                .filter(|w| w.is_finite())
                .map(|w| w.clamp(0.0, 1.0));
        }
        self
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical label for `candidate` if it names a member of the set.
    ///
    /// Matching is exact apart from case, since completion output is lowercased
    /// before it reaches this check.
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        let lowered = candidate.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.name.to_lowercase() == lowered)
            .map(|e| e.name.as_str())
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.resolve(candidate).is_some()
    }

    pub fn weight(&self, label: &str) -> Option<f64> {
        let lowered = label.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.name.to_lowercase() == lowered)
            .and_then(|e| e.weight)
    }

    /// One `- label` line per entry, `- label: description` when described.
    pub fn prompt_block(&self) -> String {
        self.entries
            .iter()
            .map(|e| match &e.description {
                Some(description) => format!("- {}: {}", e.name, description),
                None => format!("- {}", e.name),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Forced mapping for a process name. Exact match on the name only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppOverride {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AppOverride {
    pub fn forced_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn context(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

pub type AppOverrides = HashMap<String, AppOverride>;
