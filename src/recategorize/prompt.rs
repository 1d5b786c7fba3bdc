use crate::{
    categorization::prompt::{render_template, TemplateValues, CATEGORIZE_SYSTEM_PROMPT},
    models::{Session, Taxonomy},
};

pub const BATCH_SYSTEM_PROMPT: &str = CATEGORIZE_SYSTEM_PROMPT;
pub const BATCH_TEMPERATURE: f32 = 0.3;

pub const BATCH_FORMAT_INSTRUCTION: &str = "Respond with one category per window, in the same order as the list, separated by commas or new lines. Use only the category names above. Do not number them or add any other text.";

/// Enough room for one label per window plus separators.
pub fn batch_max_tokens(chunk_len: usize) -> u32 {
    let chunk_len = u32::try_from(chunk_len).unwrap_or(u32::MAX / 16);
    chunk_len.saturating_mul(12).saturating_add(20)
}

/// `1. title` lines, in chunk order.
pub fn numbered_titles(chunk: &[Session]) -> String {
    chunk
        .iter()
        .enumerate()
        .map(|(i, session)| format!("{}. {}", i + 1, session.window_title))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User prompt for one chunk of sessions from the same process.
pub fn chunk_prompt(
    process_name: &str,
    chunk: &[Session],
    taxonomy: &Taxonomy,
    app_context: Option<&str>,
    custom_template: Option<&str>,
) -> String {
    let titles = numbered_titles(chunk);
    let context = app_context
        .map(|description| format!("\nAbout {process_name}: {description}\n"))
        .unwrap_or_default();

    if let Some(template) = custom_template {
        let current = chunk
            .iter()
            .map(|s| s.category.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let rendered = render_template(
            template,
            TemplateValues {
                categories: &taxonomy.prompt_block(),
                app_name: process_name,
                window_title: &titles,
                current_category: &current,
            },
        );
        // Every chunk prompt must list its windows, whatever the template says.
        let windows = if template.contains("{windowTitle}") {
            String::new()
        } else {
            format!("\nWindows:\n{titles}\n")
        };
        return format!("{rendered}\n{context}{windows}\n{BATCH_FORMAT_INSTRUCTION}");
    }

    format!(
        "Categorize each of these {process_name} windows into one of these categories:\n{}\n{context}\nWindows:\n{titles}\n\n{BATCH_FORMAT_INSTRUCTION}",
        taxonomy.prompt_block(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stored_session;
    use std::collections::HashMap;

    fn chunk() -> Vec<Session> {
        vec![
            stored_session("a", "Arc", "Inbox", "work"),
            stored_session("b", "Arc", "YouTube", "unknown"),
        ]
    }

    #[test]
    fn default_prompt_numbers_titles_and_lists_descriptions() {
        let mut descriptions = HashMap::new();
        descriptions.insert("break".to_string(), "anything not work".to_string());
        let taxonomy = Taxonomy::new(["work", "break"]).with_descriptions(&descriptions);

        let prompt = chunk_prompt("Arc", &chunk(), &taxonomy, Some("the browser"), None);
        assert!(prompt.contains("- work\n- break: anything not work"));
        assert!(prompt.contains("About Arc: the browser"));
        assert!(prompt.contains("Windows:\n1. Inbox\n2. YouTube\n"));
        assert!(prompt.ends_with(BATCH_FORMAT_INSTRUCTION));
    }

    #[test]
    fn custom_template_gets_titles_and_current_categories() {
        let taxonomy = Taxonomy::new(["work", "break"]);
        let prompt = chunk_prompt(
            "Arc",
            &chunk(),
            &taxonomy,
            None,
            Some("{appName}|{windowTitle}|{currentCategory}|{categories}"),
        );
        assert_eq!(
            prompt,
            format!("Arc|1. Inbox\n2. YouTube|work, unknown|- work\n- break\n\n{BATCH_FORMAT_INSTRUCTION}")
        );
    }

    #[test]
    fn custom_template_without_title_placeholder_still_lists_windows() {
        let taxonomy = Taxonomy::new(["work", "break"]);
        let chunk = vec![stored_session("a", "kitty", "cargo test - nvim", "break")];
        let prompt = chunk_prompt(
            "kitty",
            &chunk,
            &taxonomy,
            Some("terminal used for coding"),
            Some("Classify {appName} into {categories}"),
        );
        assert!(prompt.starts_with("Classify kitty into - work\n- break\n"));
        assert!(prompt.contains("About kitty: terminal used for coding"));
        assert!(prompt.contains("Windows:\n1. cargo test - nvim\n"));
        assert!(prompt.ends_with(BATCH_FORMAT_INSTRUCTION));
    }

    #[test]
    fn token_budget_grows_with_chunk() {
        assert!(batch_max_tokens(30) > batch_max_tokens(15));
        assert_eq!(batch_max_tokens(0), 20);
    }
}
