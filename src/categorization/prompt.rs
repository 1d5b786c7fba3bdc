use crate::models::{Session, Taxonomy};

pub const CATEGORIZE_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that categorizes computer activities. Respond with only the category name.";
pub const CATEGORIZE_MAX_TOKENS: u32 = 20;
pub const CATEGORIZE_TEMPERATURE: f32 = 0.3;

pub const PLACEHOLDER_CATEGORIES: &str = "{categories}";
pub const PLACEHOLDER_APP_NAME: &str = "{appName}";
pub const PLACEHOLDER_WINDOW_TITLE: &str = "{windowTitle}";
pub const PLACEHOLDER_CURRENT_CATEGORY: &str = "{currentCategory}";

/// Values substituted into a user prompt template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub categories: &'a str,
    pub app_name: &'a str,
    pub window_title: &'a str,
    pub current_category: &'a str,
}

/// Replace the first occurrence of each placeholder in `template`.
///
/// Substitution is single pass over the original template, so placeholder
/// text inside a substituted value is never expanded. Missing placeholders
/// are simply not substituted; extra occurrences stay literal.
pub fn render_template(template: &str, values: TemplateValues<'_>) -> String {
    let replacements = [
        (PLACEHOLDER_CATEGORIES, values.categories),
        (PLACEHOLDER_APP_NAME, values.app_name),
        (PLACEHOLDER_WINDOW_TITLE, values.window_title),
        (PLACEHOLDER_CURRENT_CATEGORY, values.current_category),
    ];

    let mut hits: Vec<(usize, &str, &str)> = replacements
        .iter()
        .filter_map(|(placeholder, value)| {
            template
                .find(placeholder)
                .map(|pos| (pos, *placeholder, *value))
        })
        .collect();
    hits.sort_by_key(|(pos, _, _)| *pos);

    let mut rendered = String::with_capacity(template.len() + 64);
    let mut cursor = 0;
    for (pos, placeholder, value) in hits {
        if pos < cursor {
            continue;
        }
        rendered.push_str(&template[cursor..pos]);
        rendered.push_str(value);
        cursor = pos + placeholder.len();
    }
    rendered.push_str(&template[cursor..]);
    rendered
}

pub fn default_prompt(taxonomy: &Taxonomy, session: &Session) -> String {
    let described = taxonomy.entries().iter().any(|e| e.description.is_some());
    let guidance = if described {
        "\nUse the category descriptions above to guide your decision.\n"
    } else {
        ""
    };

    format!(
        "Categorize this activity into one of these categories:\n{}\n\nActivity: {} - {}\nCurrent category: {}\n{}\nRespond with only the category name.",
        taxonomy.prompt_block(),
        session.process_name,
        session.window_title,
        session.category,
        guidance,
    )
}

/// User prompt for one session: the custom template if set, else the default.
pub fn categorization_prompt(
    taxonomy: &Taxonomy,
    custom_template: Option<&str>,
    session: &Session,
) -> String {
    match custom_template {
        Some(template) => render_template(
            template,
            TemplateValues {
                categories: &taxonomy.prompt_block(),
                app_name: &session.process_name,
                window_title: &session.window_title,
                current_category: &session.category,
            },
        ),
        None => default_prompt(taxonomy, session),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn values() -> TemplateValues<'static> {
        TemplateValues {
            categories: "- work\n- break",
            app_name: "kitty",
            window_title: "Terminal - nvim",
            current_category: "unknown",
        }
    }

    #[test]
    fn substitutes_each_placeholder_once() {
        let rendered = render_template(
            "{appName} / {windowTitle} / {currentCategory}\n{categories}\n{appName}",
            values(),
        );
        assert_eq!(
            rendered,
            "kitty / Terminal - nvim / unknown\n- work\n- break\n{appName}"
        );
    }

    #[test]
    fn missing_placeholders_are_left_alone() {
        let rendered = render_template("Pick one for {appName}. {unknownField}", values());
        assert_eq!(rendered, "Pick one for kitty. {unknownField}");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let v = TemplateValues {
            window_title: "{categories}",
            ..values()
        };
        let rendered = render_template("{windowTitle} then {categories}", v);
        assert_eq!(rendered, "{categories} then - work\n- break");
    }

    #[test]
    fn default_prompt_lists_taxonomy_and_activity() {
        let mut descriptions = HashMap::new();
        descriptions.insert("work".to_string(), "billable".to_string());
        let taxonomy = Taxonomy::new(["work", "break"]).with_descriptions(&descriptions);
        let session = Session::open("Code", "main.rs", None, Utc::now());

        let prompt = categorization_prompt(&taxonomy, None, &session);
        assert!(prompt.contains("- work: billable\n- break"));
        assert!(prompt.contains("Activity: Code - main.rs"));
        assert!(prompt.contains("Current category: unknown"));
        assert!(prompt.ends_with("Respond with only the category name."));
    }
}
