//! Keyword heuristics used when no override or AI answer is available.
//!
//! Buckets are checked in table order and matched by substring against the
//! lowercased input; the first hit wins.

pub const FALLBACK_BUCKET: &str = "other";

const DOMAIN_RULES: &[(&str, &[&str])] = &[
    (
        "social_media",
        &[
            "facebook.com",
            "twitter.com",
            "instagram.com",
            "linkedin.com",
            "tiktok.com",
            "youtube.com",
        ],
    ),
    (
        "productivity",
        &[
            "gmail.com",
            "outlook.com",
            "notion.so",
            "trello.com",
            "asana.com",
            "slack.com",
        ],
    ),
    (
        "development",
        &["github.com", "stackoverflow.com", "gitlab.com", "bitbucket.org"],
    ),
    ("news", &["news", "bbc", "cnn", "reuters"]),
    ("shopping", &["amazon", "ebay", "shopify", "etsy"]),
    ("entertainment", &["netflix", "spotify", "twitch", "reddit"]),
];

const APP_RULES: &[(&str, &[&str])] = &[
    (
        "development",
        &[
            "code",
            "sublime",
            "webstorm",
            "intellij",
            "xcode",
            "android studio",
        ],
    ),
    (
        "productivity",
        &[
            "chrome",
            "firefox",
            "safari",
            "edge",
            "word",
            "excel",
            "powerpoint",
            "notion",
        ],
    ),
    (
        "communication",
        &["slack", "discord", "teams", "zoom", "skype", "whatsapp"],
    ),
    ("entertainment", &["spotify", "itunes", "vlc", "netflix"]),
    ("system", &["finder", "explorer", "terminal", "cmd"]),
];

fn first_match(rules: &[(&'static str, &[&str])], input: &str) -> &'static str {
    let lowered = input.to_lowercase();
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(bucket, _)| *bucket)
        .unwrap_or(FALLBACK_BUCKET)
}

pub fn categorize_website(domain: &str) -> &'static str {
    first_match(DOMAIN_RULES, domain)
}

pub fn categorize_application(process_name: &str) -> &'static str {
    first_match(APP_RULES, process_name)
}

/// Domain rules when a url or domain is known, process rules otherwise.
pub fn categorize(process_name: &str, url: Option<&str>, domain: Option<&str>) -> &'static str {
    if url.is_some() || domain.is_some() {
        categorize_website(domain.unwrap_or_default())
    } else {
        categorize_application(process_name)
    }
}
