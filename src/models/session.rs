use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Category carried by a session before it has ever been categorized.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// One contiguous span of focus on a single app/window/url identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub process_name: String,
    pub window_title: String,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub category: String,
    pub duration_secs: u64,
}

/// The tuple that decides session boundaries. `None == None` counts as unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionIdentity<'a> {
    pub process_name: &'a str,
    pub window_title: &'a str,
    pub url: Option<&'a str>,
}

impl Session {
    /// Build an open (not yet persisted, zero-duration) session from a probe snapshot.
    ///
    /// A url that does not parse is dropped together with its domain.
    pub fn open(
        process_name: impl Into<String>,
        window_title: impl Into<String>,
        url: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (url, domain) = match url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => match extract_domain(raw) {
                Some(domain) => (Some(raw.to_string()), Some(domain)),
                None => {
                    log::debug!("Ignoring unparseable url {raw}");
                    (None, None)
                }
            },
            None => (None, None),
        };

        Self {
            id: None,
            timestamp,
            process_name: process_name.into(),
            window_title: window_title.into(),
            url,
            domain,
            category: UNKNOWN_CATEGORY.to_string(),
            duration_secs: 0,
        }
    }

    pub fn identity(&self) -> SessionIdentity<'_> {
        SessionIdentity {
            process_name: &self.process_name,
            window_title: &self.window_title,
            url: self.url.as_deref(),
        }
    }

    pub fn same_activity(&self, other: &Session) -> bool {
        self.identity() == other.identity()
    }

    pub fn duration_minutes(&self) -> u64 {
        self.duration_secs / 60
    }
}

/// Host part of a url, if the url parses and has one.
pub fn extract_domain(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
}
