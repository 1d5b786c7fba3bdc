use super::{run_probe_command, WindowProbe, WindowSnapshot};

const FIELD_SEPARATOR: &str = "|||";

const FRONT_WINDOW_SCRIPT: &str = r#"set frontApp to ""
set frontWindow to ""
tell application "System Events"
set frontApp to name of first application process whose frontmost is true
try
set frontWindow to name of first window of process frontApp
end try
end tell
return frontApp & "|||" & frontWindow"#;

/// Browsers whose active tab url and title can be read over AppleScript.
/// Each is queried in its own script so a missing browser never breaks the
/// front-window query.
const TAB_QUERIES: &[(&str, &str, &str)] = &[
    ("Arc", "URL of active tab of front window", "title of active tab of front window"),
    ("Google Chrome", "URL of active tab of front window", "title of active tab of front window"),
    ("Safari", "URL of current tab of front window", "name of current tab of front window"),
];

/// Frontmost app via System Events, plus the active tab for known browsers.
#[derive(Default)]
pub struct AppleScriptProbe;

impl AppleScriptProbe {
    pub fn new() -> Self {
        Self
    }
}

fn tab_script(app: &str) -> Option<String> {
    TAB_QUERIES
        .iter()
        .find(|(name, _, _)| *name == app)
        .map(|(name, url_expr, title_expr)| {
            format!(
                "tell application \"{name}\" to return ({url_expr}) & \"{FIELD_SEPARATOR}\" & ({title_expr})"
            )
        })
}

/// `app|||window|||url|||tabTitle`. A non-empty tab title replaces the window title.
pub(crate) fn parse_output(stdout: &str) -> Option<WindowSnapshot> {
    let fields: Vec<&str> = stdout.trim().split(FIELD_SEPARATOR).collect();
    let process_name = fields.first().map(|s| s.trim()).filter(|s| !s.is_empty())?;
    let window_title = fields.get(1).map(|s| s.trim()).unwrap_or_default();
    let url = fields
        .get(2)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let tab_title = fields.get(3).map(|s| s.trim()).filter(|s| !s.is_empty());

    Some(WindowSnapshot {
        process_name: process_name.to_string(),
        window_title: tab_title.unwrap_or(window_title).to_string(),
        url,
    })
}

impl WindowProbe for AppleScriptProbe {
    async fn current_window(&self) -> Option<WindowSnapshot> {
        let front = run_probe_command("osascript", &["-e", FRONT_WINDOW_SCRIPT]).await?;
        let app = front.split(FIELD_SEPARATOR).next().unwrap_or_default().trim().to_string();

        let tab = match tab_script(&app) {
            Some(script) => run_probe_command("osascript", &["-e", script.as_str()])
                .await
                .unwrap_or_default(),
            None => String::new(),
        };

        parse_output(&format!("{front}{FIELD_SEPARATOR}{tab}"))
    }
}
