//! Batch re-categorization of historical sessions.
//!
//! Sessions are grouped by process (first appearance order) and each group is
//! split into fixed-size chunks, so one completion call covers a whole chunk.
//! A failing group is logged and skipped; the run always reports counts.

pub mod parse;
pub mod prompt;

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    completion::{CompletionClient, CompletionRequest},
    db::SessionStore,
    errors::TrackerError,
    models::{AppOverrides, DateRange, Session, Taxonomy},
    settings::SettingsStore,
};

use parse::parse_labels;
use prompt::{batch_max_tokens, chunk_prompt, BATCH_SYSTEM_PROMPT, BATCH_TEMPERATURE};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const DEFAULT_CHUNK_SIZE: usize = 30;
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub chunk_size: usize,
    /// Pause before every completion call after the first.
    pub chunk_delay: Duration,
    pub cancel: Option<CancellationToken>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            cancel: None,
        }
    }
}

/// Inputs of one run. Category descriptions travel inside `taxonomy`.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub range: DateRange,
    pub taxonomy: Taxonomy,
    pub overrides: AppOverrides,
    pub custom_template: Option<String>,
}

impl BatchJob {
    pub fn from_settings(settings: &SettingsStore, range: DateRange) -> Self {
        Self {
            range,
            taxonomy: settings.taxonomy(),
            overrides: settings.app_overrides(),
            custom_template: settings.custom_prompt(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub updated_count: usize,
    pub total_count: usize,
    pub failed_groups: usize,
    pub cancelled: bool,
}

/// `(process_name, sessions)` in order of first appearance.
pub fn group_by_process(sessions: Vec<Session>) -> Vec<(String, Vec<Session>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Session>)> = Vec::new();

    for session in sessions {
        match index.get(&session.process_name) {
            Some(&slot) => groups[slot].1.push(session),
            None => {
                index.insert(session.process_name.clone(), groups.len());
                groups.push((session.process_name.clone(), vec![session]));
            }
        }
    }

    groups
}

pub struct BatchRecategorizer<S, C> {
    store: S,
    client: C,
    options: BatchOptions,
}

impl<S: SessionStore, C: CompletionClient> BatchRecategorizer<S, C> {
    pub fn new(store: S, client: C) -> Self {
        Self::with_options(store, client, BatchOptions::default())
    }

    pub fn with_options(store: S, client: C, mut options: BatchOptions) -> Self {
        options.chunk_size = options.chunk_size.max(1);
        Self {
            store,
            client,
            options,
        }
    }

    pub async fn run(&self, job: &BatchJob) -> Result<BatchReport> {
        let sessions = self.store.fetch_sessions(job.range).await?;
        let mut report = BatchReport {
            total_count: sessions.len(),
            ..BatchReport::default()
        };
        log_info!(
            "Re-categorizing {} sessions in range: {}",
            report.total_count,
            job.range
        );

        let mut calls_made = 0usize;
        for (process_name, group) in group_by_process(sessions) {
            if self.is_cancelled() {
                report.cancelled = true;
                log_warn!("Re-categorization cancelled before group '{process_name}'");
                break;
            }

            let planned = match job
                .overrides
                .get(&process_name)
                .and_then(|ov| ov.forced_category())
            {
                Some(category) => vec![category.to_string(); group.len()],
                None => match self
                    .plan_group(&process_name, &group, job, &mut calls_made)
                    .await
                {
                    Ok(labels) => labels,
                    Err(err) => {
                        report.failed_groups += 1;
                        log_error!("{err}");
                        continue;
                    }
                },
            };

            report.updated_count += self.apply(&group, &planned).await;
        }

        log_info!(
            "Updated {} of {} sessions ({} groups failed)",
            report.updated_count,
            report.total_count,
            report.failed_groups
        );
        Ok(report)
    }

    /// New labels for a whole group, positionally aligned per chunk. Nothing is
    /// written until every chunk of the group has been answered and parsed.
    /// A chunk whose response lost labels yields a shorter slice; the sessions
    /// past its end keep their category.
    async fn plan_group(
        &self,
        process_name: &str,
        group: &[Session],
        job: &BatchJob,
        calls_made: &mut usize,
    ) -> Result<Vec<String>, TrackerError> {
        let app_context = job.overrides.get(process_name).and_then(|ov| ov.context());
        let mut planned = Vec::with_capacity(group.len());

        for chunk in group.chunks(self.options.chunk_size) {
            if *calls_made > 0 {
                self.pause().await;
            }
            *calls_made += 1;

            let request = CompletionRequest {
                system_prompt: BATCH_SYSTEM_PROMPT.to_string(),
                user_prompt: chunk_prompt(
                    process_name,
                    chunk,
                    &job.taxonomy,
                    app_context,
                    job.custom_template.as_deref(),
                ),
                max_tokens: batch_max_tokens(chunk.len()),
                temperature: BATCH_TEMPERATURE,
            };

            let response = self
                .client
                .complete(request)
                .await
                .map_err(|err| TrackerError::chunk(process_name, err))?;

            let labels = parse_labels(&response, &job.taxonomy);
            if labels.is_empty() {
                log_warn!(
                    "'{process_name}': no valid category in response {response:?}; chunk left unchanged"
                );
            } else if labels.len() != chunk.len() {
                log_warn!(
                    "'{process_name}': {} labels for {} sessions; mapping positionally anyway",
                    labels.len(),
                    chunk.len()
                );
            }

            // Pad so later chunks stay aligned with their own sessions.
            let mut chunk_labels: Vec<String> = labels.into_iter().take(chunk.len()).collect();
            let matched = chunk_labels.len();
            chunk_labels.extend(chunk[matched..].iter().map(|s| s.category.clone()));
            planned.extend(chunk_labels);
        }

        Ok(planned)
    }

    async fn apply(&self, group: &[Session], planned: &[String]) -> usize {
        let mut updated = 0;
        for (session, new_category) in group.iter().zip(planned) {
            if *new_category == session.category {
                continue;
            }
            let Some(id) = session.id.as_deref() else {
                continue;
            };

            match self.store.update_session_category(id, new_category).await {
                Ok(true) => {
                    updated += 1;
                    log_info!(
                        "[UPDATED] {} ({}) {} -> {}",
                        session.window_title,
                        session.process_name,
                        session.category,
                        new_category
                    );
                }
                Ok(false) => log_warn!("Session {id} vanished before its category was updated"),
                Err(err) => {
                    log_warn!("{}", TrackerError::persistence(&session.process_name, &err))
                }
            }
        }
        updated
    }

    async fn pause(&self) {
        if self.options.chunk_delay.is_zero() {
            return;
        }
        match &self.options.cancel {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.options.chunk_delay) => {}
                    _ = token.cancelled() => {}
                }
            }
            None => tokio::time::sleep(self.options.chunk_delay).await,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        completion::ServiceError,
        models::AppOverride,
        testing::{stored_session, RecordingStore, ScriptedCompletion},
    };
    use std::sync::Arc;

    fn fast() -> BatchOptions {
        BatchOptions {
            chunk_delay: Duration::ZERO,
            ..BatchOptions::default()
        }
    }

    fn job(labels: &[&str]) -> BatchJob {
        BatchJob {
            range: DateRange::All,
            taxonomy: Taxonomy::new(labels.iter().copied()),
            overrides: AppOverrides::new(),
            custom_template: None,
        }
    }

    fn sessions(process: &str, count: usize, category: &str) -> Vec<Session> {
        (0..count)
            .map(|i| stored_session(&format!("{process}-{i}"), process, &format!("{process} tab {i}"), category))
            .collect()
    }

    fn repeated(label: &str, count: usize) -> String {
        vec![label; count].join(", ")
    }

    #[tokio::test]
    async fn seventy_five_sessions_cost_three_calls() {
        let store = Arc::new(RecordingStore::with_sessions(sessions("Arc", 75, "break")));
        let client = Arc::new(ScriptedCompletion::default());
        for size in [30, 30, 15] {
            client.push_ok(&repeated("work", size));
        }
        let batch = BatchRecategorizer::with_options(store.clone(), client.clone(), fast());

        let report = batch.run(&job(&["work", "break"])).await.unwrap();

        let sizes: Vec<usize> = client
            .requests()
            .iter()
            .map(|r| r.user_prompt.lines().filter(|l| l.contains("Arc tab")).count())
            .collect();
        assert_eq!(sizes, vec![30, 30, 15]);
        assert_eq!(report.updated_count, 75);
        assert_eq!(report.total_count, 75);
    }

    #[tokio::test]
    async fn unchanged_labels_are_not_written() {
        let mut seeded = sessions("Code", 2, "work");
        seeded.extend(sessions("Slack", 1, "work"));
        let store = Arc::new(RecordingStore::with_sessions(seeded));
        let client = Arc::new(ScriptedCompletion::new(["work, break", "work"]));
        let batch = BatchRecategorizer::with_options(store.clone(), client.clone(), fast());

        let report = batch.run(&job(&["work", "break"])).await.unwrap();

        assert_eq!(report.updated_count, 1);
        assert_eq!(store.updates(), vec![("Code-1".to_string(), "break".to_string())]);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn failed_group_is_skipped_and_the_run_continues() {
        let mut seeded = sessions("Arc", 2, "break");
        seeded.extend(sessions("Code", 1, "break"));
        let store = Arc::new(RecordingStore::with_sessions(seeded));
        let client = Arc::new(ScriptedCompletion::default());
        client.push_err(ServiceError::Status {
            status: 500,
            body: "upstream".into(),
        });
        client.push_ok("work");
        let batch = BatchRecategorizer::with_options(store.clone(), client.clone(), fast());

        let report = batch.run(&job(&["work", "break"])).await.unwrap();

        assert_eq!(report.failed_groups, 1);
        assert_eq!(report.updated_count, 1);
        assert_eq!(report.total_count, 3);
        assert_eq!(store.updates(), vec![("Code-0".to_string(), "work".to_string())]);
    }

    #[tokio::test]
    async fn chunk_without_valid_labels_keeps_the_rest_of_the_group() {
        let store = Arc::new(RecordingStore::with_sessions(sessions("Arc", 3, "break")));
        let client = Arc::new(ScriptedCompletion::new(["work, work", "gaming"]));
        let options = BatchOptions {
            chunk_size: 2,
            ..fast()
        };
        let batch = BatchRecategorizer::with_options(store.clone(), client.clone(), options);

        let report = batch.run(&job(&["work", "break"])).await.unwrap();

        assert_eq!(client.call_count(), 2);
        assert_eq!(report.failed_groups, 0);
        assert_eq!(report.updated_count, 2);
        assert_eq!(
            store.updates(),
            vec![
                ("Arc-0".to_string(), "work".to_string()),
                ("Arc-1".to_string(), "work".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn group_updates_wait_for_every_chunk() {
        let store = Arc::new(RecordingStore::with_sessions(sessions("Arc", 3, "break")));
        let client = Arc::new(ScriptedCompletion::default());
        client.push_ok("work, work");
        client.push_err(ServiceError::Status {
            status: 503,
            body: "overloaded".into(),
        });
        let options = BatchOptions {
            chunk_size: 2,
            ..fast()
        };
        let batch = BatchRecategorizer::with_options(store.clone(), client.clone(), options);

        let report = batch.run(&job(&["work", "break"])).await.unwrap();

        assert_eq!(client.call_count(), 2);
        assert_eq!(report.failed_groups, 1);
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn dropped_labels_shift_positions_within_the_chunk() {
        let store = Arc::new(RecordingStore::with_sessions(sessions("Arc", 3, "unknown")));
        // The model answered with an invalid middle label; "break" lands on session 1.
        let client = Arc::new(ScriptedCompletion::new(["work, gaming, break"]));
        let batch = BatchRecategorizer::with_options(store.clone(), client, fast());

        let report = batch.run(&job(&["work", "break"])).await.unwrap();

        assert_eq!(report.updated_count, 2);
        assert_eq!(
            store.updates(),
            vec![
                ("Arc-0".to_string(), "work".to_string()),
                ("Arc-1".to_string(), "break".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn override_groups_skip_the_completion_call() {
        let mut seeded = sessions("Figma", 2, "break");
        seeded.extend(sessions("Arc", 1, "break"));
        let store = Arc::new(RecordingStore::with_sessions(seeded));
        let client = Arc::new(ScriptedCompletion::new(["work"]));
        let batch = BatchRecategorizer::with_options(store.clone(), client.clone(), fast());

        let mut job = job(&["work", "break", "design"]);
        job.overrides.insert(
            "Figma".into(),
            AppOverride {
                category: Some("design".into()),
                description: None,
            },
        );
        let report = batch.run(&job).await.unwrap();

        assert_eq!(client.call_count(), 1);
        assert!(client.requests()[0].user_prompt.contains("Arc tab 0"));
        assert_eq!(report.updated_count, 3);
    }

    #[tokio::test]
    async fn override_description_is_passed_as_context() {
        let store = Arc::new(RecordingStore::with_sessions(sessions("kitty", 1, "break")));
        let client = Arc::new(ScriptedCompletion::new(["work"]));
        let batch = BatchRecategorizer::with_options(store, client.clone(), fast());

        let mut job = job(&["work", "break"]);
        job.overrides.insert(
            "kitty".into(),
            AppOverride {
                category: None,
                description: Some("terminal used for coding".into()),
            },
        );
        batch.run(&job).await.unwrap();

        assert!(client.requests()[0]
            .user_prompt
            .contains("About kitty: terminal used for coding"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_next_group() {
        let mut seeded = sessions("Arc", 1, "break");
        seeded.extend(sessions("Code", 1, "break"));
        let store = Arc::new(RecordingStore::with_sessions(seeded));
        let client = Arc::new(ScriptedCompletion::new(["work", "work"]));
        let token = CancellationToken::new();
        token.cancel();
        let options = BatchOptions {
            cancel: Some(token),
            ..fast()
        };
        let batch = BatchRecategorizer::with_options(store, client.clone(), options);

        let report = batch.run(&job(&["work", "break"])).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(client.call_count(), 0);
        assert_eq!(report.total_count, 2);
    }

    #[test]
    fn grouping_keeps_first_appearance_order() {
        let seeded = vec![
            stored_session("1", "Code", "a", "work"),
            stored_session("2", "Arc", "b", "work"),
            stored_session("3", "Code", "c", "work"),
        ];
        let groups = group_by_process(seeded);
        let names: Vec<_> = groups.iter().map(|(name, g)| (name.as_str(), g.len())).collect();
        assert_eq!(names, vec![("Code", 2), ("Arc", 1)]);
    }
}
