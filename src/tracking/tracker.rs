use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    categorization::CategorizationEngine,
    completion::CompletionClient,
    db::SessionStore,
    errors::TrackerError,
    models::{Session, UNKNOWN_CATEGORY},
    probe::WindowProbe,
    settings::SettingsStore,
};

use super::state::{TrackerStatus, TrackingState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Collaborators the tracker needs. Moved into the worker on start.
pub struct TrackerDeps<P, S, C> {
    pub probe: P,
    pub store: S,
    pub engine: CategorizationEngine<C>,
    pub settings: Arc<SettingsStore>,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Sleeping,
    NoWindow,
    Ignored(String),
    Unchanged,
    /// A new session was opened; `closed` is the session that ended, if it
    /// had a positive duration.
    Switched { closed: Option<Session> },
}

/// The segmentation state machine plus its collaborators. Not shared: exactly
/// one worker task owns it.
pub struct Tracker<P, S, C> {
    probe: P,
    store: S,
    engine: CategorizationEngine<C>,
    settings: Arc<SettingsStore>,
    state: TrackingState,
}

impl<P, S, C> Tracker<P, S, C>
where
    P: WindowProbe,
    S: SessionStore,
    C: CompletionClient,
{
    pub fn new(deps: TrackerDeps<P, S, C>) -> Self {
        Self {
            probe: deps.probe,
            store: deps.store,
            engine: deps.engine,
            settings: deps.settings,
            state: TrackingState::new(),
        }
    }

    pub fn status(&self) -> TrackerStatus {
        self.state.status()
    }

    pub fn start(&mut self) {
        self.state.begin();
        log_info!("Activity tracking started");
    }

    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.state.is_system_sleeping() {
            return TickOutcome::Sleeping;
        }

        let Some(snapshot) = self.probe.current_window().await else {
            log_warn!("Skipping tick: {}", TrackerError::ProbeUnavailable);
            return TickOutcome::NoWindow;
        };

        let ignored = self.settings.ignored_processes();
        if ignored
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&snapshot.process_name))
        {
            log_debug!("Ignoring focus on {}", snapshot.process_name);
            return TickOutcome::Ignored(snapshot.process_name);
        }

        let mut candidate = Session::open(
            snapshot.process_name,
            snapshot.window_title,
            snapshot.url,
            now,
        );
        if self.state.continues_current(&candidate) {
            return TickOutcome::Unchanged;
        }

        candidate.category = self
            .state
            .current_session()
            .map(|current| current.category.clone())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        candidate.category = self.engine.categorize(&candidate).await;

        let closed = self.state.close_current(now);
        if let Some(session) = &closed {
            self.persist(session).await;
        }

        log_info!(
            "Now tracking {} - {} [{}]",
            candidate.process_name,
            candidate.window_title,
            candidate.category
        );
        self.state.adopt(candidate, now);
        TickOutcome::Switched { closed }
    }

    /// Suspend and lock-screen share the same transition.
    pub async fn suspend(&mut self, now: DateTime<Utc>) {
        if self.state.is_system_sleeping() {
            return;
        }
        if let Some(session) = self.state.enter_sleep(now) {
            self.persist(&session).await;
        }
        log_info!("System sleeping; session closed at {now}");
    }

    /// Resume and unlock-screen: clear the sleep flag and open a fresh session right away.
    pub async fn resume(&mut self, now: DateTime<Utc>) -> TickOutcome {
        self.state.wake();
        self.tick(now).await
    }

    pub async fn stop(&mut self, now: DateTime<Utc>) -> Option<Session> {
        let closed = self.state.finish(now);
        if let Some(session) = &closed {
            self.persist(session).await;
        }
        log_info!("Activity tracking stopped");
        closed
    }

    async fn persist(&self, session: &Session) {
        if let Err(err) = self.store.save_session(session).await {
            log_warn!("{}", TrackerError::persistence(&session.process_name, &err));
        }
    }
}
