//! In-memory fakes for the probe, store and completion seams.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{bail, Result};
use chrono::Utc;

use crate::{
    completion::{CompletionClient, CompletionRequest, ServiceError},
    db::SessionStore,
    models::{DateRange, Session},
    probe::{WindowProbe, WindowSnapshot},
};

/// Replays queued responses in order. An exhausted queue answers `EmptyResponse`.
#[derive(Default)]
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new<'a>(responses: impl IntoIterator<Item = &'a str>) -> Self {
        let client = Self::default();
        for response in responses {
            client.push_ok(response);
        }
        client
    }

    pub fn push_ok(&self, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
    }

    pub fn push_err(&self, err: ServiceError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ServiceError::EmptyResponse))
    }
}

/// Returns whatever window was last set; `None` simulates a probe failure.
#[derive(Default)]
pub struct ScriptedProbe {
    current: Mutex<Option<WindowSnapshot>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn showing(process_name: &str, window_title: &str, url: Option<&str>) -> Self {
        let probe = Self::default();
        probe.show(process_name, window_title, url);
        probe
    }

    pub fn show(&self, process_name: &str, window_title: &str, url: Option<&str>) {
        *self.current.lock().unwrap() = Some(WindowSnapshot {
            process_name: process_name.to_string(),
            window_title: window_title.to_string(),
            url: url.map(str::to_string),
        });
    }

    pub fn blank(&self) {
        *self.current.lock().unwrap() = None;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WindowProbe for ScriptedProbe {
    async fn current_window(&self) -> Option<WindowSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().clone()
    }
}

/// Keeps saved sessions and category updates in memory.
///
/// `fetch_sessions` ignores the range and returns every stored session in
/// insertion order, which keeps batch grouping tests deterministic.
#[derive(Default)]
pub struct RecordingStore {
    sessions: Mutex<Vec<Session>>,
    updates: Mutex<Vec<(String, String)>>,
    fail_saves: AtomicBool,
    fail_updates_for: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        let store = Self::default();
        *store.sessions.lock().unwrap() = sessions;
        store
    }

    pub fn saved(&self) -> Vec<Session> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates_for(&self, id: &str) {
        *self.fail_updates_for.lock().unwrap() = Some(id.to_string());
    }
}

impl SessionStore for RecordingStore {
    async fn save_session(&self, session: &Session) -> Result<String> {
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        if session.duration_secs == 0 {
            bail!("zero-duration session");
        }
        let mut stored = session.clone();
        let id = format!("s{}", self.sessions.lock().unwrap().len() + 1);
        stored.id = Some(id.clone());
        self.sessions.lock().unwrap().push(stored);
        Ok(id)
    }

    async fn fetch_sessions(&self, _range: DateRange) -> Result<Vec<Session>> {
        Ok(self.saved())
    }

    async fn update_session_category(&self, id: &str, category: &str) -> Result<bool> {
        if self.fail_updates_for.lock().unwrap().as_deref() == Some(id) {
            bail!("locked row {id}");
        }
        let mut sessions = self.sessions.lock().unwrap();
        let Some(session) = sessions.iter_mut().find(|s| s.id.as_deref() == Some(id)) else {
            return Ok(false);
        };
        session.category = category.to_string();
        self.updates
            .lock()
            .unwrap()
            .push((id.to_string(), category.to_string()));
        Ok(true)
    }
}

/// A stored session with a fixed id, for seeding stores.
pub fn stored_session(id: &str, process_name: &str, window_title: &str, category: &str) -> Session {
    let mut session = Session::open(process_name, window_title, None, Utc::now());
    session.id = Some(id.to_string());
    session.category = category.to_string();
    session.duration_secs = 60;
    session
}
