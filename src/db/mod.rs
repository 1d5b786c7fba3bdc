//! Durable session store.

mod connection;
mod helpers;
mod migrations;
mod repositories;

use std::{future::Future, sync::Arc};

use anyhow::Result;

use crate::models::{DateRange, Session};

pub use connection::Database;
pub use repositories::stats::{AppStat, CategoryStat, DomainStat, Statistics};

/// What the tracker and the batch recategorizer need from persistence.
pub trait SessionStore: Send + Sync {
    /// Persist a closed session and return its id. Zero-duration sessions are rejected.
    fn save_session(&self, session: &Session) -> impl Future<Output = Result<String>> + Send;

    /// Sessions whose start timestamp falls in `range`, newest first.
    fn fetch_sessions(&self, range: DateRange) -> impl Future<Output = Result<Vec<Session>>> + Send;

    /// Returns whether a row was changed.
    fn update_session_category(
        &self,
        id: &str,
        category: &str,
    ) -> impl Future<Output = Result<bool>> + Send;
}

impl<T: SessionStore> SessionStore for Arc<T> {
    fn save_session(&self, session: &Session) -> impl Future<Output = Result<String>> + Send {
        self.as_ref().save_session(session)
    }

    fn fetch_sessions(&self, range: DateRange) -> impl Future<Output = Result<Vec<Session>>> + Send {
        self.as_ref().fetch_sessions(range)
    }

    fn update_session_category(
        &self,
        id: &str,
        category: &str,
    ) -> impl Future<Output = Result<bool>> + Send {
        self.as_ref().update_session_category(id, category)
    }
}
