use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Session;

/// Snapshot returned by `status()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStatus {
    pub is_tracking: bool,
    pub current_session: Option<Session>,
    pub is_system_sleeping: bool,
    pub last_boundary_time: Option<DateTime<Utc>>,
}

/// Segmentation state owned by the tracking worker. All transitions take an
/// explicit `now`.
#[derive(Debug, Default)]
pub struct TrackingState {
    is_tracking: bool,
    current_session: Option<Session>,
    last_boundary_time: Option<DateTime<Utc>>,
    is_system_sleeping: bool,
    sleep_start_time: Option<DateTime<Utc>>,
}

impl TrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        *self = Self {
            is_tracking: true,
            ..Self::default()
        };
    }

    pub fn is_tracking(&self) -> bool {
        self.is_tracking
    }

    pub fn is_system_sleeping(&self) -> bool {
        self.is_system_sleeping
    }

    pub fn sleep_start_time(&self) -> Option<DateTime<Utc>> {
        self.sleep_start_time
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current_session.as_ref()
    }

    /// True when `candidate` continues the open session.
    pub fn continues_current(&self, candidate: &Session) -> bool {
        self.current_session
            .as_ref()
            .is_some_and(|current| current.same_activity(candidate))
    }

    /// Take the open session and stamp its duration as `now - lastBoundaryTime`.
    ///
    /// Returns `None` when nothing was open or the duration is not positive;
    /// such a session is dropped, never persisted.
    pub fn close_current(&mut self, now: DateTime<Utc>) -> Option<Session> {
        let mut session = self.current_session.take()?;
        let boundary = self.last_boundary_time.take()?;

        let elapsed = (now - boundary).num_seconds();
        if elapsed <= 0 {
            log::debug!(
                "Dropping {} - {}: non-positive duration {elapsed}s",
                session.process_name,
                session.window_title
            );
            return None;
        }

        session.duration_secs = elapsed as u64;
        Some(session)
    }

    pub fn adopt(&mut self, session: Session, now: DateTime<Utc>) {
        self.current_session = Some(session);
        self.last_boundary_time = Some(now);
    }

    /// Suspend or lock: close the open session at `now` and stop attributing time.
    pub fn enter_sleep(&mut self, now: DateTime<Utc>) -> Option<Session> {
        let closed = self.close_current(now);
        self.current_session = None;
        self.last_boundary_time = None;
        self.is_system_sleeping = true;
        self.sleep_start_time = Some(now);
        closed
    }

    /// Resume or unlock. Anything still open from before the sleep is discarded.
    pub fn wake(&mut self) {
        if self.is_system_sleeping {
            self.current_session = None;
            self.last_boundary_time = None;
        }
        self.is_system_sleeping = false;
        self.sleep_start_time = None;
    }

    /// Stop tracking. Returns the flushed session unless the system is asleep
    /// (the session was already flushed on suspend).
    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<Session> {
        let closed = if self.is_system_sleeping {
            None
        } else {
            self.close_current(now)
        };
        *self = Self::default();
        closed
    }

    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            is_tracking: self.is_tracking,
            current_session: self.current_session.clone(),
            is_system_sleeping: self.is_system_sleeping,
            last_boundary_time: self.last_boundary_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn session(title: &str, secs: i64) -> Session {
        Session::open("Code", title, None, at(secs))
    }

    #[test]
    fn close_stamps_elapsed_seconds() {
        let mut state = TrackingState::new();
        state.begin();
        state.adopt(session("a.rs", 10), at(10));

        let closed = state.close_current(at(55)).unwrap();
        assert_eq!(closed.duration_secs, 45);
        assert!(state.current_session().is_none());
    }

    #[test]
    fn non_positive_duration_is_dropped() {
        let mut state = TrackingState::new();
        state.adopt(session("a.rs", 10), at(10));
        assert!(state.close_current(at(10)).is_none());

        state.adopt(session("a.rs", 10), at(10));
        assert!(state.close_current(at(4)).is_none());
    }

    #[test]
    fn sleep_boundary_splits_the_session() {
        let mut state = TrackingState::new();
        state.begin();
        state.adopt(session("a.rs", 80), at(80));

        let closed = state.enter_sleep(at(100)).unwrap();
        assert_eq!(closed.duration_secs, 20);
        assert!(state.is_system_sleeping());
        assert_eq!(state.sleep_start_time(), Some(at(100)));
        assert!(state.status().last_boundary_time.is_none());

        state.wake();
        assert!(!state.is_system_sleeping());
        assert!(state.current_session().is_none());
    }

    #[test]
    fn finish_while_asleep_flushes_nothing() {
        let mut state = TrackingState::new();
        state.begin();
        state.adopt(session("a.rs", 0), at(0));
        state.enter_sleep(at(30));

        assert!(state.finish(at(90)).is_none());
        assert!(!state.is_tracking());
    }

    #[test]
    fn wake_without_sleep_keeps_open_session() {
        let mut state = TrackingState::new();
        state.begin();
        state.adopt(session("a.rs", 0), at(0));
        state.wake();
        assert!(state.current_session().is_some());
    }
}
