use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::{
    db::{
        connection::Database,
        helpers::{format_datetime, parse_datetime, to_i64, to_u64},
        SessionStore,
    },
    models::{DateRange, Session},
};

use super::{range_params, RANGE_FILTER};

fn row_to_session(row: &Row) -> Result<Session> {
    let timestamp: String = row.get("timestamp")?;
    let duration_secs: i64 = row.get("duration_secs")?;

    Ok(Session {
        id: Some(row.get("id")?),
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        process_name: row.get("process_name")?,
        window_title: row.get("window_title")?,
        url: row.get("url")?,
        domain: row.get("domain")?,
        category: row.get("category")?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
    })
}

impl SessionStore for Database {
    async fn save_session(&self, session: &Session) -> Result<String> {
        if session.duration_secs == 0 {
            bail!(
                "refusing to save zero-duration session for {}",
                session.process_name
            );
        }

        let mut record = session.clone();
        let id = record
            .id
            .take()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let id_for_insert = id.clone();

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, timestamp, process_name, window_title, url, domain, category, duration_secs, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id_for_insert,
                    format_datetime(&record.timestamp),
                    record.process_name,
                    record.window_title,
                    record.url,
                    record.domain,
                    record.category,
                    to_i64(record.duration_secs)?,
                    format_datetime(&Utc::now()),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await?;

        Ok(id)
    }

    async fn fetch_sessions(&self, range: DateRange) -> Result<Vec<Session>> {
        let (start, end) = range_params(&range);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, timestamp, process_name, window_title, url, domain, category, duration_secs
                 FROM sessions
                 WHERE {RANGE_FILTER}
                 ORDER BY timestamp DESC"
            ))?;
            let mut rows = stmt.query(params![start, end])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    async fn update_session_category(&self, id: &str, category: &str) -> Result<bool> {
        let id = id.to_string();
        let category = category.to_string();
        self.execute(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE sessions SET category = ?1 WHERE id = ?2",
                    params![category, id],
                )
                .with_context(|| format!("failed to update category of session {id}"))?;
            Ok(changed > 0)
        })
        .await
    }
}
