use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::{
    db::{connection::Database, helpers::to_u64},
    models::DateRange,
};

use super::{range_params, RANGE_FILTER};

const TOP_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: String,
    pub session_count: u64,
    pub total_secs: u64,
    pub average_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStat {
    pub process_name: String,
    pub session_count: u64,
    pub total_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStat {
    pub domain: String,
    pub session_count: u64,
    pub total_secs: u64,
}

/// Aggregates for one date range. All three come from the same bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub categories: Vec<CategoryStat>,
    pub top_apps: Vec<AppStat>,
    pub top_domains: Vec<DomainStat>,
}

fn category_stats(conn: &Connection, start: &Option<String>, end: &Option<String>) -> Result<Vec<CategoryStat>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT category, COUNT(*), SUM(duration_secs), AVG(duration_secs)
         FROM sessions
         WHERE {RANGE_FILTER}
         GROUP BY category
         ORDER BY SUM(duration_secs) DESC"
    ))?;
    let mut rows = stmt.query(params![start, end])?;
    let mut stats = Vec::new();
    while let Some(row) = rows.next()? {
        stats.push(CategoryStat {
            category: row.get(0)?,
            session_count: to_u64(row.get(1)?, "session_count")?,
            total_secs: to_u64(row.get(2)?, "total_secs")?,
            average_secs: row.get(3)?,
        });
    }
    Ok(stats)
}

fn top_apps(conn: &Connection, start: &Option<String>, end: &Option<String>) -> Result<Vec<AppStat>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT process_name, COUNT(*), SUM(duration_secs)
         FROM sessions
         WHERE {RANGE_FILTER}
         GROUP BY process_name
         ORDER BY SUM(duration_secs) DESC
         LIMIT ?3"
    ))?;
    let mut rows = stmt.query(params![start, end, TOP_LIMIT])?;
    let mut apps = Vec::new();
    while let Some(row) = rows.next()? {
        apps.push(AppStat {
            process_name: row.get(0)?,
            session_count: to_u64(row.get(1)?, "session_count")?,
            total_secs: to_u64(row.get(2)?, "total_secs")?,
        });
    }
    Ok(apps)
}

fn top_domains(conn: &Connection, start: &Option<String>, end: &Option<String>) -> Result<Vec<DomainStat>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT domain, COUNT(*), SUM(duration_secs)
         FROM sessions
         WHERE {RANGE_FILTER} AND domain IS NOT NULL AND domain != ''
         GROUP BY domain
         ORDER BY SUM(duration_secs) DESC
         LIMIT ?3"
    ))?;
    let mut rows = stmt.query(params![start, end, TOP_LIMIT])?;
    let mut domains = Vec::new();
    while let Some(row) = rows.next()? {
        domains.push(DomainStat {
            domain: row.get(0)?,
            session_count: to_u64(row.get(1)?, "session_count")?,
            total_secs: to_u64(row.get(2)?, "total_secs")?,
        });
    }
    Ok(domains)
}

impl Database {
    pub async fn statistics(&self, range: DateRange) -> Result<Statistics> {
        let (start, end) = range_params(&range);
        self.execute(move |conn| {
            Ok(Statistics {
                categories: category_stats(conn, &start, &end)
                    .context("failed to query category statistics")?,
                top_apps: top_apps(conn, &start, &end).context("failed to query top apps")?,
                top_domains: top_domains(conn, &start, &end)
                    .context("failed to query top domains")?,
            })
        })
        .await
    }
}
