use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Historical window over session start timestamps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DateRange {
    Today,
    Yesterday,
    /// Last 7 days up to the end of today.
    Week,
    /// Last 30 days up to the end of today.
    Month,
    All,
    Between {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl DateRange {
    /// Inclusive UTC bounds, `None` for an unbounded range.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.bounds_at(Local::now())
    }

    pub fn bounds_at(&self, now: DateTime<Local>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let day_bounds = |offset_days: i64| {
            let start_day = today - Duration::days(offset_days);
            (start_of_day(start_day), end_of_day(today))
        };

        match *self {
            DateRange::Today => Some(day_bounds(0)),
            DateRange::Yesterday => {
                let day = today - Duration::days(1);
                Some((start_of_day(day), end_of_day(day)))
            }
            DateRange::Week => Some(day_bounds(7)),
            DateRange::Month => Some(day_bounds(30)),
            DateRange::All => None,
            DateRange::Between { start, end } => Some((start, end)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::Yesterday => "yesterday",
            DateRange::Week => "week",
            DateRange::Month => "month",
            DateRange::All => "all",
            DateRange::Between { .. } => "custom",
        }
    }
}

fn start_of_day(day: chrono::NaiveDate) -> DateTime<Utc> {
    local_to_utc(day.and_time(NaiveTime::default()))
}

fn end_of_day(day: chrono::NaiveDate) -> DateTime<Utc> {
    let end = day.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_else(|| day.and_time(NaiveTime::default()));
    local_to_utc(end)
}

fn local_to_utc(naive: chrono::NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DateRange {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Ok(DateRange::Today),
            "yesterday" => Ok(DateRange::Yesterday),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            "all" => Ok(DateRange::All),
            other => Err(anyhow!("unknown date range '{other}' (expected today|yesterday|week|month|all)")),
        }
    }
}
