use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::services::store::StorePath;

pub const UNKNOWN_MOOD: &str = "Unknown";
pub const NO_DATA_SUMMARY: &str = "No mood data available for this period.";

const DAYS_PER_WEEK: u32 = 7;
const MAX_DAY: u32 = 31;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub mood: String,
    #[serde(default)]
    pub note: String,
    pub timestamp: String,
}

impl MoodEntry {
    pub fn new(mood: String, note: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            mood,
            note: note.unwrap_or_default(),
            timestamp: at.to_rfc3339(),
        }
    }
}

/// `users/{uid}/moods`
pub fn moods_path(user_id: &str) -> AppResult<StorePath> {
    StorePath::user(user_id)?.join("moods")
}

/// `users/{uid}/moods/{year}/{month}`
pub fn month_path(user_id: &str, year: i64, month: i64) -> AppResult<StorePath> {
    moods_path(user_id)?
        .join(year.to_string())?
        .join(month.to_string())
}

/// `users/{uid}/moods/{year}/{month}/{day}`
pub fn day_path(user_id: &str, year: i64, month: i64, day: i64) -> AppResult<StorePath> {
    month_path(user_id, year, month)?.join(day.to_string())
}

/// The entries stored at a day path, or `None` when the value is not a sequence.
pub fn day_entries(value: Option<Value>) -> Option<Vec<Value>> {
    match value {
        Some(Value::Array(entries)) => Some(entries),
        _ => None,
    }
}

/// Normalizes a month read into a `day -> entries` object.
///
/// The hosted store returns objects whose keys are small integers as
/// null-padded arrays, so both shapes are accepted.
pub fn month_days(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(days)) => days.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        Some(Value::Array(days)) => days
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(day, v)| (day.to_string(), v))
            .collect(),
        _ => Map::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    Daily,
    Weekly,
    Monthly,
}

const SUMMARY_MODES: &[&str] = &["daily", "weekly", "monthly"];

/// Mode names are matched case-insensitively (`"Monthly"`, `"DAILY"`).
impl<'de> Deserialize<'de> for SummaryMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(SummaryMode::Daily),
            "weekly" => Ok(SummaryMode::Weekly),
            "monthly" => Ok(SummaryMode::Monthly),
            _ => Err(serde::de::Error::unknown_variant(&raw, SUMMARY_MODES)),
        }
    }
}

impl SummaryMode {
    pub fn label(self) -> &'static str {
        match self {
            SummaryMode::Daily => "Daily",
            SummaryMode::Weekly => "Weekly",
            SummaryMode::Monthly => "Monthly",
        }
    }

    /// Days of the month covered by this mode. `None` means the whole month.
    pub fn days(self, value: Option<i64>) -> AppResult<Option<RangeInclusive<u32>>> {
        match self {
            SummaryMode::Monthly => Ok(None),
            SummaryMode::Daily => {
                let day = value
                    .filter(|d| (1..=MAX_DAY as i64).contains(d))
                    .ok_or_else(|| {
                        AppError::Validation("Daily summary requires a day value between 1 and 31".into())
                    })? as u32;
                Ok(Some(day..=day))
            }
            SummaryMode::Weekly => {
                let week = value.filter(|w| (1..=5).contains(w)).ok_or_else(|| {
                    AppError::Validation("Weekly summary requires a week value between 1 and 5".into())
                })? as u32;
                let first = (week - 1) * DAYS_PER_WEEK + 1;
                Ok(Some(first..=(week * DAYS_PER_WEEK).min(MAX_DAY)))
            }
        }
    }
}

/// Counts mood labels across the days of a month, optionally restricted to `days`.
pub fn tally(month: &Map<String, Value>, days: Option<&RangeInclusive<u32>>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();

    for (day, entries) in month {
        if let Some(range) = days {
            match day.parse::<u32>() {
                Ok(d) if range.contains(&d) => {}
                _ => continue,
            }
        }
        let Value::Array(entries) = entries else {
            continue;
        };
        for entry in entries {
            let mood = entry
                .get("mood")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_MOOD);
            *counts.entry(mood.to_string()).or_insert(0) += 1;
        }
    }

    counts
}

/// Renders counts ranked by frequency; ties are ordered by label.
pub fn render_summary(mode: SummaryMode, counts: &BTreeMap<String, u64>) -> String {
    if counts.is_empty() {
        return NO_DATA_SUMMARY.to_string();
    }

    let mut ranked: Vec<(&String, &u64)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut summary = format!("Mood Summary ({}):\n\n", mode.label());
    for (mood, count) in ranked {
        summary.push_str(&format!("{}: {} times\n", mood, count));
    }
    summary
}
