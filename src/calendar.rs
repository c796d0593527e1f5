//! Time/calendar utilities (C1): horizon enumeration, pattern-day arithmetic,
//! scheme normalization, weekday coverage, and month-length lookups.
//!
//! All functions here are pure and deterministic, per spec §4.1.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{RosterError, Result};

/// An inclusive `[start, end]` planning window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningHorizon {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl PlanningHorizon {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if end_date < start_date {
            return Err(RosterError::Schema(format!(
                "planning horizon end {end_date} precedes start {start_date}"
            )));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// The ordered sequence of calendar dates covered by this horizon.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date.iter_days().take_while(|d| *d <= self.end_date)
    }

    pub fn len_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// `(days_since_anchor + offset) mod pattern_len`, the index into a
/// [`crate::domain::WorkPattern`] for a given calendar date (spec §4.1, GLOSSARY).
pub fn pattern_day(date: NaiveDate, offset: i64, anchor: NaiveDate, pattern_len: usize) -> usize {
    let days_since_anchor = (date - anchor).num_days();
    let len = pattern_len as i64;
    (((days_since_anchor + offset) % len) + len) as usize % pattern_len
}

/// Normalizes scheme synonyms ("Scheme A", " a ", "A") to a canonical tag.
/// Returns `None` for unrecognized input; callers decide how to handle that.
pub fn normalize_scheme_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("Scheme ")
        .or_else(|| trimmed.strip_prefix("scheme "))
        .unwrap_or(trimmed);
    let upper = stripped.trim().to_uppercase();
    match upper.as_str() {
        "A" | "B" | "P" => Some(upper),
        "ANY" => Some("Any".to_string()),
        _ => None,
    }
}

/// Number of days in the calendar month containing `date` (28/29/30/31).
pub fn days_in_month(date: NaiveDate) -> u32 {
    let year = date.year();
    let month = date.month();
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar arithmetic");
    let this_month_first =
        NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar arithmetic");
    (next_month_first - this_month_first).num_days() as u32
}

/// A set of weekdays used to filter coverage dates (spec §3 `coverageDays`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdaySet(pub HashSet<chrono::Weekday>);

impl WeekdaySet {
    pub fn all() -> Self {
        use Weekday::*;
        Self([Mon, Tue, Wed, Thu, Fri, Sat, Sun].into_iter().collect())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date.weekday())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Returns the Monday that anchors the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}
