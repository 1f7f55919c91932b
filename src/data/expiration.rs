//! Expiration selection.
//!
//! Resolves a user's expiration choice against the dates a source lists.
//! The week and month rules are calendar heuristics; their cutoffs are
//! configuration rather than constants.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// How to pick an expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationPreference {
    /// A specific date, falling back to the nearest future listing.
    Exact(NaiveDate),
    /// Nearest listing on or after today.
    ZeroDte,
    /// Nearest listing after today.
    OneDte,
    /// Listing closest to a week out.
    Week,
    /// Last listing of the target month.
    Month,
}

impl Default for ExpirationPreference {
    fn default() -> Self {
        Self::ZeroDte
    }
}

impl fmt::Display for ExpirationPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::ZeroDte => write!(f, "0DTE"),
            Self::OneDte => write!(f, "1DTE"),
            Self::Week => write!(f, "Week"),
            Self::Month => write!(f, "Month"),
        }
    }
}

impl FromStr for ExpirationPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0dte" | "today" => Ok(Self::ZeroDte),
            "1dte" | "tomorrow" => Ok(Self::OneDte),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(Self::Exact)
                .map_err(|_| format!("unrecognized expiration: {}", s)),
        }
    }
}

/// Calendar cutoffs for the week and month rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationConfig {
    /// Only listings within this many days count as "week" candidates.
    pub week_window_days: i64,
    /// Preferred distance for the week rule.
    pub week_target_days: i64,
    /// Day of month after which the month rule rolls to next month.
    pub month_day_cutoff: u32,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            week_window_days: 14,
            week_target_days: 7,
            month_day_cutoff: 15,
        }
    }
}

/// Pick an expiration from `listed` for `preference` as of `today`.
///
/// Returns `None` when nothing is listed on or after today.
pub fn select_expiration(
    listed: &[NaiveDate],
    today: NaiveDate,
    preference: ExpirationPreference,
    config: &ExpirationConfig,
) -> Option<NaiveDate> {
    let mut future: Vec<NaiveDate> = listed.iter().copied().filter(|d| *d >= today).collect();
    future.sort();
    future.dedup();
    let first = *future.first()?;

    let chosen = match preference {
        ExpirationPreference::Exact(date) => {
            if listed.contains(&date) {
                date
            } else {
                first
            }
        }
        ExpirationPreference::ZeroDte => first,
        ExpirationPreference::OneDte => {
            let tomorrow = today + Duration::days(1);
            future.iter().copied().find(|d| *d >= tomorrow).unwrap_or(first)
        }
        ExpirationPreference::Week => {
            let horizon = today + Duration::days(config.week_window_days);
            let target = config.week_target_days;
            future
                .iter()
                .copied()
                .filter(|d| *d <= horizon)
                .min_by_key(|d| ((*d - today).num_days() - target).abs())
                .unwrap_or(first)
        }
        ExpirationPreference::Month => {
            let (year, month) = target_month(today, config.month_day_cutoff);
            future
                .iter()
                .copied()
                .filter(|d| d.year() == year && d.month() == month)
                .max()
                .or_else(|| future.last().copied())
                .unwrap_or(first)
        }
    };

    Some(chosen)
}

fn target_month(today: NaiveDate, cutoff: u32) -> (i32, u32) {
    if today.day() <= cutoff {
        (today.year(), today.month())
    } else if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    }
}
