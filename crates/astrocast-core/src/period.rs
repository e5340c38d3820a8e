use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Horizon a forecast covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Tomorrow,
    Week,
    Month,
}

impl Period {
    /// Wall-clock offset from "now" to the forecast's target instant.
    ///
    /// Week and month are fixed +7d / +30d deltas, not calendar-aware.
    #[must_use]
    pub fn offset(self) -> Duration {
        match self {
            Period::Day => Duration::zero(),
            Period::Tomorrow => Duration::hours(24),
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
        }
    }

    #[must_use]
    pub fn target_date(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.offset()
    }

    /// Phrase used inside generated prose ("today", "this week", ...).
    #[must_use]
    pub fn display_phrase(self) -> &'static str {
        match self {
            Period::Day => "today",
            Period::Tomorrow => "tomorrow",
            Period::Week => "this week",
            Period::Month => "this month",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Tomorrow => "tomorrow",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "today" => Ok(Period::Day),
            "tomorrow" => Ok(Period::Tomorrow),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            _ => Err(CoreError::UnknownPeriod(s.to_string())),
        }
    }
}
