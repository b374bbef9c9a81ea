use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::period::Period;
use crate::AnalyticsResult;

fn default_window_months() -> u32 {
    12
}

/// Engine-wide settings. Every field has a default so a partial config file
/// deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Size of the default reporting window in calendar months
    #[serde(default = "default_window_months")]
    pub window_months: u32,
    /// Instant treated as "now"; wall clock when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    /// Tenant used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            window_months: default_window_months(),
            as_of: None,
            tenant: None,
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.window_months == 0 {
            return Err(AnalyticsError::invalid_input(
                "window_months",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.as_of.unwrap_or_else(Utc::now)
    }

    pub fn default_period(&self) -> AnalyticsResult<Period> {
        self.validate()?;
        Period::trailing(self.now(), self.window_months)
    }

    /// Explicit bounds win; a missing bound falls back to the default window.
    pub fn resolve_period(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AnalyticsResult<Period> {
        match (start, end) {
            (None, None) => self.default_period(),
            (start, end) => {
                let fallback = self.default_period()?;
                Period::new(start.unwrap_or(fallback.start), end.unwrap_or(fallback.end))
            }
        }
    }
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(raw: &str) -> AnalyticsResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            AnalyticsError::DateError(format!(
                "'{raw}' is neither an RFC 3339 instant nor a YYYY-MM-DD date"
            ))
        })
}
