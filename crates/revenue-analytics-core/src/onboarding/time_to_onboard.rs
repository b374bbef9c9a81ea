use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::display::percentage_change;
use crate::onboarding::timeline::{tenant_attempts, OnboardingAttempt};
use crate::period::{MonthBucket, Period};
use crate::snapshot::{load_tenant, SnapshotAccessor};
use crate::types::{trailing_pair, with_metadata, ComputationOutput, Days, Percentage};
use crate::AnalyticsResult;

const SECONDS_PER_DAY: i64 = 86_400;

// ---------------------------------------------------------------------------
// Output types — Time to onboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeToOnboardMonth {
    pub year: i32,
    pub month: u32,
    /// Mean days from first status to DONE
    pub value: Days,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeToOnboardOutput {
    pub time_to_onboard: Option<Days>,
    pub increase_percentage: Option<Percentage>,
    pub per_month: Vec<TimeToOnboardMonth>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Days to one decimal, rounding halves up. Any positive duration shows at
/// least 0.1.
pub fn seconds_to_display_days(seconds: Decimal) -> Days {
    if seconds <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let days = seconds / Decimal::from(SECONDS_PER_DAY);
    let rounded = (days * dec!(10) + dec!(0.5)).floor() / dec!(10);
    if rounded.is_zero() {
        dec!(0.1)
    } else {
        rounded.normalize()
    }
}

pub fn average_days_in(attempts: &[OnboardingAttempt], bucket: &MonthBucket) -> Days {
    let durations: Vec<i64> = attempts
        .iter()
        .filter(|a| a.is_measurable() && a.completed_in(bucket))
        .filter_map(|a| a.duration_seconds())
        .collect();
    if durations.is_empty() {
        return Decimal::ZERO;
    }
    let total: i64 = durations.iter().sum();
    seconds_to_display_days(Decimal::from(total) / Decimal::from(durations.len() as u64))
}

// ---------------------------------------------------------------------------
// Function: time_to_onboard
// ---------------------------------------------------------------------------

pub fn time_to_onboard(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<TimeToOnboardOutput>> {
    let start = Instant::now();
    let buckets = period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;
    let attempts = tenant_attempts(&book, &mut warnings);

    let unmeasured = attempts
        .iter()
        .filter(|a| a.completed_at.is_some() && !a.is_measurable())
        .count();
    if unmeasured > 0 {
        warnings.push(format!(
            "{unmeasured} completion(s) had no prior onboarding status or ended as \
             SUCCESSFUL and were not timed"
        ));
    }

    let per_month: Vec<TimeToOnboardMonth> = if attempts.is_empty() {
        Vec::new()
    } else {
        buckets
            .iter()
            .map(|bucket| TimeToOnboardMonth {
                year: bucket.year(),
                month: bucket.month_number(),
                value: average_days_in(&attempts, bucket),
            })
            .collect()
    };

    let (previous, current) = trailing_pair(&per_month);
    let headline = (!current.value.is_zero()).then_some(current.value);
    let increase = (!previous.value.is_zero() && !current.value.is_zero())
        .then(|| percentage_change(previous.value, current.value));

    debug!(
        tenant,
        months = per_month.len(),
        days = %current.value,
        "computed time to onboard"
    );

    let output = TimeToOnboardOutput {
        time_to_onboard: headline,
        increase_percentage: increase,
        per_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Time to onboard: mean days from an attempt's first status to DONE, \
         bucketed by the DONE month, one decimal with a 0.1 floor",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
