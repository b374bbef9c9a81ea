use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::display::{percentage_change, round_half_away};
use crate::onboarding::timeline::{tenant_attempts, OnboardingAttempt};
use crate::period::{MonthBucket, Period};
use crate::snapshot::{load_tenant, SnapshotAccessor};
use crate::types::{trailing_pair, with_metadata, ComputationOutput, Percentage};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Output types — Onboarding completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionMonth {
    pub year: i32,
    pub month: u32,
    pub value: Percentage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingCompletionOutput {
    pub completion_percentage: Percentage,
    pub increase_percentage: Percentage,
    pub per_month: Vec<CompletionMonth>,
}

/// Whole-number share of attempts in the bucket that were closed in it.
pub fn completion_in(attempts: &[OnboardingAttempt], bucket: &MonthBucket) -> Percentage {
    let completed = attempts.iter().filter(|a| a.completed_in(bucket)).count();
    let pending = attempts
        .iter()
        .filter(|a| a.touches(bucket) && !a.completed_in(bucket))
        .count();
    let total = completed + pending;
    if total == 0 {
        return Decimal::ZERO;
    }
    round_half_away(
        Decimal::from(completed as u64) / Decimal::from(total as u64) * dec!(100),
        0,
    )
}

// ---------------------------------------------------------------------------
// Function: onboarding_completion
// ---------------------------------------------------------------------------

pub fn onboarding_completion(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<OnboardingCompletionOutput>> {
    let start = Instant::now();
    let buckets = period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;
    let attempts = tenant_attempts(&book, &mut warnings);

    let per_month: Vec<CompletionMonth> = if attempts.is_empty() {
        warnings.push("No onboarding status changes recorded for this tenant".into());
        Vec::new()
    } else {
        buckets
            .iter()
            .map(|bucket| CompletionMonth {
                year: bucket.year(),
                month: bucket.month_number(),
                value: completion_in(&attempts, bucket),
            })
            .collect()
    };

    let (previous, current) = trailing_pair(&per_month);
    let increase = if previous.value.is_zero() || current.value.is_zero() {
        Decimal::ZERO
    } else {
        percentage_change(previous.value, current.value)
    };

    debug!(
        tenant,
        months = per_month.len(),
        attempts = attempts.len(),
        completion = %current.value,
        "computed onboarding completion"
    );

    let output = OnboardingCompletionOutput {
        completion_percentage: current.value,
        increase_percentage: increase,
        per_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Onboarding completion: attempts closed by DONE/SUCCESSFUL in the month \
         over all attempts active in the month, rounded to a whole percent",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "completion_statuses": ["DONE", "SUCCESSFUL"],
        }),
        warnings,
        elapsed,
        output,
    ))
}
