//! Monthly movements of annual recurring revenue.
//!
//! Only cancellations are derived from line-item history today; the other
//! movement columns are reported as zero until contract events carry the
//! data to split them.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::display::{compute_numbers_display, round_to_two_decimals};
use crate::error::AnalyticsError;
use crate::period::{MonthBucket, Period};
use crate::revenue::activity::contract_value_at;
use crate::revenue::billing::sli_monthly_value;
use crate::snapshot::{load_tenant, ContractRecord, CustomerBook, SnapshotAccessor};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Output types — ARR breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrBreakdownMonth {
    pub year: i32,
    pub month: u32,
    pub newly_contracted: Money,
    pub renewals: Money,
    pub upsells: Money,
    pub downgrades: Money,
    /// Monthly value of cancelled line items whose end falls in the month
    pub cancellations: Money,
    pub churned: Money,
}

impl ArrBreakdownMonth {
    fn empty(bucket: &MonthBucket) -> Self {
        ArrBreakdownMonth {
            year: bucket.year(),
            month: bucket.month_number(),
            newly_contracted: Decimal::ZERO,
            renewals: Decimal::ZERO,
            upsells: Decimal::ZERO,
            downgrades: Decimal::ZERO,
            cancellations: Decimal::ZERO,
            churned: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrBreakdownOutput {
    /// Annual recurring revenue at the end of the period
    pub arr_breakdown: Money,
    /// Change against the same figure one month earlier
    pub increase_percentage: String,
    pub per_month: Vec<ArrBreakdownMonth>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn reportable_contracts(book: &CustomerBook) -> Vec<&ContractRecord> {
    book.reportable_customers()
        .flat_map(|org| org.contracts.iter())
        .collect()
}

/// Cancelled recurring items whose end lands inside the bucket.
pub fn cancellations_in(contracts: &[&ContractRecord], bucket: &MonthBucket) -> Money {
    contracts
        .iter()
        .flat_map(|record| record.service_line_items.iter())
        .filter(|item| item.is_canceled && item.ended_at.is_some_and(|end| bucket.contains(end)))
        .map(sli_monthly_value)
        .sum()
}

/// Recurring value of every running contract at `at`, annualized.
pub fn arr_at(contracts: &[&ContractRecord], at: DateTime<Utc>) -> Money {
    let monthly: Money = contracts
        .iter()
        .filter(|record| {
            record.contract.counts_for_revenue()
                && record.contract.ended_at.map_or(true, |end| end > at)
        })
        .map(|record| contract_value_at(record, at))
        .sum();
    round_to_two_decimals(monthly * dec!(12))
}

// ---------------------------------------------------------------------------
// Function: arr_breakdown
// ---------------------------------------------------------------------------

pub fn arr_breakdown(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<ArrBreakdownOutput>> {
    let start = Instant::now();
    let buckets = period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;
    let contracts = reportable_contracts(&book);

    let per_month: Vec<ArrBreakdownMonth> = buckets
        .iter()
        .map(|bucket| ArrBreakdownMonth {
            cancellations: round_to_two_decimals(cancellations_in(&contracts, bucket)),
            ..ArrBreakdownMonth::empty(bucket)
        })
        .collect();

    let month_earlier = period
        .end
        .checked_sub_months(Months::new(1))
        .ok_or_else(|| AnalyticsError::DateError(format!("no month before {}", period.end)))?;
    let current = arr_at(&contracts, period.end);
    let previous = arr_at(&contracts, month_earlier);

    debug!(
        tenant,
        months = per_month.len(),
        arr = %current,
        previous_arr = %previous,
        "computed ARR breakdown"
    );

    let output = ArrBreakdownOutput {
        arr_breakdown: current,
        increase_percentage: compute_numbers_display(previous, current),
        per_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "ARR breakdown: per-month cancellations (monthly value of cancelled \
         service line items ending in the month); headline ARR = running \
         recurring value at period end x 12",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "previous_instant": month_earlier.to_rfc3339(),
            "unsplit_columns": ["newly_contracted", "renewals", "upsells", "downgrades", "churned"],
        }),
        warnings,
        elapsed,
        output,
    ))
}
